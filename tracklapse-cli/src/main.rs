//! Tracklapse CLI - render GPS tracks into an animated GIF.

mod args;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use args::Args;
use tracklapse::track::gpx;
use tracklapse::Track;

fn main() -> ExitCode {
    let args = Args::parse();

    let _guard = match tracklapse::logging::init_logging(args.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialise logging: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("{} {err}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();

    // Ctrl-C cancels cooperatively; a second Ctrl-C kills the process.
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            if cancel.is_cancelled() {
                std::process::exit(130);
            }
            warn!("interrupt received, cancelling");
            cancel.cancel();
        })?;
    }

    // Hard deadline for the whole run.
    {
        let cancel = cancel.clone();
        let deadline = Duration::from_secs(args.timeout_secs);
        std::thread::spawn(move || {
            std::thread::sleep(deadline);
            if !cancel.is_cancelled() {
                warn!(seconds = deadline.as_secs(), "run deadline reached");
                cancel.cancel();
            }
        });
    }

    let config = args.build_config()?;
    let tracks = load_tracks(&args.inputs)?;

    let animation = tracklapse::run(&tracks, &config, &cancel)?;
    if let Some(zoom) = animation.zoom {
        info!(zoom, "basemap mosaic assembled");
    }

    let bar = ProgressBar::new(animation.frames.len() as u64).with_style(
        ProgressStyle::with_template("{prefix:>8} [{bar:30}] {pos}/{len}")
            .expect("valid progress template")
            .progress_chars("=> "),
    );
    bar.set_prefix("encoding");

    tracklapse::encode::write_gif_file(&args.out, &animation.frames, &cancel, |i| {
        bar.set_position(i as u64 + 1)
    })?;
    bar.finish();

    if let Some(attribution) = &animation.attribution {
        println!("map data: {attribution}");
    }
    println!(
        "{} {} ({} frames)",
        style("done:").green().bold(),
        args.out.display(),
        animation.frames.len()
    );
    Ok(())
}

/// Loads every input GPX file; files without points are skipped with a
/// warning.
fn load_tracks(inputs: &[PathBuf]) -> Result<Vec<Track>, Box<dyn std::error::Error>> {
    let mut tracks = Vec::with_capacity(inputs.len());
    let mut total_points = 0usize;
    for path in inputs {
        let track = gpx::load_track(path)?;
        if track.is_empty() {
            warn!(path = %path.display(), "no points in GPX file, skipping");
            continue;
        }
        total_points += track.len();
        tracks.push(track);
    }
    if tracks.is_empty() {
        return Err("no points in any input GPX file".into());
    }
    info!(
        tracks = tracks.len(),
        points = total_points,
        "loaded GPX input"
    );
    Ok(tracks)
}
