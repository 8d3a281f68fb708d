//! Logging infrastructure for Tracklapse.
//!
//! Structured logging via `tracing`: a compact stderr layer always, plus an
//! optional file layer when a log directory is configured. Verbosity is
//! controlled through the `RUST_LOG` environment variable (default `info`).

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file name inside the configured log directory.
const LOG_FILE: &str = "tracklapse.log";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping the guard flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initializes the global tracing subscriber.
///
/// With a `log_dir`, log lines additionally go to
/// `<log_dir>/tracklapse.log` (created as needed, cleared per session).
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log file
/// cannot be reset.
pub fn init_logging(log_dir: Option<&Path>) -> Result<LoggingGuard, io::Error> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(true)
        .compact();

    let file_guard = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            // Start each session with a fresh log file.
            std::fs::write(dir.join(LOG_FILE), "")?;

            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            None
        }
    };

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
