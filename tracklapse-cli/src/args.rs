//! Command-line flags and their translation into an `AnimationConfig`.

use std::path::PathBuf;

use clap::Parser;

use tracklapse::app::{AnimationConfig, BasemapSource, TileSettings};
use tracklapse::mosaic::FitMode;
use tracklapse::provider::{lookup_preset, Preset};
use tracklapse::render::{parse_hex_color, parse_hex_colors};

/// Render one or more GPX tracks into a time-synchronized animated GIF,
/// optionally over a slippy-map background.
#[derive(Parser, Debug)]
#[command(name = "tracklapse", version, about)]
pub struct Args {
    /// GPX input file; repeat the flag for multiple tracks
    #[arg(long = "in", value_name = "FILE", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output GIF path
    #[arg(long, default_value = "tracklapse.gif")]
    pub out: PathBuf,

    /// Frame edge length in pixels (square canvas)
    #[arg(long, default_value_t = 512)]
    pub size: u32,

    /// Frames per second of the output animation
    #[arg(long, default_value_t = 20.0)]
    pub fps: f64,

    /// Animation length in seconds
    #[arg(long = "duration-secs", default_value_t = 12.0)]
    pub duration_secs: f64,

    /// Padding around the track bounding box, as a fraction per side
    #[arg(long, default_value_t = 0.05)]
    pub margin: f64,

    /// Background color when no basemap is configured (hex)
    #[arg(long, default_value = "#000000")]
    pub bg: String,

    /// Comma-separated track line colors (hex)
    #[arg(
        long = "line-colors",
        default_value = "#ffffff,#ff3b30,#34c759,#007aff,#ffcc00,#af52de"
    )]
    pub line_colors: String,

    /// Track line width in pixels
    #[arg(long = "line-width", default_value_t = 4)]
    pub line_width: u32,

    /// Static basemap URL template with {minLon},{minLat},{maxLon},{maxLat},{w},{h}
    #[arg(long = "static-url", value_name = "TEMPLATE")]
    pub static_url: Option<String>,

    /// Named tile preset: opentopomap | esri-satellite | maptiler-satellite | stamen-terrain-bg
    #[arg(long = "tiles-preset", value_name = "NAME")]
    pub tiles_preset: Option<String>,

    /// Custom tile URL template with {z}/{x}/{y}
    #[arg(long = "tiles-url", value_name = "TEMPLATE")]
    pub tiles_url: Option<String>,

    /// Tile cache directory (defaults to the user cache dir)
    #[arg(long = "tile-cache", value_name = "DIR")]
    pub tile_cache: Option<PathBuf>,

    /// Disable the on-disk tile cache entirely
    #[arg(long = "no-tile-cache")]
    pub no_tile_cache: bool,

    /// Tile requests per second (OpenTopoMap expects about 1)
    #[arg(long = "tiles-rps", default_value_t = 1.0)]
    pub tiles_rps: f64,

    /// Tile request burst allowance
    #[arg(long = "tiles-burst", default_value_t = 1)]
    pub tiles_burst: u32,

    /// Per-tile HTTP timeout in seconds
    #[arg(long = "tiles-timeout-secs", default_value_t = 8)]
    pub tiles_timeout_secs: u64,

    /// Concurrent tile download workers
    #[arg(long = "tile-workers", default_value_t = 6)]
    pub tile_workers: usize,

    /// Basemap fit mode: contain | cover
    #[arg(long = "tile-fit", default_value = "contain")]
    pub tile_fit: String,

    /// Hard deadline for the whole run in seconds
    #[arg(long = "timeout-secs", default_value_t = 600)]
    pub timeout_secs: u64,

    /// Also write logs into this directory
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    /// Translates the flags into the library's configuration record.
    pub fn build_config(&self) -> Result<AnimationConfig, Box<dyn std::error::Error>> {
        if self.fps <= 0.0 {
            return Err("fps must be greater than zero".into());
        }
        if self.duration_secs <= 0.0 {
            return Err("duration must be greater than zero".into());
        }
        let frame_count = (self.fps * self.duration_secs).max(1.0) as usize;

        let background = parse_hex_color(&self.bg)?;
        let track_colors = parse_hex_colors(&self.line_colors)?;
        let fit: FitMode = self.tile_fit.parse()?;

        let basemap = if let Some(template) = &self.static_url {
            BasemapSource::Static {
                url_template: template.clone(),
            }
        } else if let Some(preset) = self.resolve_preset()? {
            let mut settings = TileSettings::new(preset);
            settings.cache_dir = self.cache_dir();
            settings.requests_per_second = self.tiles_rps;
            settings.burst = self.tiles_burst;
            settings.timeout = std::time::Duration::from_secs(self.tiles_timeout_secs);
            settings.worker_count = self.tile_workers;
            BasemapSource::Tiles(settings)
        } else {
            BasemapSource::None
        };

        let mut config = AnimationConfig::new(self.size, frame_count, track_colors);
        config.margin = self.margin;
        config.background = background;
        config.line_width = self.line_width;
        config.fit = fit;
        config.basemap = basemap;
        config.validate()?;
        Ok(config)
    }

    fn resolve_preset(&self) -> Result<Option<Preset>, Box<dyn std::error::Error>> {
        if let Some(name) = &self.tiles_preset {
            return Ok(Some(lookup_preset(name)?));
        }
        if let Some(template) = &self.tiles_url {
            return Ok(Some(Preset::custom(template)));
        }
        Ok(None)
    }

    fn cache_dir(&self) -> Option<PathBuf> {
        if self.no_tile_cache {
            return None;
        }
        Some(self.tile_cache.clone().unwrap_or_else(default_cache_dir))
    }
}

/// Per-user cache location, falling back to a local directory.
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("tracklapse").join("tiles"))
        .unwrap_or_else(|| PathBuf::from(".tile-cache"))
}
