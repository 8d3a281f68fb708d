//! Animation run configuration.
//!
//! Every option is enumerated here and passed explicitly into the core
//! entry point; the library never reads process-global state.

use std::path::PathBuf;
use std::time::Duration;

use image::Rgba;
use thiserror::Error;

use crate::mosaic::{FitMode, DEFAULT_WORKER_COUNT};
use crate::provider::{Preset, PresetError};
use crate::render::{RenderOptions, DEFAULT_FRAME_DELAY_CS};

/// Smallest accepted canvas edge in pixels.
pub const MIN_CANVAS_SIZE: u32 = 64;

/// Largest accepted canvas edge in pixels.
pub const MAX_CANVAS_SIZE: u32 = 4096;

/// Margin must stay below this fraction.
pub const MAX_MARGIN: f64 = 0.25;

/// Configuration errors, surfaced before any network or rendering work.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("canvas size {0} out of range {MIN_CANVAS_SIZE}..={MAX_CANVAS_SIZE}")]
    CanvasSize(u32),

    #[error("margin {0} out of range [0, {MAX_MARGIN})")]
    Margin(f64),

    #[error("track color list is empty")]
    NoTrackColors,

    #[error("frame count must be at least 1")]
    NoFrames,

    #[error("line width must be at least 1")]
    LineWidth,

    #[error("tile requests per second must be positive, got {0}")]
    RequestRate(f64),

    #[error(transparent)]
    Preset(#[from] PresetError),
}

/// Where the animation background comes from.
#[derive(Debug, Clone)]
pub enum BasemapSource {
    /// Solid background color only.
    None,
    /// One static map image fetched from a bbox/size URL template.
    Static { url_template: String },
    /// Tile mosaic assembled from a slippy-map source.
    Tiles(TileSettings),
}

/// Settings for the tile-mosaic background path.
#[derive(Debug, Clone)]
pub struct TileSettings {
    pub preset: Preset,
    /// On-disk tile cache root; `None` runs the mosaic engine uncached.
    pub cache_dir: Option<PathBuf>,
    /// Request rate shared by all tile workers.
    pub requests_per_second: f64,
    pub burst: u32,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    pub worker_count: usize,
}

impl TileSettings {
    /// Conservative defaults suited to public tile servers.
    pub fn new(preset: Preset) -> Self {
        Self {
            preset,
            cache_dir: Some(PathBuf::from(".tile-cache")),
            requests_per_second: 1.0,
            burst: 1,
            timeout: Duration::from_secs(8),
            worker_count: DEFAULT_WORKER_COUNT,
        }
    }
}

/// Complete configuration for one animation run.
#[derive(Debug, Clone)]
pub struct AnimationConfig {
    /// Edge length of the square output canvas in pixels.
    pub canvas_size: u32,
    /// Number of frames to produce.
    pub frame_count: usize,
    /// Fraction of the bounding box span added on each side.
    pub margin: f64,
    /// Background color used where no basemap pixel exists.
    pub background: Rgba<u8>,
    /// Track colors, assigned round-robin by track index.
    pub track_colors: Vec<Rgba<u8>>,
    /// Polyline brush width in pixels.
    pub line_width: u32,
    /// Display duration per frame in hundredths of a second.
    pub frame_delay_cs: u16,
    /// How the basemap is fitted onto the square canvas.
    pub fit: FitMode,
    /// Background source.
    pub basemap: BasemapSource,
}

impl AnimationConfig {
    /// Minimal configuration with no basemap.
    pub fn new(canvas_size: u32, frame_count: usize, track_colors: Vec<Rgba<u8>>) -> Self {
        Self {
            canvas_size,
            frame_count,
            margin: 0.05,
            background: Rgba([0, 0, 0, 255]),
            track_colors,
            line_width: 4,
            frame_delay_cs: DEFAULT_FRAME_DELAY_CS,
            fit: FitMode::Contain,
            basemap: BasemapSource::None,
        }
    }

    /// Checks every option before any work begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CANVAS_SIZE..=MAX_CANVAS_SIZE).contains(&self.canvas_size) {
            return Err(ConfigError::CanvasSize(self.canvas_size));
        }
        if !(0.0..MAX_MARGIN).contains(&self.margin) {
            return Err(ConfigError::Margin(self.margin));
        }
        if self.track_colors.is_empty() {
            return Err(ConfigError::NoTrackColors);
        }
        if self.frame_count == 0 {
            return Err(ConfigError::NoFrames);
        }
        if self.line_width == 0 {
            return Err(ConfigError::LineWidth);
        }
        if let BasemapSource::Tiles(settings) = &self.basemap {
            if settings.requests_per_second <= 0.0 {
                return Err(ConfigError::RequestRate(settings.requests_per_second));
            }
        }
        Ok(())
    }

    pub(crate) fn render_options(&self) -> RenderOptions {
        RenderOptions {
            canvas_size: self.canvas_size,
            frame_count: self.frame_count,
            margin: self.margin,
            background: self.background,
            track_colors: self.track_colors.clone(),
            line_width: self.line_width,
            frame_delay_cs: self.frame_delay_cs,
        }
    }
}
