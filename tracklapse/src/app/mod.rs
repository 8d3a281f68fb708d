//! Animation entry point
//!
//! Wires configuration validation, background acquisition (static image or
//! tile mosaic), and the frame renderer into one call. The tile-fetch
//! pipeline is async; this module owns the Tokio runtime so callers stay
//! synchronous, and frame rendering runs sequentially after the background
//! is composited.

mod config;
mod error;

pub use config::{
    AnimationConfig, BasemapSource, ConfigError, TileSettings, MAX_CANVAS_SIZE, MAX_MARGIN,
    MIN_CANVAS_SIZE,
};
pub use error::AppError;

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::fetch::{DiskTileStore, NoopTileStore, RateLimiter, TileFetcher, TileStore};
use crate::mosaic::{build_mosaic, fit_to_canvas};
use crate::provider::{expand_static_url, fetch_static_map, ReqwestClient};
use crate::render::{render_frames, PalettedFrame};
use crate::track::{BoundingBox, Track};

/// HTTP timeout for the single static-basemap request.
const STATIC_MAP_TIMEOUT: Duration = Duration::from_secs(30);

/// A rendered animation, ready for encoding.
pub struct Animation {
    pub frames: Vec<PalettedFrame>,
    /// Zoom level of the mosaic background, when one was built.
    pub zoom: Option<u8>,
    /// Attribution line owed to the configured tile source.
    pub attribution: Option<String>,
}

/// Background raster composited under every frame.
struct Background {
    image: RgbaImage,
    zoom: Option<u8>,
    attribution: Option<String>,
}

/// Renders the complete animation for the given tracks.
///
/// Validates the configuration, acquires the configured background once up
/// front, then produces the frame sequence. Cancelling the token stops the
/// run at the next checkpoint.
pub fn run(
    tracks: &[Track],
    config: &AnimationConfig,
    cancel: &CancellationToken,
) -> Result<Animation, AppError> {
    config.validate()?;

    let background = match &config.basemap {
        BasemapSource::None => None,
        _ => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(AppError::Runtime)?;
            runtime.block_on(acquire_background(tracks, config, cancel))?
        }
    };

    let (basemap, zoom, attribution) = match background {
        Some(bg) => (Some(bg.image), bg.zoom, bg.attribution),
        None => (None, None, None),
    };

    let frames = render_frames(tracks, &config.render_options(), basemap.as_ref(), cancel)?;
    info!(frames = frames.len(), "animation rendered");

    Ok(Animation {
        frames,
        zoom,
        attribution,
    })
}

/// Fetches and fits the configured background raster.
async fn acquire_background(
    tracks: &[Track],
    config: &AnimationConfig,
    cancel: &CancellationToken,
) -> Result<Option<Background>, AppError> {
    // An empty input renders nothing; the renderer reports it.
    let Some(bbox) = BoundingBox::from_tracks(tracks) else {
        return Ok(None);
    };
    let bbox = bbox.expanded(config.margin);
    let size = config.canvas_size;

    match &config.basemap {
        BasemapSource::None => Ok(None),

        BasemapSource::Static { url_template } => {
            let http = ReqwestClient::new(STATIC_MAP_TIMEOUT)?;
            let url = expand_static_url(url_template, &bbox, size, size);
            let image = fetch_static_map(&http, &url).await?;
            let fitted = fit_to_canvas(&image, size, size, config.fit, config.background);
            Ok(Some(Background {
                image: fitted,
                zoom: None,
                attribution: None,
            }))
        }

        BasemapSource::Tiles(settings) => {
            let store: Arc<dyn TileStore> = match &settings.cache_dir {
                Some(dir) => {
                    info!(cache = %dir.display(), "using on-disk tile cache");
                    Arc::new(DiskTileStore::new(dir)?)
                }
                None => Arc::new(NoopTileStore),
            };
            let limiter = Arc::new(RateLimiter::new(
                settings.requests_per_second,
                settings.burst,
            ));
            let http = ReqwestClient::new(settings.timeout)?;
            let fetcher = Arc::new(TileFetcher::new(http, limiter, store));

            let mosaic = build_mosaic(
                fetcher,
                &settings.preset,
                &bbox,
                size,
                size,
                settings.worker_count,
                cancel,
            )
            .await?;
            let fitted = fit_to_canvas(&mosaic.image, size, size, config.fit, config.background);
            Ok(Some(Background {
                image: fitted,
                zoom: Some(mosaic.zoom),
                attribution: Some(mosaic.attribution),
            }))
        }
    }
}
