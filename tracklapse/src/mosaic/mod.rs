//! Mosaic assembly
//!
//! Turns a geographic bounding box into a background raster: picks the zoom
//! that fits the target canvas, enumerates the covering tile range, fetches
//! the tiles through a bounded worker pool, pastes each decoded tile at its
//! grid offset, and crops the result to the exact projected bounding box.
//!
//! One engine serves both the cached and the uncached configuration — the
//! difference is entirely in the [`TileStore`](crate::fetch::TileStore)
//! injected into the fetcher.

mod fit;

pub use fit::{fit_to_canvas, FitMode};

use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coord::{self, TileCoord, TILE_SIZE};
use crate::fetch::{FetchError, TileFetcher};
use crate::provider::{AsyncHttpClient, Preset, PresetError};
use crate::track::BoundingBox;

/// Default number of concurrent tile workers.
pub const DEFAULT_WORKER_COUNT: usize = 6;

/// Errors from mosaic assembly.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// The projected bounding box has no pixel area at the chosen zoom.
    #[error("invalid mosaic size {width}x{height}")]
    InvalidSize { width: i64, height: i64 },

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error("get tile {url}: {source}")]
    Fetch { url: String, source: FetchError },

    #[error("decode tile {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("operation cancelled")]
    Cancelled,
}

/// An assembled background raster plus the zoom it was built at and the
/// attribution owed to the tile source.
pub struct Mosaic {
    pub image: RgbaImage,
    pub zoom: u8,
    pub attribution: String,
}

/// Builds the mosaic covering `bbox`, sized to fit the target canvas.
///
/// Tile fetch order across the pool is unspecified; every tile is pasted
/// independently at its computed offset, so ordering never affects the
/// result. Any single tile failure aborts the whole mosaic with that tile's
/// error — there is no partial-mosaic fallback.
pub async fn build_mosaic<C>(
    fetcher: Arc<TileFetcher<C>>,
    preset: &Preset,
    bbox: &BoundingBox,
    target_w: u32,
    target_h: u32,
    worker_count: usize,
    cancel: &CancellationToken,
) -> Result<Mosaic, MosaicError>
where
    C: AsyncHttpClient + 'static,
{
    let zoom = coord::clamp_zoom(
        coord::fit_zoom(bbox, target_w, target_h, preset.min_zoom, preset.max_zoom),
        preset.min_zoom,
        preset.max_zoom,
    );
    let rect = coord::bbox_pixels(bbox, zoom);
    let crop_w = rect.width().ceil() as i64;
    let crop_h = rect.height().ceil() as i64;
    if crop_w <= 0 || crop_h <= 0 {
        return Err(MosaicError::InvalidSize {
            width: crop_w,
            height: crop_h,
        });
    }

    let range = coord::covering_tiles(bbox, zoom);

    // Resolve every tile URL up front so template problems surface before
    // any network work.
    let mut jobs: VecDeque<(TileCoord, String)> = VecDeque::with_capacity(range.count());
    for tile in range.iter() {
        jobs.push_back((tile, preset.tile_url(tile)?));
    }
    let tile_count = jobs.len();
    info!(
        preset = %preset.name,
        zoom,
        tiles = tile_count,
        "assembling mosaic"
    );

    let mut grid = RgbaImage::new(
        range.width_tiles() * TILE_SIZE,
        range.height_tiles() * TILE_SIZE,
    );

    let queue = Arc::new(Mutex::new(jobs));
    let headers = Arc::new(preset.headers.clone());
    let pool_cancel = cancel.child_token();
    let workers = worker_count.clamp(1, tile_count.max(1));
    let (tx, mut rx) = mpsc::channel(workers);

    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let headers = Arc::clone(&headers);
        let fetcher = Arc::clone(&fetcher);
        let pool_cancel = pool_cancel.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            loop {
                if pool_cancel.is_cancelled() {
                    break;
                }
                let job = queue.lock().pop_front();
                let Some((tile, url)) = job else { break };
                let outcome = fetch_and_decode(&fetcher, &url, &headers, &pool_cancel)
                    .await
                    .map(|img| (tile, img));
                if tx.send(outcome).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    // Single collector mutates the grid; the first error wins and the pool
    // drains without further fetches. Results still in flight are discarded.
    let mut first_error: Option<MosaicError> = None;
    while let Some(outcome) = rx.recv().await {
        match outcome {
            Ok((tile, img)) if first_error.is_none() => {
                let off_x = (tile.x - range.min_x) * i64::from(TILE_SIZE);
                let off_y = (tile.y - range.min_y) * i64::from(TILE_SIZE);
                paste(&mut grid, &img, off_x, off_y);
                debug!(x = tile.x, y = tile.y, zoom = tile.zoom, "tile pasted");
            }
            Ok(_) => {}
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                    pool_cancel.cancel();
                }
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(MosaicError::Cancelled);
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    // Crop the tile-aligned grid down to the exact projected bounding box.
    let crop_x = (rect.left.floor() as i64 - range.min_x * i64::from(TILE_SIZE)).max(0) as u32;
    let crop_y = (rect.top.floor() as i64 - range.min_y * i64::from(TILE_SIZE)).max(0) as u32;
    let crop_w = (crop_w as u32).min(grid.width().saturating_sub(crop_x));
    let crop_h = (crop_h as u32).min(grid.height().saturating_sub(crop_y));
    let image = image::imageops::crop_imm(&grid, crop_x, crop_y, crop_w, crop_h).to_image();

    Ok(Mosaic {
        image,
        zoom,
        attribution: preset.attribution.clone(),
    })
}

/// Fetches one tile and decodes it to RGBA.
async fn fetch_and_decode<C: AsyncHttpClient>(
    fetcher: &TileFetcher<C>,
    url: &str,
    headers: &[(String, String)],
    cancel: &CancellationToken,
) -> Result<RgbaImage, MosaicError> {
    let tile = fetcher
        .fetch(url, headers, cancel)
        .await
        .map_err(|source| match source {
            FetchError::Cancelled => MosaicError::Cancelled,
            other => MosaicError::Fetch {
                url: url.to_string(),
                source: other,
            },
        })?;
    image::load_from_memory(&tile.bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| MosaicError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

/// Pastes `src` into `dst` with its top-left corner at `(x, y)`.
///
/// Source pixels falling outside the destination are silently clipped.
pub(crate) fn paste(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dst_w, dst_h) = (i64::from(dst.width()), i64::from(dst.height()));
    for sy in 0..src.height() {
        let dy = y + i64::from(sy);
        if dy < 0 || dy >= dst_h {
            continue;
        }
        for sx in 0..src.width() {
            let dx = x + i64::from(sx);
            if dx < 0 || dx >= dst_w {
                continue;
            }
            dst.put_pixel(dx as u32, dy as u32, *src.get_pixel(sx, sy));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{NoopTileStore, RateLimiter};
    use crate::provider::{HttpError, MockHttpClient};
    use image::Rgba;

    fn png_tile(color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba(color));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn test_fetcher(mock: &Arc<MockHttpClient>) -> Arc<TileFetcher<Arc<MockHttpClient>>> {
        Arc::new(TileFetcher::new(
            Arc::clone(mock),
            Arc::new(RateLimiter::new(10_000.0, 100)),
            Arc::new(NoopTileStore),
        ))
    }

    fn small_bbox() -> BoundingBox {
        BoundingBox {
            min_lat: 47.0,
            max_lat: 47.4,
            min_lon: 8.0,
            max_lon: 8.4,
        }
    }

    #[tokio::test]
    async fn test_build_mosaic_dimensions_match_bbox() {
        let mock = Arc::new(MockHttpClient::serving(
            png_tile([120, 130, 140, 255]),
            "image/png",
        ));
        let fetcher = test_fetcher(&mock);
        let preset = Preset::custom("https://tiles.test/{z}/{x}/{y}.png");
        let cancel = CancellationToken::new();

        let mosaic = build_mosaic(fetcher, &preset, &small_bbox(), 256, 256, 4, &cancel)
            .await
            .unwrap();

        let rect = coord::bbox_pixels(&small_bbox(), mosaic.zoom);
        assert_eq!(mosaic.image.width(), rect.width().ceil() as u32);
        assert_eq!(mosaic.image.height(), rect.height().ceil() as u32);
        assert!(mosaic.image.width() <= 256);
        assert!(mosaic.image.height() <= 256);
        // Uniform source tiles produce a uniform mosaic.
        assert_eq!(mosaic.image.get_pixel(0, 0).0, [120, 130, 140, 255]);
        assert_eq!(mosaic.attribution, preset.attribution);
    }

    #[tokio::test]
    async fn test_build_mosaic_fetches_each_covering_tile() {
        let mock = Arc::new(MockHttpClient::serving(png_tile([1, 2, 3, 255]), "image/png"));
        let fetcher = test_fetcher(&mock);
        let preset = Preset::custom("https://tiles.test/{z}/{x}/{y}.png");
        let cancel = CancellationToken::new();

        let mosaic = build_mosaic(fetcher, &preset, &small_bbox(), 256, 256, 4, &cancel)
            .await
            .unwrap();

        let range = coord::covering_tiles(&small_bbox(), mosaic.zoom);
        let urls = mock.requested_urls();
        assert_eq!(urls.len(), range.count());
        // Every requested URL is distinct.
        let unique: std::collections::HashSet<_> = urls.iter().collect();
        assert_eq!(unique.len(), urls.len());
    }

    #[tokio::test]
    async fn test_build_mosaic_first_error_aborts() {
        let mock = Arc::new(MockHttpClient::always(Err(HttpError::Status {
            status: 404,
            url: "https://tiles.test".to_string(),
        })));
        let fetcher = test_fetcher(&mock);
        let preset = Preset::custom("https://tiles.test/{z}/{x}/{y}.png");
        let cancel = CancellationToken::new();

        let result = build_mosaic(fetcher, &preset, &small_bbox(), 256, 256, 4, &cancel).await;
        assert!(matches!(result, Err(MosaicError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_build_mosaic_decode_failure_aborts() {
        let mock = Arc::new(MockHttpClient::serving(vec![0xDE, 0xAD], "image/png"));
        let fetcher = test_fetcher(&mock);
        let preset = Preset::custom("https://tiles.test/{z}/{x}/{y}.png");
        let cancel = CancellationToken::new();

        let result = build_mosaic(fetcher, &preset, &small_bbox(), 256, 256, 4, &cancel).await;
        assert!(matches!(result, Err(MosaicError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_build_mosaic_cancelled() {
        let mock = Arc::new(MockHttpClient::serving(png_tile([0, 0, 0, 255]), "image/png"));
        let fetcher = test_fetcher(&mock);
        let preset = Preset::custom("https://tiles.test/{z}/{x}/{y}.png");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = build_mosaic(fetcher, &preset, &small_bbox(), 256, 256, 4, &cancel).await;
        assert!(matches!(result, Err(MosaicError::Cancelled)));
    }

    #[test]
    fn test_paste_clips_out_of_bounds() {
        let mut dst = RgbaImage::new(4, 4);
        let src = RgbaImage::from_pixel(3, 3, Rgba([255, 0, 0, 255]));

        // Overlap only the bottom-right corner.
        paste(&mut dst, &src, 2, 2);
        assert_eq!(dst.get_pixel(2, 2).0, [255, 0, 0, 255]);
        assert_eq!(dst.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(dst.get_pixel(1, 1).0, [0, 0, 0, 0]);

        // Fully negative offsets clip instead of panicking.
        let mut dst2 = RgbaImage::new(4, 4);
        paste(&mut dst2, &src, -2, -2);
        assert_eq!(dst2.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(dst2.get_pixel(2, 2).0, [0, 0, 0, 0]);
    }
}
