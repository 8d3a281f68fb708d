//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! web-mercator world pixels, and slippy-map tile indices, plus zoom-level
//! selection for fitting a bounding box onto a pixel canvas.
//!
//! All functions are pure math with no I/O or shared state and are safe to
//! call from any number of concurrent callers.

mod types;

pub use types::{PixelRect, TileCoord, TileRange, MAX_MERCATOR_LAT, TILE_SIZE};

use crate::track::BoundingBox;
use std::f64::consts::PI;

/// Normalized mercator X in `[0, 1]` for a longitude in degrees.
fn merc_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Normalized mercator Y in `[0, 1]` for a latitude in degrees.
///
/// Latitude is clamped to the mercator singularity bound before projecting.
fn merc_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let s = (lat * PI / 180.0).sin();
    0.5 - ((1.0 + s) / (1.0 - s)).ln() / (4.0 * PI)
}

/// World raster edge length in pixels at the given zoom (256 * 2^zoom).
fn world_size(zoom: u8) -> f64 {
    f64::from(TILE_SIZE) * 2.0_f64.powi(i32::from(zoom))
}

/// Projects a geographic coordinate to world-pixel coordinates at a zoom.
///
/// World pixels address the full 256·2^zoom square world raster before any
/// cropping to a bounding box.
#[inline]
pub fn project(lon: f64, lat: f64, zoom: u8) -> (f64, f64) {
    let ws = world_size(zoom);
    (merc_x(lon) * ws, merc_y(lat) * ws)
}

/// Converts world-pixel coordinates to a tile index plus the pixel offset
/// inside that tile.
#[inline]
pub fn pixel_to_tile(px: f64, py: f64) -> (i64, i64, i64, i64) {
    let tile = f64::from(TILE_SIZE);
    let tx = (px / tile).floor() as i64;
    let ty = (py / tile).floor() as i64;
    let ox = px.floor() as i64 - tx * i64::from(TILE_SIZE);
    let oy = py.floor() as i64 - ty * i64::from(TILE_SIZE);
    (tx, ty, ox, oy)
}

/// Projects a bounding box to its world-pixel rectangle at a zoom.
///
/// The top-left corner comes from (min_lon, max_lat) and the bottom-right
/// from (max_lon, min_lat): mercator Y grows southward.
pub fn bbox_pixels(bbox: &BoundingBox, zoom: u8) -> PixelRect {
    let (left, top) = project(bbox.min_lon, bbox.max_lat, zoom);
    let (right, bottom) = project(bbox.max_lon, bbox.min_lat, zoom);
    PixelRect {
        left,
        top,
        right,
        bottom,
    }
}

/// Returns the inclusive tile range covering the bounding box at a zoom.
///
/// The bottom/right edge subtracts one pixel before flooring so a boundary
/// landing exactly on a tile edge does not pull in a spurious extra
/// row/column.
pub fn covering_tiles(bbox: &BoundingBox, zoom: u8) -> TileRange {
    let rect = bbox_pixels(bbox, zoom);
    let tile = f64::from(TILE_SIZE);
    TileRange {
        min_x: (rect.left / tile).floor() as i64,
        min_y: (rect.top / tile).floor() as i64,
        max_x: ((rect.right - 1.0) / tile).floor() as i64,
        max_y: ((rect.bottom - 1.0) / tile).floor() as i64,
        zoom,
    }
}

/// Finds the highest zoom in `[min_zoom, max_zoom]` whose projected bounding
/// box fits within the target canvas, scanning from `max_zoom` downward.
///
/// Falls back to `min_zoom` when nothing fits; a too-small canvas degrades
/// the output but is not an error.
pub fn fit_zoom(
    bbox: &BoundingBox,
    target_w: u32,
    target_h: u32,
    min_zoom: u8,
    max_zoom: u8,
) -> u8 {
    for zoom in (min_zoom..=max_zoom).rev() {
        let rect = bbox_pixels(bbox, zoom);
        if rect.width().ceil() as i64 <= i64::from(target_w)
            && rect.height().ceil() as i64 <= i64::from(target_h)
        {
            return zoom;
        }
    }
    min_zoom
}

/// Clamps a zoom level into `[min_zoom, max_zoom]`.
pub fn clamp_zoom(zoom: u8, min_zoom: u8, max_zoom: u8) -> u8 {
    zoom.clamp(min_zoom, max_zoom)
}
