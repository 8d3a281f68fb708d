//! Static single-image basemap fetch.
//!
//! The alternative to tile mosaics: one GET against a template that embeds
//! the bounding box and canvas size, decoded straight into a raster.

use crate::track::BoundingBox;
use image::RgbaImage;
use thiserror::Error;
use tracing::debug;

use super::{AsyncHttpClient, HttpError};

/// Errors from the static basemap path.
#[derive(Debug, Error)]
pub enum StaticMapError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("failed to decode static map image: {0}")]
    Decode(String),
}

/// Expands a static-map URL template.
///
/// Recognized placeholders: `{minLon}`, `{minLat}`, `{maxLon}`, `{maxLat}`
/// (6 decimal places) and `{w}`, `{h}`. Substitution is plain text
/// replacement.
pub fn expand_static_url(template: &str, bbox: &BoundingBox, width: u32, height: u32) -> String {
    template
        .replace("{minLon}", &format!("{:.6}", bbox.min_lon))
        .replace("{minLat}", &format!("{:.6}", bbox.min_lat))
        .replace("{maxLon}", &format!("{:.6}", bbox.max_lon))
        .replace("{maxLat}", &format!("{:.6}", bbox.max_lat))
        .replace("{w}", &width.to_string())
        .replace("{h}", &height.to_string())
        .trim()
        .to_string()
}

/// Fetches and decodes a static basemap image.
pub async fn fetch_static_map<C: AsyncHttpClient>(
    http: &C,
    url: &str,
) -> Result<RgbaImage, StaticMapError> {
    debug!(url, "fetching static basemap");
    let response = http.get(url, &[]).await?;
    image::load_from_memory(&response.bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| StaticMapError::Decode(e.to_string()))
}
