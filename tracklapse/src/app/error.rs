//! Top-level error type for animation runs.

use thiserror::Error;

use crate::encode::EncodeError;
use crate::fetch::{FetchError, StoreError};
use crate::mosaic::MosaicError;
use crate::provider::{HttpError, StaticMapError};
use crate::render::RenderError;

use super::ConfigError;

/// Errors surfaced by [`run`](crate::app::run).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create Tokio runtime: {0}")]
    Runtime(std::io::Error),

    #[error("tile cache: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client: {0}")]
    Http(#[from] HttpError),

    #[error("fetch static map: {0}")]
    StaticMap(#[from] StaticMapError),

    #[error("build mosaic: {0}")]
    Mosaic(#[from] MosaicError),

    #[error("render frames: {0}")]
    Render(#[from] RenderError),

    #[error("encode GIF: {0}")]
    Encode(#[from] EncodeError),
}

impl AppError {
    /// True when the underlying failure was a cooperative cancellation
    /// rather than a real error.
    pub fn is_cancelled(&self) -> bool {
        match self {
            AppError::Mosaic(MosaicError::Cancelled)
            | AppError::Render(RenderError::Cancelled)
            | AppError::Encode(EncodeError::Cancelled) => true,
            AppError::Mosaic(MosaicError::Fetch {
                source: FetchError::Cancelled,
                ..
            }) => true,
            _ => false,
        }
    }
}
