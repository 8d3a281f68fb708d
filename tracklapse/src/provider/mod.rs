//! Tile-source presets and HTTP plumbing
//!
//! This module provides the named slippy-map presets (URL template,
//! attribution, zoom bounds, optional request headers), the HTTP client
//! abstraction used by the fetch pipeline, and the static single-image
//! basemap path.

mod http;
mod preset;
mod static_map;

pub use http::{AsyncHttpClient, BoxFuture, HttpError, HttpResponse, ReqwestClient};
pub use preset::{lookup_preset, Preset, PresetError};
pub use static_map::{expand_static_url, fetch_static_map, StaticMapError};

#[cfg(test)]
pub use http::tests::MockHttpClient;
