//! Tile acquisition: rate limiting, on-disk caching, retrying fetches
//!
//! One [`TileFetcher`] serves the whole run. It checks the injected
//! [`TileStore`] first, then takes a token from the process-wide
//! [`RateLimiter`] before every network attempt, retrying with linearly
//! increasing backoff. The store decides whether fetches persist
//! ([`DiskTileStore`]) or not ([`NoopTileStore`]).

mod fetcher;
mod limiter;
mod store;

pub use fetcher::{FetchError, TileFetcher};
pub use limiter::RateLimiter;
pub use store::{DiskTileStore, NoopTileStore, StoreError, StoredTile, TileStore};
