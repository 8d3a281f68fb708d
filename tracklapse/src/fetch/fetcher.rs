//! Cache-first, rate-limited, retrying tile fetcher.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{RateLimiter, StoreError, StoredTile, TileStore};
use crate::provider::{AsyncHttpClient, HttpError};

/// Attempts per tile before the fetch gives up.
const MAX_ATTEMPTS: u32 = 3;

/// Base delay between attempts; the wait grows linearly with the attempt
/// number.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Errors from the tile fetch pipeline.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt failed; carries the last observed cause.
    #[error("tile request exhausted {attempts} attempts for {url}: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: HttpError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("operation cancelled")]
    Cancelled,
}

/// Fetches individual tiles, consulting the injected store before touching
/// the network and writing successful responses through it.
///
/// Concurrent callers requesting the same URL are not deduplicated; the
/// shared rate limiter still bounds the aggregate request rate, so the
/// redundant fetch is waste, not a correctness problem.
pub struct TileFetcher<C: AsyncHttpClient> {
    http: C,
    limiter: Arc<RateLimiter>,
    store: Arc<dyn TileStore>,
    max_attempts: u32,
}

impl<C: AsyncHttpClient> TileFetcher<C> {
    pub fn new(http: C, limiter: Arc<RateLimiter>, store: Arc<dyn TileStore>) -> Self {
        Self {
            http,
            limiter,
            store,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Fetches one tile by fully resolved URL.
    ///
    /// A store hit returns immediately without consuming a rate-limiter
    /// token. On a miss, each attempt acquires a token first; non-2xx
    /// statuses and transport errors are retried with linearly increasing
    /// backoff, and cancellation is honored before every wait.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<StoredTile, FetchError> {
        if let Some(hit) = self.store.get(url).await? {
            debug!(url, "tile cache hit");
            return Ok(hit);
        }

        let mut last: Option<HttpError> = None;
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let backoff = RETRY_BASE_DELAY * attempt;
                tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }

            self.limiter.acquire(cancel).await?;

            match self.http.get(url, headers).await {
                Ok(response) => {
                    self.store
                        .put(url, &response.bytes, &response.content_type)
                        .await?;
                    debug!(url, bytes = response.bytes.len(), "tile fetched");
                    return Ok(StoredTile {
                        bytes: response.bytes,
                        content_type: response.content_type,
                    });
                }
                Err(err) => {
                    warn!(url, attempt, error = %err, "tile fetch attempt failed");
                    last = Some(err);
                }
            }
        }

        let last = last.unwrap_or(HttpError::Transport {
            url: url.to_string(),
            reason: "no attempts were made".to_string(),
        });
        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last,
        })
    }
}
