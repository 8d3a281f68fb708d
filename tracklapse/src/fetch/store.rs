//! Tile stores: content-addressed disk cache and the no-op fallback.
//!
//! Entries are keyed by the SHA-256 of the fully resolved URL — query
//! string included, so distinct credentialed requests to the same path
//! cache separately. The file extension is inferred from the URL path with
//! the query stripped. Writes go to a temporary file first and are renamed
//! into place, so a concurrent reader never observes a partial entry; the
//! cache grows unbounded by design.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::trace;

use crate::provider::BoxFuture;

/// Fallback extension when none can be inferred from the URL.
const DEFAULT_EXTENSION: &str = ".tile";

/// Longest extension (dot included) taken from a URL path.
const MAX_EXTENSION_LEN: usize = 5;

/// Errors from tile store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A cached tile body plus its recorded content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTile {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Persistent key-value storage for fetched tiles.
///
/// The fetch engine is parameterized by this trait: a real disk cache and
/// the no-op store share one code path. Uses `Pin<Box<dyn Future>>` so the
/// trait stays dyn-compatible (`Arc<dyn TileStore>`).
pub trait TileStore: Send + Sync {
    /// Looks up a tile by its resolved URL.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<StoredTile>, StoreError>>;

    /// Persists a fetched tile under its resolved URL.
    fn put<'a>(
        &'a self,
        url: &'a str,
        bytes: &'a [u8],
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// On-disk tile store bucketed by URL hash.
///
/// Layout: `<root>/<h0h1>/<h2h3>/<sha256-hex><ext>` with a sibling
/// `<sha256-hex><ext>.ct` file holding the raw content-type string.
pub struct DiskTileStore {
    root: PathBuf,
}

impl DiskTileStore {
    /// Opens (creating if necessary) a store rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Computes the on-disk path for a URL.
    fn entry_path(&self, url: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
        let ext = infer_extension(url);
        self.root
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(format!("{digest}{ext}"))
    }
}

/// Appends `suffix` to a path's file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// Infers a file extension from the URL path, ignoring the query string.
fn infer_extension(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    match path.rfind('.') {
        Some(i) if path.len() - i <= MAX_EXTENSION_LEN && !path[i..].contains('/') => &path[i..],
        _ => DEFAULT_EXTENSION,
    }
}

impl TileStore for DiskTileStore {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<StoredTile>, StoreError>> {
        Box::pin(async move {
            let path = self.entry_path(url);
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    let content_type = tokio::fs::read_to_string(sibling(&path, ".ct"))
                        .await
                        .unwrap_or_default();
                    trace!(url, path = %path.display(), "tile cache hit");
                    Ok(Some(StoredTile {
                        bytes,
                        content_type,
                    }))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn put<'a>(
        &'a self,
        url: &'a str,
        bytes: &'a [u8],
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let path = self.entry_path(url);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            // Temp file then rename: readers never see a torn entry.
            let tmp = sibling(&path, ".tmp");
            tokio::fs::write(&tmp, bytes).await?;
            tokio::fs::write(sibling(&path, ".ct"), content_type).await?;
            tokio::fs::rename(&tmp, &path).await?;
            trace!(url, path = %path.display(), "tile cached");
            Ok(())
        })
    }
}

/// Store used when no cache directory is configured: every lookup misses
/// and writes vanish.
pub struct NoopTileStore;

impl TileStore for NoopTileStore {
    fn get<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Option<StoredTile>, StoreError>> {
        Box::pin(async { Ok(None) })
    }

    fn put<'a>(
        &'a self,
        _url: &'a str,
        _bytes: &'a [u8],
        _content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }
}
