//! Persisted cache index and the directory it describes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::domain::entities::{CacheIndex, CacheKey, INDEX_VERSION};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::FileSystemPort;

/// Name of the serialized index inside the cache root.
pub const METADATA_FILE: &str = "metadata.json";

/// Owns the cache root: derivative files plus `metadata.json`.
pub struct CacheStore {
    root: PathBuf,
    fs: Arc<dyn FileSystemPort>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Creates a store rooted at `root`. Nothing touches disk until [`CacheStore::init`].
    #[must_use]
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystemPort>) -> Self {
        Self { root, fs }
    }

    /// Creates the cache root.
    ///
    /// # Errors
    /// Returns `FsFailed` if the directory cannot be created.
    pub async fn init(&self) -> CacheResult<()> {
        self.fs.create_dir_all(&self.root).await
    }

    /// Returns the cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of `metadata.json`.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    /// Returns the path a key's bytes live at.
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Loads the persisted index.
    ///
    /// A missing, unreadable, or unparsable index yields a fresh empty one.
    pub async fn load(&self, now: DateTime<Utc>) -> CacheIndex {
        match self.try_load().await {
            Ok(Some(index)) => {
                debug!(entries = index.len(), "Loaded cache index");
                index
            }
            Ok(None) => {
                debug!(path = %self.metadata_path().display(), "No cache index yet, starting fresh");
                CacheIndex::new(now)
            }
            Err(e) => {
                warn!(error = %e, "Discarding cache index");
                CacheIndex::new(now)
            }
        }
    }

    async fn try_load(&self) -> CacheResult<Option<CacheIndex>> {
        let Some(bytes) = self.fs.read(&self.metadata_path()).await? else {
            return Ok(None);
        };

        let index: CacheIndex =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::corrupt(e.to_string()))?;

        if index.version != INDEX_VERSION {
            return Err(CacheError::corrupt(format!(
                "unsupported index version {}",
                index.version
            )));
        }

        Ok(Some(index))
    }

    /// Persists the whole index via write-to-temp and rename.
    ///
    /// # Errors
    /// Returns `FsFailed` if serialization or the write fails.
    pub async fn save(&self, index: &CacheIndex) -> CacheResult<()> {
        let bytes = serde_json::to_vec(index)
            .map_err(|e| CacheError::fs(format!("Failed to serialize cache index: {e}")))?;
        self.fs.write_atomic(&self.metadata_path(), &bytes).await?;
        trace!(entries = index.len(), "Saved cache index");
        Ok(())
    }

    /// Checks if a key's file is present on disk.
    pub async fn has_file(&self, key: &CacheKey) -> bool {
        self.fs.exists(&self.entry_path(key)).await
    }

    /// Deletes a key's file. A missing file is not an error.
    ///
    /// # Errors
    /// Returns `FsFailed` if the file exists but cannot be removed.
    pub async fn remove_file(&self, key: &CacheKey) -> CacheResult<bool> {
        self.fs.remove(&self.entry_path(key)).await
    }
}
