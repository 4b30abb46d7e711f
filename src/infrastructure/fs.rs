//! Tokio-backed filesystem adapter.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{trace, warn};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::FileSystemPort;

/// Filesystem adapter over `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates the adapter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Sibling path used while a file is being written.
#[must_use]
pub fn staging_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "file".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!("{name}.{}.{suffix}", uuid::Uuid::new_v4().simple()))
}

#[async_trait]
impl FileSystemPort for TokioFileSystem {
    async fn read(&self, path: &Path) -> CacheResult<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::fs(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> CacheResult<()> {
        let tmp = staging_path(path, "tmp");

        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&tmp).await
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(path = %tmp.display(), error = %cleanup, "Failed to remove staging file");
            }
            return Err(CacheError::fs(format!(
                "Failed to write {}: {e}",
                path.display()
            )));
        }

        trace!(path = %path.display(), size = bytes.len(), "Wrote file atomically");
        Ok(())
    }

    async fn remove(&self, path: &Path) -> CacheResult<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::fs(format!(
                "Failed to remove {}: {e}",
                path.display()
            ))),
        }
    }

    async fn create_dir_all(&self, path: &Path) -> CacheResult<()> {
        fs::create_dir_all(path).await.map_err(|e| {
            CacheError::fs(format!("Failed to create dir {}: {e}", path.display()))
        })
    }

    async fn file_size(&self, path: &Path) -> CacheResult<Option<u64>> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::fs(format!(
                "Failed to stat {}: {e}",
                path.display()
            ))),
        }
    }
}
