//! Local filesystem port definition.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::errors::CacheResult;

/// Port for the handful of filesystem operations the cache needs.
#[async_trait]
pub trait FileSystemPort: Send + Sync {
    /// Reads a whole file. Returns `None` if it does not exist.
    async fn read(&self, path: &Path) -> CacheResult<Option<Vec<u8>>>;

    /// Replaces a file's contents without ever exposing a half-written file.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> CacheResult<()>;

    /// Deletes a file. Returns `false` if it was already gone.
    async fn remove(&self, path: &Path) -> CacheResult<bool>;

    /// Creates a directory and its parents.
    async fn create_dir_all(&self, path: &Path) -> CacheResult<()>;

    /// Returns a file's size, or `None` if it does not exist.
    async fn file_size(&self, path: &Path) -> CacheResult<Option<u64>>;

    /// Checks if a file exists.
    async fn exists(&self, path: &Path) -> bool {
        matches!(self.file_size(path).await, Ok(Some(_)))
    }
}
