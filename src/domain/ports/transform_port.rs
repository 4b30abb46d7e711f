//! Transform engine port definition.

use std::path::Path;

use async_trait::async_trait;

use super::StoredFile;
use crate::domain::entities::TransformOptions;
use crate::domain::errors::CacheResult;

/// Port for producing resized/recompressed derivatives.
#[async_trait]
pub trait TransformPort: Send + Sync {
    /// Writes a derivative of `source` to `dest`.
    async fn transform(
        &self,
        source: &Path,
        dest: &Path,
        options: &TransformOptions,
    ) -> CacheResult<StoredFile>;
}
