//! Fetcher port definition.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::CacheResult;

/// A file the pipeline has placed inside the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Where the bytes now live.
    pub path: PathBuf,
    /// Byte length, from transfer headers where available.
    pub size_bytes: u64,
}

/// Port for retrieving the bytes behind a URI.
#[async_trait]
pub trait FetcherPort: Send + Sync {
    /// Downloads `uri` into `dest`.
    ///
    /// Re-fetching the same URI is safe; coalescing concurrent fetches is the
    /// caller's job.
    async fn fetch(&self, uri: &str, dest: &Path) -> CacheResult<StoredFile>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::errors::CacheError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fetcher that writes a fixed payload and counts calls.
    pub struct CountingFetcher {
        payload: Vec<u8>,
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Option<Duration>,
    }

    impl CountingFetcher {
        /// Creates a fetcher serving `payload` for every URI.
        pub fn new(payload: impl Into<Vec<u8>>) -> Self {
            Self {
                payload: payload.into(),
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay: None,
            }
        }

        /// Creates a fetcher that always fails.
        pub fn failing() -> Self {
            let fetcher = Self::new(Vec::new());
            fetcher.set_failing(true);
            fetcher
        }

        /// Sleeps before completing each fetch.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Toggles failure mode.
        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        /// Number of fetches started.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FetcherPort for CountingFetcher {
        async fn fetch(&self, uri: &str, dest: &Path) -> CacheResult<StoredFile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(CacheError::fetch(format!("simulated failure for {uri}")));
            }
            tokio::fs::write(dest, &self.payload)
                .await
                .map_err(|e| CacheError::fetch(e.to_string()))?;
            Ok(StoredFile {
                path: dest.to_path_buf(),
                size_bytes: self.payload.len() as u64,
            })
        }
    }
}
