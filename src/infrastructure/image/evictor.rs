//! Applies eviction plans to the cache directory and index.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::cache_store::CacheStore;
use crate::application::services::{EvictionPlanner, EvictionPolicy};
use crate::domain::entities::CacheIndex;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Entries removed from the index.
    pub removed: usize,
    /// Bytes those entries accounted for.
    pub freed_bytes: u64,
    /// Bytes still indexed after the sweep.
    pub remaining_bytes: u64,
}

impl std::fmt::Display for EvictionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Evicted {} entries ({} bytes freed, {} bytes remaining)",
            self.removed, self.freed_bytes, self.remaining_bytes
        )
    }
}

/// Keeps the cache within its age and size budgets.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evictor {
    policy: EvictionPolicy,
}

impl Evictor {
    /// Creates an evictor enforcing `policy`.
    #[must_use]
    pub const fn new(policy: EvictionPolicy) -> Self {
        Self { policy }
    }

    /// Sweeps `index` at `now`: deletes planned files, drops their entries, and
    /// persists the index.
    ///
    /// File deletes are best effort; one failure never stops the sweep.
    pub async fn run(&self, store: &CacheStore, index: &mut CacheIndex, now: DateTime<Utc>) -> EvictionReport {
        index.last_cleanup_at = now;

        let plan = EvictionPlanner::plan(index, now, &self.policy);
        debug!(
            expired = plan.expired.len(),
            over_budget = plan.over_budget.len(),
            "Planned cache sweep"
        );

        let mut report = EvictionReport {
            remaining_bytes: plan.remaining_bytes,
            ..EvictionReport::default()
        };

        for key in plan.keys() {
            match store.remove_file(key).await {
                Ok(true) => debug!(key = %key, "Removed cached file"),
                Ok(false) => debug!(key = %key, "Cached file already gone"),
                Err(e) => warn!(key = %key, error = %e, "Failed to remove cached file"),
            }
            if let Some(entry) = index.remove(key) {
                report.removed += 1;
                report.freed_bytes += entry.size_bytes;
            }
        }

        if let Err(e) = store.save(index).await {
            warn!(error = %e, "Failed to persist index after sweep");
        }

        if report.removed > 0 {
            info!(
                removed = report.removed,
                freed = report.freed_bytes,
                remaining = report.remaining_bytes,
                "Cache sweep complete"
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CacheEntry, CacheKey};
    use crate::domain::errors::{CacheError, CacheResult};
    use crate::domain::ports::FileSystemPort;
    use crate::infrastructure::fs::TokioFileSystem;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Filesystem whose deletes fail for one file name.
    struct StuckFileFs {
        inner: TokioFileSystem,
        stuck: &'static str,
    }

    #[async_trait]
    impl FileSystemPort for StuckFileFs {
        async fn read(&self, path: &Path) -> CacheResult<Option<Vec<u8>>> {
            self.inner.read(path).await
        }

        async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> CacheResult<()> {
            self.inner.write_atomic(path, bytes).await
        }

        async fn remove(&self, path: &Path) -> CacheResult<bool> {
            if path.file_name().is_some_and(|n| n == self.stuck) {
                return Err(CacheError::fs("permission denied"));
            }
            self.inner.remove(path).await
        }

        async fn create_dir_all(&self, path: &Path) -> CacheResult<()> {
            self.inner.create_dir_all(path).await
        }

        async fn file_size(&self, path: &Path) -> CacheResult<Option<u64>> {
            self.inner.file_size(path).await
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    async fn seeded_store(entries: &[(&str, i64, u64)]) -> (CacheStore, CacheIndex, TempDir) {
        seeded_store_with(Arc::new(TokioFileSystem::new()), entries).await
    }

    async fn seeded_store_with(
        fs: Arc<dyn FileSystemPort>,
        entries: &[(&str, i64, u64)],
    ) -> (CacheStore, CacheIndex, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().to_path_buf(), fs);
        store.init().await.unwrap();

        let mut index = CacheIndex::new(at(0));
        for (key, accessed, size) in entries {
            let key = CacheKey::new(*key);
            tokio::fs::write(store.entry_path(&key), vec![0u8; usize::try_from(*size).unwrap()])
                .await
                .unwrap();
            index.put(key, CacheEntry::new("https://x/img", *size, at(*accessed)));
        }
        (store, index, temp)
    }

    #[tokio::test]
    async fn test_removes_expired_files_and_entries() {
        let (store, mut index, _temp) =
            seeded_store(&[("old.jpg", 0, 10), ("new.jpg", 9_000, 10)]).await;
        let evictor = Evictor::new(EvictionPolicy {
            max_age: Duration::milliseconds(5_000),
            max_size_bytes: u64::MAX,
        });

        let report = evictor.run(&store, &mut index, at(10_000)).await;

        assert_eq!(report.removed, 1);
        assert_eq!(report.freed_bytes, 10);
        assert!(!store.has_file(&CacheKey::new("old.jpg")).await);
        assert!(store.has_file(&CacheKey::new("new.jpg")).await);
        assert!(index.get(&CacheKey::new("old.jpg")).is_none());
        assert_eq!(index.last_cleanup_at, at(10_000));

        let persisted = store.load(at(0)).await;
        assert_eq!(persisted, index);
    }

    #[tokio::test]
    async fn test_size_sweep_removes_oldest_first() {
        let (store, mut index, _temp) =
            seeded_store(&[("a.jpg", 100, 40), ("b.jpg", 200, 40), ("c.jpg", 300, 40)]).await;
        let evictor = Evictor::new(EvictionPolicy {
            max_age: Duration::days(7),
            max_size_bytes: 80,
        });

        let report = evictor.run(&store, &mut index, at(400)).await;

        assert_eq!(report.removed, 1);
        assert_eq!(report.remaining_bytes, 80);
        assert!(!store.has_file(&CacheKey::new("a.jpg")).await);
        assert!(index.total_size() <= 80);
    }

    #[tokio::test]
    async fn test_missing_file_does_not_abort_sweep() {
        let (store, mut index, _temp) =
            seeded_store(&[("gone.jpg", 0, 5), ("old.jpg", 0, 5)]).await;
        tokio::fs::remove_file(store.entry_path(&CacheKey::new("gone.jpg")))
            .await
            .unwrap();
        let evictor = Evictor::new(EvictionPolicy {
            max_age: Duration::milliseconds(1),
            max_size_bytes: u64::MAX,
        });

        let report = evictor.run(&store, &mut index, at(1_000)).await;

        assert_eq!(report.removed, 2);
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_abort_sweep() {
        let fs = Arc::new(StuckFileFs {
            inner: TokioFileSystem::new(),
            stuck: "locked.jpg",
        });
        let (store, mut index, _temp) = seeded_store_with(
            fs,
            &[("locked.jpg", 0, 5), ("old.jpg", 10, 5), ("older.jpg", 5, 5)],
        )
        .await;
        let evictor = Evictor::new(EvictionPolicy {
            max_age: Duration::milliseconds(1),
            max_size_bytes: u64::MAX,
        });

        let report = evictor.run(&store, &mut index, at(1_000)).await;

        assert_eq!(report.removed, 3);
        assert!(index.is_empty());
        assert!(store.has_file(&CacheKey::new("locked.jpg")).await);
        assert!(!store.has_file(&CacheKey::new("old.jpg")).await);
        assert!(!store.has_file(&CacheKey::new("older.jpg")).await);

        let persisted = store.load(at(0)).await;
        assert!(persisted.is_empty());
        assert_eq!(persisted.last_cleanup_at, at(1_000));
    }
}
