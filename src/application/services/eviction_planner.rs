//! Age-then-size eviction planning.
//!
//! Planning is pure; applying a plan (file deletes, index persistence) lives in
//! the infrastructure evictor.

use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::{CacheIndex, CacheKey};

/// Default maximum entry age (7 days).
pub const DEFAULT_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Default size budget (100 MB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Age and size budgets for the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Entries idle for longer than this are expired.
    pub max_age: Duration,
    /// Total bytes allowed after a sweep.
    pub max_size_bytes: u64,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::seconds(i64::try_from(DEFAULT_MAX_AGE_SECS).unwrap_or(i64::MAX)),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

/// Keys selected for removal by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionPlan {
    /// Entries idle past the age budget.
    pub expired: Vec<CacheKey>,
    /// Live entries removed, oldest-accessed first, to get under the size budget.
    pub over_budget: Vec<CacheKey>,
    /// Bytes left once every planned removal is applied.
    pub remaining_bytes: u64,
}

impl EvictionPlan {
    /// Every key to remove, expired first.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.expired.iter().chain(self.over_budget.iter())
    }

    /// Number of keys to remove.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expired.len() + self.over_budget.len()
    }

    /// Returns true if nothing needs removing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes which entries a sweep removes.
pub struct EvictionPlanner;

impl EvictionPlanner {
    /// Plans a sweep of `index` at `now`.
    ///
    /// Expired entries always go. If the live remainder is over budget, live
    /// entries are removed in ascending `lastAccessed` order (ties broken by key)
    /// until the total fits or nothing is left.
    #[must_use]
    pub fn plan(index: &CacheIndex, now: DateTime<Utc>, policy: &EvictionPolicy) -> EvictionPlan {
        let (expired, mut live): (Vec<_>, Vec<_>) = index
            .files
            .iter()
            .partition(|(_, entry)| entry.is_expired(now, policy.max_age));

        let mut remaining: u64 = live.iter().map(|(_, e)| e.size_bytes).sum();
        let mut over_budget = Vec::new();

        if remaining > policy.max_size_bytes {
            live.sort_by(|(ka, a), (kb, b)| a.last_accessed.cmp(&b.last_accessed).then(ka.cmp(kb)));

            for (key, entry) in live {
                if remaining <= policy.max_size_bytes {
                    break;
                }
                remaining = remaining.saturating_sub(entry.size_bytes);
                over_budget.push(key.clone());
            }
        }

        EvictionPlan {
            expired: expired.into_iter().map(|(k, _)| k.clone()).collect(),
            over_budget,
            remaining_bytes: remaining,
        }
    }
}
