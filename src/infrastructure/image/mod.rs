//! Image cache infrastructure.
//!
//! This module provides:
//! - The on-disk store and its `metadata.json` index
//! - HTTP fetching into the cache directory
//! - Resize/recompress derivatives
//! - Age and size eviction
//! - The [`CacheManager`] facade tying them together

pub mod cache_manager;
pub mod cache_store;
pub mod evictor;
pub mod fetcher;
pub mod transform;

pub use cache_manager::{
    CacheManager, CacheManagerConfig, CachePorts, CacheStats, DEFAULT_CLEANUP_INTERVAL_SECS,
};
pub use cache_store::{CacheStore, METADATA_FILE};
pub use evictor::{EvictionReport, Evictor};
pub use fetcher::{DEFAULT_TIMEOUT_SECS, HttpFetcher};
pub use transform::{ImageTransformer, target_dimensions};
