//! Infrastructure layer with filesystem, network, and codec adapters.

/// Application configuration.
pub mod config;
pub mod fs;
/// Image cache (store, fetch, transform, eviction).
pub mod image;
pub mod network;

pub use config::{CacheConfig, CliArgs, Command, ConfigError, ConfigLoader, LogLevel};
pub use fs::TokioFileSystem;
pub use image::{
    CacheManager, CacheManagerConfig, CachePorts, CacheStats, CacheStore, EvictionReport,
    Evictor, HttpFetcher, ImageTransformer,
};
pub use network::StaticNetworkProbe;
