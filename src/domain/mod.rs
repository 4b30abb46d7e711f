//! Domain layer with core cache entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheEntry, CacheIndex, CacheKey, NetworkClass, TransformOptions};
pub use errors::{CacheError, CacheResult};
pub use ports::{FetcherPort, FileSystemPort, NetworkProbePort, StoredFile, TransformPort};
