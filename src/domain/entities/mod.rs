//! Domain entities.

mod cache_entry;
mod quality;

pub use cache_entry::{CacheEntry, CacheIndex, CacheKey, INDEX_VERSION};
pub use quality::{
    ImageFormat, NetworkClass, QualityLadder, QualityProfile, TransformOptions,
    TransformOverrides,
};
