//! Application layer with pure cache policy services.

/// Quality selection, eviction planning, and URI classification.
pub mod services;

pub use services::{EvictionPlan, EvictionPlanner, EvictionPolicy, QualityPolicy, UriClassifier};
