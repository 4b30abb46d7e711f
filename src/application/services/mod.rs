pub mod eviction_planner;
pub mod quality_policy;
pub mod uri_classifier;

pub use eviction_planner::{EvictionPlan, EvictionPlanner, EvictionPolicy};
pub use quality_policy::QualityPolicy;
pub use uri_classifier::UriClassifier;
