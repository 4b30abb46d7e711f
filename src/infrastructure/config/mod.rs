//! Application configuration.

pub mod args;
pub mod cache_config;
pub mod loader;

pub use args::{CliArgs, Command};
pub use cache_config::{CacheConfig, LogLevel};
pub use loader::{ConfigError, ConfigLoader};
