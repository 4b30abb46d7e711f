//! Cache configuration.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::application::services::EvictionPolicy;
use crate::application::services::eviction_planner::{DEFAULT_MAX_AGE_SECS, DEFAULT_MAX_SIZE_BYTES};
use crate::application::services::quality_policy::DEFAULT_TRANSFORM_HOSTS;
use crate::domain::entities::{ImageFormat, NetworkClass};
use crate::infrastructure::image::{
    CacheManagerConfig, DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS,
};

pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "pawcache";
pub(super) const APP_NAME: &str = "pawcache";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Settings read from `config.toml` and overridden from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Cache root. Defaults to the platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Size budget in bytes.
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Entries older than this are evicted.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Minimum time between opportunistic sweeps.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Host substrings that accept `width`/`quality` query parameters.
    #[serde(default = "default_transform_hosts")]
    pub transform_hosts: Vec<String>,

    /// Network class reported by the static probe.
    #[serde(default)]
    pub network_class: NetworkClass,

    /// Derivative format when none is requested.
    #[serde(default)]
    pub default_format: ImageFormat,

    /// HTTP request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Sweep on startup when a sweep is due.
    #[serde(default = "default_true")]
    pub evict_on_init: bool,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

const fn default_max_size_bytes() -> u64 {
    DEFAULT_MAX_SIZE_BYTES
}

const fn default_max_age_secs() -> u64 {
    DEFAULT_MAX_AGE_SECS
}

const fn default_cleanup_interval_secs() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_SECS
}

fn default_transform_hosts() -> Vec<String> {
    DEFAULT_TRANSFORM_HOSTS
        .iter()
        .map(|h| (*h).to_string())
        .collect()
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_true() -> bool {
    true
}

fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            config: None,
            cache_dir: None,
            max_size_bytes: default_max_size_bytes(),
            max_age_secs: default_max_age_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            transform_hosts: default_transform_hosts(),
            network_class: NetworkClass::default(),
            default_format: ImageFormat::default(),
            request_timeout_secs: default_request_timeout_secs(),
            evict_on_init: true,
            log_level: LogLevel::Info,
            log_path: None,
        }
    }
}

impl CacheConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(network) = args.network {
            self.network_class = network;
        }
    }

    /// Returns default cache root.
    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).map_or_else(
            || std::env::temp_dir().join(APP_NAME).join("images"),
            |dirs| dirs.cache_dir().join("images"),
        )
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("pawcache.log"))
    }

    /// Returns effective cache root.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(Self::default_cache_dir)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Returns the HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_secs)
    }

    /// Builds the cache manager settings.
    #[must_use]
    pub fn manager_config(&self) -> CacheManagerConfig {
        CacheManagerConfig {
            cache_dir: self.effective_cache_dir(),
            eviction: EvictionPolicy {
                max_age: seconds(self.max_age_secs),
                max_size_bytes: self.max_size_bytes,
            },
            cleanup_interval: seconds(self.cleanup_interval_secs),
            evict_on_init: self.evict_on_init,
            transform_hosts: self.transform_hosts.clone(),
            default_format: self.default_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            max_size_bytes = 1048576
            network_class = "cellular"
            default_format = "png"
            transform_hosts = ["cdn.pets.example"]
        "#;

        let config: CacheConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.max_size_bytes, 1_048_576);
        assert_eq!(config.network_class, NetworkClass::Cellular);
        assert_eq!(config.default_format, ImageFormat::Png);
        assert_eq!(config.transform_hosts, vec!["cdn.pets.example".to_string()]);
        assert_eq!(config.max_age_secs, DEFAULT_MAX_AGE_SECS);
        assert!(config.evict_on_init);
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();

        assert_eq!(config.max_size_bytes, 100 * 1024 * 1024);
        assert_eq!(config.max_age_secs, 7 * 24 * 60 * 60);
        assert_eq!(config.cleanup_interval_secs, 24 * 60 * 60);
        assert_eq!(config.network_class, NetworkClass::Unknown);
        assert_eq!(config.request_timeout(), StdDuration::from_secs(30));
        assert_eq!(config.transform_hosts, vec!["supabase.co", "storage."]);
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = CacheConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: CacheConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_args_override_file() {
        let mut config = CacheConfig::default();
        let args = CliArgs::parse_from([
            "pawcache",
            "--cache-dir",
            "/tmp/pets",
            "--network",
            "wifi",
            "--log-level",
            "debug",
            "stats",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.effective_cache_dir(), PathBuf::from("/tmp/pets"));
        assert_eq!(config.network_class, NetworkClass::Wifi);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_manager_config() {
        let config = CacheConfig {
            cache_dir: Some(PathBuf::from("/tmp/pets")),
            max_age_secs: 60,
            cleanup_interval_secs: 30,
            max_size_bytes: 1024,
            evict_on_init: false,
            ..CacheConfig::default()
        };

        let manager = config.manager_config();

        assert_eq!(manager.cache_dir, PathBuf::from("/tmp/pets"));
        assert_eq!(manager.eviction.max_age, Duration::seconds(60));
        assert_eq!(manager.eviction.max_size_bytes, 1024);
        assert_eq!(manager.cleanup_interval, Duration::seconds(30));
        assert!(!manager.evict_on_init);
    }

    #[test]
    fn test_huge_durations_saturate() {
        assert_eq!(seconds(u64::MAX), Duration::MAX);
    }
}
