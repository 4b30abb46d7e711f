use super::cache_config::LogLevel;
use crate::domain::entities::{ImageFormat, NetworkClass};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "pawcache",
    version,
    about = "Image cache and delivery pipeline for pet photos",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Cache root directory.
    #[arg(long, value_name = "PATH", env = "PAWCACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Network class to assume (wifi, cellular, unknown).
    #[arg(long, value_name = "CLASS")]
    pub network: Option<NetworkClass>,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Cache operations exposed on the command line.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Print the local path an image resolves to.
    Ensure {
        /// Image URI.
        uri: String,
    },
    /// Print the path of a resized or recompressed derivative.
    Optimize {
        /// Image URI.
        uri: String,
        /// Maximum width in pixels.
        #[arg(long)]
        width: Option<u32>,
        /// Maximum height in pixels.
        #[arg(long)]
        height: Option<u32>,
        /// Quality ratio between 0 and 1.
        #[arg(long)]
        quality: Option<f32>,
        /// Output format (jpeg, png).
        #[arg(long)]
        format: Option<ImageFormat>,
    },
    /// Print the quality ladder for an image.
    Ladder {
        /// Image URI.
        uri: String,
        /// Network class to build the ladder for.
        #[arg(long, value_name = "CLASS")]
        network: Option<NetworkClass>,
    },
    /// Run eviction now.
    Sweep,
    /// Print cache statistics.
    Stats,
    /// Remove every cached image.
    Clear,
}
