use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pawcache::domain::entities::TransformOverrides;
use pawcache::infrastructure::{
    CacheConfig, CacheManager, CachePorts, CliArgs, Command, ConfigLoader, StaticNetworkProbe,
};

fn init_logging(config: &CacheConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<CacheConfig> {
    let loader = ConfigLoader::new()?;
    let mut config = loader.load(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

async fn run(manager: &CacheManager, probe: &StaticNetworkProbe, command: Command) -> Result<()> {
    match command {
        Command::Ensure { uri } => {
            println!("{}", manager.ensure_cached(&uri).await);
        }
        Command::Optimize {
            uri,
            width,
            height,
            quality,
            format,
        } => {
            let overrides = TransformOverrides {
                width,
                height,
                quality,
                format,
            };
            println!("{}", manager.optimize(&uri, &overrides).await);
        }
        Command::Ladder { uri, network } => {
            if let Some(class) = network {
                probe.set(class);
            }
            let ladder = manager.ladder(&uri).await;
            println!("low:      {}", ladder.low_quality);
            println!("medium:   {}", ladder.medium_quality);
            println!("high:     {}", ladder.high_quality);
            println!("original: {}", ladder.original);
        }
        Command::Sweep => {
            println!("{}", manager.sweep().await);
        }
        Command::Stats => {
            println!("{}", manager.stats().await);
        }
        Command::Clear => {
            let removed = manager.clear().await?;
            println!("Removed {removed} cached images");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = pawcache::VERSION, "Starting pawcache");

    let probe = Arc::new(StaticNetworkProbe::new(config.network_class));
    let ports = CachePorts::standard(config.request_timeout(), probe.clone())?;
    let manager = CacheManager::init(config.manager_config(), ports).await?;

    let result = run(&manager, &probe, args.command).await;

    manager.close().await;

    result
}
