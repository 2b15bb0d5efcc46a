use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use live_ingest::{
    config::{Config, FileConfigStore},
    ingestor::LiveIngestor,
    services::{LiveChannelCache, LiveSourceService},
    utils::StandardHttpClient,
};

#[derive(Parser)]
#[command(name = "live-ingest")]
#[command(version)]
#[command(about = "Fetch live TV sources and correlate them with their XMLTV guide")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (falls back to $LIVE_INGEST_CONFIG, then config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh one source, or every enabled source, and print channel counts
    Refresh {
        /// Live source key
        key: Option<String>,
    },
    /// Print the channels and guide of one source as JSON
    Show {
        /// Live source key
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("live_ingest={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = Config::resolve_path(cli.config.as_deref());

    info!("Starting live-ingest v{}", env!("CARGO_PKG_VERSION"));
    let store = Arc::new(FileConfigStore::open(&config_path)?);
    let config = store.snapshot().await;
    info!(
        "Configuration loaded from: {} ({} live sources)",
        config_path.display(),
        config.live_sources.len()
    );

    let client = Arc::new(StandardHttpClient::new(&config.ingestion)?);
    let service = LiveSourceService::new(
        LiveIngestor::new(client, config.ingestion.clone()),
        store,
        LiveChannelCache::new(),
    );

    match cli.command {
        Command::Refresh { key: Some(key) } => {
            let count = service.refresh_key(&key).await?;
            if count == 0 {
                bail!("refresh of live source '{key}' produced no channels");
            }
            println!("{key}\t{count}");
        }
        Command::Refresh { key: None } => {
            for (key, count) in service.refresh_all().await? {
                println!("{key}\t{count}");
            }
        }
        Command::Show { key } => {
            let Some(channels) = service.get(&key).await? else {
                bail!("no channels available for live source '{key}'");
            };
            println!("{}", serde_json::to_string_pretty(channels.as_ref())?);
        }
    }

    Ok(())
}
