use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use feedroom::config::Config;
use feedroom::feed::{self, Fetcher};
use feedroom::publish::{LogPublisher, Publisher, WebhookPublisher};
use feedroom::storage::Database;
use feedroom::tracker::{Tracker, TrackerConfig};

/// Feed polling service: watches RSS/Atom feeds and publishes new entries
/// to their configured destination channels.
#[derive(Parser, Debug)]
#[command(name = "feedroom", version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "feedroom.toml")]
    config: PathBuf,

    /// Override the database path from the config file
    #[arg(long)]
    db: Option<String>,

    /// Register a new feed before starting the poll tasks
    #[arg(long, value_name = "URL", requires = "target")]
    add_feed: Option<String>,

    /// Destination channel for --add-feed
    #[arg(long, value_name = "TARGET")]
    target: Option<String>,

    /// Owner recorded for --add-feed
    #[arg(long, value_name = "OWNER")]
    owner: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedroom=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config).context("Failed to load configuration")?;
    if let Some(db) = args.db {
        config.database_path = db;
    }

    let db = Database::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;
    let fetcher = Fetcher::new(Duration::from_secs(config.fetch_timeout_secs))
        .context("Failed to build HTTP client")?;

    let register = match (args.add_feed, args.target) {
        (Some(raw_url), Some(target)) => {
            Some((feed::normalize_feed_url(&raw_url)?, target, args.owner))
        }
        _ => None,
    };

    let tracker_config = TrackerConfig {
        interval: Duration::from_secs(config.update_interval_secs),
        on_unexpected: config.on_unexpected,
    };

    match config.webhook_url {
        Some(endpoint) => {
            let publisher = WebhookPublisher::new(reqwest::Client::new(), endpoint);
            run(db, fetcher, publisher, tracker_config, register).await
        }
        None => {
            tracing::warn!("No webhook_url configured, new entries will only be logged");
            run(db, fetcher, LogPublisher, tracker_config, register).await
        }
    }
}

async fn run<P>(
    db: Database,
    fetcher: Fetcher,
    publisher: P,
    config: TrackerConfig,
    register: Option<(String, String, Option<String>)>,
) -> anyhow::Result<()>
where
    P: Publisher + Clone + Send + Sync + 'static,
{
    let tracker = Tracker::new(db, fetcher, publisher, config);

    if let Some((url, target, owner)) = register {
        // Fetch and parse once up front so a dead URL is rejected at
        // registration instead of failing silently forever.
        let parsed = tracker
            .register_feed(&url, &target, owner.as_deref())
            .await
            .with_context(|| format!("Feed registration failed for {url}"))?;
        tracing::info!(url = %url, title = %parsed.title, target = %target, "Feed registered");
    }

    let handles = tracker.spawn_all().await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}
