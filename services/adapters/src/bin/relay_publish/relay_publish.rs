//! # Relay Publish - one-shot pricing relay client
//!
//! Connects to the pricing relay, sends a single request and keeps the
//! connection open until Ctrl+C, logging whatever the relay sends back.
//!
//! ```text
//! relay_publish --url ws://localhost:8910/ --price 169920000 --conf 730000
//! relay_publish --config config/bridge.toml --subscribe
//! relay_publish --product-list
//! ```

use anyhow::{Context, Result};
use bridge_config::{BridgeConfig, RelaySettings};
use clap::{Parser, ValueEnum};
use fix_bridge::{PricePublisher, RelayClient, RequestIds};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use types::{PriceUpdate, TradingStatus};

const DEFAULT_ACCOUNT: &str = "33ugpDWbC2mLrYSQvu1BHfykR8bt3MVc4S3YuuXMVRH3";

#[derive(Parser, Debug)]
#[clap(name = "relay_publish")]
struct Args {
    /// Bridge configuration file; its [relay] section is used
    #[clap(long)]
    config: Option<PathBuf>,

    /// Environment overlay applied on top of --config
    #[clap(long)]
    env: Option<String>,

    /// Relay endpoint, overrides the configured one
    #[clap(long)]
    url: Option<String>,

    /// Price account
    #[clap(long, default_value = DEFAULT_ACCOUNT)]
    account: String,

    /// Scaled integer price
    #[clap(long, default_value = "169920000")]
    price: u64,

    /// Scaled integer confidence
    #[clap(long, default_value = "730000")]
    conf: u32,

    #[clap(long, value_enum, default_value = "trading")]
    status: Status,

    /// Send subscribe_price for --account instead of update_price
    #[clap(long, conflicts_with = "product_list")]
    subscribe: bool,

    /// Send get_product_list instead of update_price
    #[clap(long)]
    product_list: bool,

    /// Default log filter when RUST_LOG is unset
    #[clap(long)]
    log_level: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Status {
    Trading,
    Halted,
    Unknown,
}

impl From<Status> for TradingStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Trading => TradingStatus::Trading,
            Status::Halted => TradingStatus::Halted,
            Status::Unknown => TradingStatus::Unknown,
        }
    }
}

fn relay_settings(args: &Args) -> Result<(RelaySettings, String)> {
    let (mut settings, log_level) = match &args.config {
        Some(path) => {
            let config = BridgeConfig::load(Some(path), args.env.as_deref())
                .with_context(|| format!("Failed to load {}", path.display()))?;
            (config.relay, config.log_level)
        }
        None => (RelaySettings::default(), "info".to_string()),
    };
    if let Some(url) = &args.url {
        settings.url = url.clone();
    }
    Ok((settings, log_level))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (settings, configured_level) = relay_settings(&args)?;

    let level = args.log_level.clone().unwrap_or(configured_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    info!("🚀 Starting relay publish");
    info!("   Relay: {}", settings.url);

    let client = RelayClient::new(settings, Arc::new(RequestIds::new()))
        .context("Failed to create relay client")?;
    client.start().context("Failed to start relay client")?;

    if args.product_list {
        let id = client.get_product_list()?;
        info!("📨 Queued get_product_list (id {})", id);
    } else if args.subscribe {
        let id = client.subscribe_price(&args.account)?;
        info!("📨 Queued subscribe_price for {} (id {})", args.account, id);
    } else {
        // the account doubles as instrument; it is published unmapped
        let update = PriceUpdate::new(
            args.account.clone(),
            args.price,
            args.conf,
            args.status.into(),
        );
        client.publish(update)?;
        info!(
            "📨 Queued update_price for {}: price={} conf={} status={}",
            args.account,
            args.price,
            args.conf,
            TradingStatus::from(args.status)
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("📡 Received Ctrl+C, closing relay connection...");

    client.close().await?;
    info!("📊 Final stats: {:?}", client.stats());
    Ok(())
}
