//! Listing Sniper
//!
//! Entry point: watches the pump-swap AMM for new SOL-quoted pools and runs
//! one buy per genuine listing.
//!
//! ## Pipeline
//!
//! - **Detection**: `programSubscribe` with size / discriminator / quote-mint
//!   filters, reconciliation on every (re)connect
//! - **Dedup + filter**: at-most-once per pool account, quick pools skipped
//! - **Execution**: quote, build, simulate with bounded slippage retry, sign,
//!   submit once, poll for finality
//! - **Metrics**: Prometheus text endpoint

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listing_sniper::buy_engine::{BuyEngine, TradeExecutor};
use listing_sniper::config::{load_config, Config};
use listing_sniper::confirmation::ConfirmationPoller;
use listing_sniper::endpoints;
use listing_sniper::pool_info::HttpPoolInfoApi;
use listing_sniper::price_tracker::{HttpPriceSource, PriceTracker};
use listing_sniper::rpc::SolanaRpc;
use listing_sniper::sniffer::{DedupTracker, ListingHandler, SubscriptionClient};
use listing_sniper::streaming::WebSocketSource;
use listing_sniper::trade_log::TradeLog;
use listing_sniper::tx_builder::{JupiterSwapApi, SlippageClassifier};
use listing_sniper::wallet::WalletManager;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Simulate buys without signing or submitting
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    /// Metrics port (overrides config)
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting listing sniper");
    info!(path = %args.config, "Loading configuration");
    let config = load_config(&args.config)?;
    let dry_run = args.dry_run || config.trading.dry_run;
    if dry_run {
        warn!("Dry-run mode: buys are simulated and never submitted");
    }

    let wallet = load_wallet(&config)?;

    let commitment = CommitmentConfig::from_str(&config.rpc.commitment)
        .map_err(|_| anyhow::anyhow!("Invalid rpc.commitment: {}", config.rpc.commitment))?;
    let rpc_client = Arc::new(RpcClient::new_with_timeout_and_commitment(
        config.rpc.http_url.clone(),
        Duration::from_secs(config.rpc.timeout_secs),
        commitment,
    ));
    let rpc = Arc::new(SolanaRpc::new(
        Arc::clone(&rpc_client),
        config.trading.send_max_retries,
    ));
    wallet.log_balance(rpc.as_ref()).await;

    if config.monitoring.enable_metrics {
        let port = args.metrics_port.unwrap_or(config.monitoring.metrics_port);
        info!(port, "Starting metrics server");
        tokio::spawn(async move {
            if let Err(e) = endpoints::endpoint_server(port).await {
                error!(error = %e, "Metrics server error");
            }
        });
    }

    let http_timeout = Duration::from_secs(config.trading.http_timeout_secs);
    let swap = Arc::new(
        JupiterSwapApi::new(config.trading.swap_api_url.clone(), http_timeout)
            .context("Failed to build swap API client")?,
    );
    let quote_mint = config.buy_config(dry_run)?.input_mint;
    let pool_info = Arc::new(
        HttpPoolInfoApi::new(config.pool_info.url.clone(), quote_mint, http_timeout)
            .context("Failed to build pool API client")?,
    );

    let poller = ConfirmationPoller::new(rpc.clone())
        .with_interval(Duration::from_millis(config.trading.confirmation_poll_ms))
        .with_deadline(config.confirmation_deadline());
    let executor = Arc::new(TradeExecutor::new(
        swap,
        rpc.clone(),
        wallet.clone(),
        Arc::new(SlippageClassifier::default()),
        poller,
        config.swap_params(wallet.pubkey()),
        config.buy_config(dry_run)?,
    ));

    let (trade_log, trade_log_writer) = TradeLog::spawn(&config.trade_log.path);
    let (price_tracker, price_writer) = if config.price_tracker.enabled {
        let source = Arc::new(
            HttpPriceSource::new(config.price_tracker.url.clone(), http_timeout)
                .context("Failed to build price client")?,
        );
        let (tracker, writer) = PriceTracker::spawn(
            &config.price_tracker.path,
            source,
            config.price_tracker_config(),
        );
        (Some(tracker), Some(writer))
    } else {
        (None, None)
    };

    let engine = Arc::new(BuyEngine::new(
        executor,
        pool_info,
        config.pool_wait(),
        trade_log,
        price_tracker,
    ));
    let handler = ListingHandler::new(Arc::new(DedupTracker::new()), engine);
    let source = Arc::new(WebSocketSource::new(
        config.sniffer.ws_url.clone(),
        Arc::clone(&rpc_client),
    ));
    let client = SubscriptionClient::new(
        source,
        handler,
        config.sniffer.listing_filters()?,
        config.sniffer.reconnect_delay(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
        }
    });

    info!(
        program = %config.sniffer.program_id,
        ws_url = %config.sniffer.ws_url,
        "Watching for new listings"
    );
    client.run(shutdown_rx).await?;

    // Release the last log handles so both writers drain and exit;
    // in-flight trades and samplers may still hold clones, so do not wait forever.
    drop(client);
    if tokio::time::timeout(Duration::from_secs(5), trade_log_writer)
        .await
        .is_err()
    {
        warn!("Trade log writer still busy at shutdown");
    }
    if let Some(writer) = price_writer {
        if tokio::time::timeout(Duration::from_secs(5), writer)
            .await
            .is_err()
        {
            warn!("Price log writer still busy at shutdown");
        }
    }

    info!("Shut down");
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "listing_sniper=debug,info"
    } else {
        "listing_sniper=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// `PRIVATE_KEY` wins over the keypair file
fn load_wallet(config: &Config) -> Result<WalletManager> {
    match &config.wallet.private_key {
        Some(secret) => {
            info!("Loading wallet from PRIVATE_KEY");
            WalletManager::from_base58(secret).context("Failed to load wallet from PRIVATE_KEY")
        }
        None => {
            info!(path = %config.wallet.keypair_path, "Loading wallet from keypair file");
            WalletManager::from_file(&config.wallet.keypair_path).context("Failed to load wallet")
        }
    }
}
