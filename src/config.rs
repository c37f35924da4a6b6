//! Configuration module for the listing sniper
//!
//! This module handles all configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use crate::buy_engine::{BuyConfig, PoolWait};
use crate::price_tracker::PriceTrackerConfig;
use crate::rpc::Finality;
use crate::sniffer::config::QUOTE_MINT_SOL;
use crate::sniffer::SnifferConfig;
use crate::tx_builder::{PriorityLevel, SwapParams};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP RPC endpoint
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Listing detection
    #[serde(default)]
    pub sniffer: SnifferConfig,

    /// Buy execution
    #[serde(default)]
    pub trading: TradingConfig,

    #[serde(default)]
    pub pool_info: PoolInfoConfig,

    #[serde(default)]
    pub trade_log: TradeLogConfig,

    #[serde(default)]
    pub price_tracker: PriceTrackerSettings,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub http_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment used for balance lookups
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,

    /// Base58 secret; only ever set from `PRIVATE_KEY`
    #[serde(skip)]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Spend per listing in lamports
    #[serde(default = "default_buy_amount")]
    pub buy_amount_lamports: u64,

    /// Slippage tolerance passed to the quote (basis points)
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,

    /// Priority-fee cap for the swap build
    #[serde(default = "default_max_priority_fee")]
    pub max_priority_fee_lamports: u64,

    #[serde(default = "default_priority_level")]
    pub priority_level: PriorityLevel,

    #[serde(default = "default_true")]
    pub dynamic_compute_unit_limit: bool,

    /// Slippage-class simulation failures tolerated per trade
    #[serde(default = "default_max_slippage_retries")]
    pub max_slippage_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// `maxRetries` handed to the RPC node on send
    #[serde(default = "default_send_max_retries")]
    pub send_max_retries: usize,

    /// Finality a submitted buy must reach
    #[serde(default = "default_target_finality")]
    pub target_finality: Finality,

    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,

    /// Give up polling after this long; unset polls until resolved
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,

    #[serde(default = "default_swap_api_url")]
    pub swap_api_url: String,

    /// HTTP timeout for quote/build requests (seconds)
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Simulate only; never sign or submit
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolInfoConfig {
    #[serde(default = "default_pool_info_url")]
    pub url: String,

    #[serde(default = "default_pool_info_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogConfig {
    #[serde(default = "default_trade_log_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTrackerSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Prefix; the request is `<url><mint>/price`
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_price_log_path")]
    pub path: String,

    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_keypair_path() -> String { "keypair.json".to_string() }
fn default_buy_amount() -> u64 { 10_000_000 }
fn default_slippage_bps() -> u16 { 3000 }
fn default_max_priority_fee() -> u64 { 900_000 }
fn default_priority_level() -> PriorityLevel { PriorityLevel::High }
fn default_max_slippage_retries() -> u32 { crate::buy_engine::MAX_SLIPPAGE_RETRIES }
fn default_retry_delay_ms() -> u64 { 800 }
fn default_send_max_retries() -> usize { 2 }
fn default_target_finality() -> Finality { Finality::Finalized }
fn default_confirmation_poll_ms() -> u64 { 800 }
fn default_swap_api_url() -> String { "https://lite-api.jup.ag".to_string() }
fn default_http_timeout() -> u64 { 10 }
fn default_pool_info_url() -> String { "https://swap-api.pump.fun".to_string() }
fn default_pool_info_attempts() -> usize { 30 }
fn default_trade_log_path() -> String { "tokens-log.json".to_string() }
fn default_price_log_path() -> String { "token-price-log.json".to_string() }
fn default_max_samples() -> usize { 600 }
fn default_flush_every() -> usize { 10 }
fn default_metrics_port() -> u16 { 9090 }
fn default_true() -> bool { true }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            http_url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
            private_key: None,
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            buy_amount_lamports: default_buy_amount(),
            slippage_bps: default_slippage_bps(),
            max_priority_fee_lamports: default_max_priority_fee(),
            priority_level: default_priority_level(),
            dynamic_compute_unit_limit: default_true(),
            max_slippage_retries: default_max_slippage_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            send_max_retries: default_send_max_retries(),
            target_finality: default_target_finality(),
            confirmation_poll_ms: default_confirmation_poll_ms(),
            confirmation_timeout_secs: None,
            swap_api_url: default_swap_api_url(),
            http_timeout_secs: default_http_timeout(),
            dry_run: false,
        }
    }
}

impl Default for PoolInfoConfig {
    fn default() -> Self {
        Self {
            url: default_pool_info_url(),
            max_attempts: default_pool_info_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for TradeLogConfig {
    fn default() -> Self {
        Self {
            path: default_trade_log_path(),
        }
    }
}

impl Default for PriceTrackerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            path: default_price_log_path(),
            max_samples: default_max_samples(),
            flush_every: default_flush_every(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment overrides (after `.env` has been loaded)
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("SOLANA_RPC_URL") {
            self.rpc.http_url = url;
        }
        if let Ok(path) = std::env::var("SNIPER_KEYPAIR_PATH") {
            self.wallet.keypair_path = path;
        }
        if let Ok(secret) = std::env::var("PRIVATE_KEY") {
            if !secret.trim().is_empty() {
                self.wallet.private_key = Some(secret);
            }
        }
        if let Ok(url) = std::env::var("TOKEN_PRICE_URL") {
            self.price_tracker.url = url;
        }
        // SOLANA_WS_URL and the sniffer tunables
        self.sniffer.from_env()?;
        Ok(())
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.rpc.http_url.starts_with("http://") || self.rpc.http_url.starts_with("https://")) {
            return Err(anyhow!("rpc.http_url must be an http(s) URL"));
        }
        self.sniffer.validate()?;
        self.buy_config(false)?.validate()?;

        let trading = &self.trading;
        if trading.slippage_bps == 0 || trading.slippage_bps > 10_000 {
            return Err(anyhow!("trading.slippage_bps must be in 1..=10000"));
        }
        if trading.confirmation_poll_ms == 0 {
            return Err(anyhow!("trading.confirmation_poll_ms must be > 0"));
        }
        if self.pool_info.max_attempts == 0 {
            return Err(anyhow!("pool_info.max_attempts must be > 0"));
        }
        if self.price_tracker.enabled && self.price_tracker.url.is_empty() {
            return Err(anyhow!(
                "price_tracker.url (or TOKEN_PRICE_URL) is required when tracking is enabled"
            ));
        }
        Ok(())
    }

    pub fn buy_config(&self, force_dry_run: bool) -> Result<BuyConfig> {
        let input_mint = Pubkey::from_str(&self.sniffer.quote_mint)
            .or_else(|_| Pubkey::from_str(QUOTE_MINT_SOL))
            .map_err(|e| anyhow!("Invalid quote mint: {}", e))?;
        Ok(BuyConfig {
            input_mint,
            buy_amount: self.trading.buy_amount_lamports,
            max_slippage_retries: self.trading.max_slippage_retries,
            retry_delay: Duration::from_millis(self.trading.retry_delay_ms),
            target_finality: self.trading.target_finality,
            dry_run: force_dry_run || self.trading.dry_run,
        })
    }

    pub fn swap_params(&self, user: Pubkey) -> SwapParams {
        SwapParams {
            user_public_key: user,
            slippage_bps: self.trading.slippage_bps,
            max_priority_fee_lamports: self.trading.max_priority_fee_lamports,
            priority_level: self.trading.priority_level,
            dynamic_compute_unit_limit: self.trading.dynamic_compute_unit_limit,
        }
    }

    pub fn pool_wait(&self) -> PoolWait {
        PoolWait {
            max_attempts: self.pool_info.max_attempts,
            delay: Duration::from_millis(self.pool_info.retry_delay_ms),
        }
    }

    pub fn price_tracker_config(&self) -> PriceTrackerConfig {
        PriceTrackerConfig {
            max_samples: self.price_tracker.max_samples,
            flush_every: self.price_tracker.flush_every,
            ..PriceTrackerConfig::default()
        }
    }

    pub fn confirmation_deadline(&self) -> Option<Duration> {
        self.trading.confirmation_timeout_secs.map(Duration::from_secs)
    }
}

/// Load configuration from file with fallback to defaults, then env overrides
pub fn load_config(path: &str) -> Result<Config> {
    dotenvy::dotenv().ok();
    let mut config = if Path::new(path).exists() {
        Config::from_file(path).with_context(|| format!("Failed to load config from {}", path))?
    } else {
        tracing::warn!(path, "Config file not found, using defaults");
        Config::default()
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trading.max_slippage_retries, 10);
        assert_eq!(config.trading.retry_delay_ms, 800);
        assert_eq!(config.trading.target_finality, Finality::Finalized);
        assert_eq!(config.sniffer.account_data_size, 243);
        assert!(config.trading.confirmation_timeout_secs.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[rpc]
http_url = "http://localhost:8899"

[trading]
buy_amount_lamports = 5000000
priority_level = "veryHigh"
target_finality = "confirmed"
confirmation_timeout_secs = 60

[sniffer]
ws_url = "ws://localhost:8900"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.rpc.http_url, "http://localhost:8899");
        assert_eq!(config.trading.buy_amount_lamports, 5_000_000);
        assert_eq!(config.trading.priority_level, PriorityLevel::VeryHigh);
        assert_eq!(config.trading.slippage_bps, 3000);
        assert_eq!(config.confirmation_deadline(), Some(Duration::from_secs(60)));
        assert_eq!(config.sniffer.ws_url, "ws://localhost:8900");
        assert_eq!(config.pool_info.max_attempts, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.trading.buy_amount_lamports = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.price_tracker.enabled = true;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc.http_url = "localhost".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dry_run_flag_forces_buy_config() {
        let config = Config::default();
        assert!(!config.buy_config(false).unwrap().dry_run);
        assert!(config.buy_config(true).unwrap().dry_run);
    }
}
