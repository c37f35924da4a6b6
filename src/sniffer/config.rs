//! Configuration module for Sniffer with TOML and environment variable support

use super::decoder::{MARKET_ACCOUNT_LEN, MARKET_DISCRIMINATOR, QUOTE_MINT_OFFSET};
use crate::streaming::ListingFilters;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

/// pump-swap AMM program
pub const PUMP_AMM_PROGRAM_ID: &str = "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA";

/// Wrapped SOL mint, the quote side of every traded pool
pub const QUOTE_MINT_SOL: &str = "So11111111111111111111111111111111111111112";

/// Current on-chain size of a pool account (base layout plus coin creator)
pub const DEFAULT_ACCOUNT_DATA_SIZE: u64 = 243;

/// Sniffer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnifferConfig {
    /// WebSocket endpoint for `programSubscribe`
    pub ws_url: String,

    /// Program that owns the pool accounts
    pub program_id: String,

    /// Quote mint the pool must be paired with (memcmp at offset 75)
    pub quote_mint: String,

    /// Exact `dataSize` filter, used for both subscription and reconciliation
    pub account_data_size: u64,

    /// Commitment for subscription and reconciliation
    pub commitment: String,

    /// Delay between a closed connection and the next attempt (milliseconds)
    pub reconnect_delay_ms: u64,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://api.mainnet-beta.solana.com".to_string(),
            program_id: PUMP_AMM_PROGRAM_ID.to_string(),
            quote_mint: QUOTE_MINT_SOL.to_string(),
            account_data_size: DEFAULT_ACCOUNT_DATA_SIZE,
            commitment: "confirmed".to_string(),
            reconnect_delay_ms: 5000,
        }
    }
}

impl SnifferConfig {
    /// Load configuration from environment variables
    /// Environment variables override TOML values
    pub fn from_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("SOLANA_WS_URL") {
            self.ws_url = url;
        }

        if let Ok(size) = std::env::var("SNIFFER_ACCOUNT_DATA_SIZE") {
            self.account_data_size = size
                .parse()
                .map_err(|e| anyhow!("Invalid SNIFFER_ACCOUNT_DATA_SIZE: {}", e))?;
        }

        if let Ok(delay) = std::env::var("SNIFFER_RECONNECT_DELAY_MS") {
            self.reconnect_delay_ms = delay
                .parse()
                .map_err(|e| anyhow!("Invalid SNIFFER_RECONNECT_DELAY_MS: {}", e))?;
        }

        self.validate()?;
        Ok(())
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(anyhow!("ws_url must be a ws:// or wss:// URL"));
        }
        Pubkey::from_str(&self.program_id).map_err(|e| anyhow!("Invalid program_id: {}", e))?;
        Pubkey::from_str(&self.quote_mint).map_err(|e| anyhow!("Invalid quote_mint: {}", e))?;
        if (self.account_data_size as usize) < MARKET_ACCOUNT_LEN {
            return Err(anyhow!(
                "account_data_size must be >= {} (market layout length)",
                MARKET_ACCOUNT_LEN
            ));
        }
        CommitmentConfig::from_str(&self.commitment)
            .map_err(|_| anyhow!("Invalid commitment: {}", self.commitment))?;
        if self.reconnect_delay_ms == 0 {
            return Err(anyhow!("reconnect_delay_ms must be > 0"));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Server-side filters shared by subscription and reconciliation
    pub fn listing_filters(&self) -> Result<ListingFilters> {
        Ok(ListingFilters {
            program_id: Pubkey::from_str(&self.program_id)
                .map_err(|e| anyhow!("Invalid program_id: {}", e))?,
            data_size: self.account_data_size,
            discriminator: MARKET_DISCRIMINATOR,
            quote_mint: Pubkey::from_str(&self.quote_mint)
                .map_err(|e| anyhow!("Invalid quote_mint: {}", e))?,
            quote_mint_offset: QUOTE_MINT_OFFSET,
            commitment: CommitmentConfig::from_str(&self.commitment)
                .map_err(|_| anyhow!("Invalid commitment: {}", self.commitment))?,
        })
    }
}
