//! Pool reserve / liquidity lookup for an accepted listing
//!
//! A freshly created pool is often not yet indexed by the pool API, or is
//! indexed with zero liquidity. [`wait_for_liquidity`] polls a bounded
//! number of times and reports exhaustion as an error so the caller can
//! release the listing instead of blocking forever.

use crate::metrics::{metrics, Timer};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolInfoError {
    #[error("Pool API request failed: {0}")]
    Request(String),

    #[error("Pool API returned status {0}")]
    Status(u16),

    #[error("No pool found for token {0}")]
    NotFound(String),

    #[error("Invalid pool API response: {0}")]
    InvalidResponse(String),

    #[error("Pool for {0} has no liquidity yet")]
    NoLiquidity(String),
}

/// Reserves and liquidity of one pool
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    #[serde(deserialize_with = "number_or_string")]
    pub base_reserves: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub quote_reserves: f64,
    pub base_mint_decimals: u8,
    pub quote_mint_decimals: u8,
    #[serde(rename = "liquidityUSD", deserialize_with = "number_or_string")]
    pub liquidity_usd: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl PoolInfo {
    /// Base (token) reserve in whole tokens
    pub fn token_reserve(&self) -> f64 {
        self.base_reserves / 10f64.powi(self.base_mint_decimals as i32)
    }

    /// Quote (SOL) reserve in whole SOL
    pub fn sol_reserve(&self) -> f64 {
        self.quote_reserves / 10f64.powi(self.quote_mint_decimals as i32)
    }

    /// SOL per token; zero when the token side is empty
    pub fn price_in_sol(&self) -> f64 {
        let tokens = self.token_reserve();
        if tokens > 0.0 {
            self.sol_reserve() / tokens
        } else {
            0.0
        }
    }

    /// USD per SOL implied by the pool (liquidity is split evenly by value)
    pub fn usd_per_sol(&self) -> f64 {
        let sol = self.sol_reserve();
        if sol > 0.0 {
            (self.liquidity_usd / 2.0) / sol
        } else {
            0.0
        }
    }

    pub fn price_in_usd(&self) -> f64 {
        self.price_in_sol() * self.usd_per_sol()
    }

    pub fn has_liquidity(&self) -> bool {
        self.liquidity_usd > 0.0
    }
}

#[async_trait]
pub trait PoolInfoApi: Send + Sync {
    async fn pool_info(&self, mint: &Pubkey) -> Result<PoolInfo, PoolInfoError>;
}

/// HTTP pool API (`/v1/pools/pair?mintA=..&mintB=..`)
pub struct HttpPoolInfoApi {
    http: reqwest::Client,
    base_url: String,
    quote_mint: Pubkey,
}

impl HttpPoolInfoApi {
    pub fn new(
        base_url: impl Into<String>,
        quote_mint: Pubkey,
        timeout: Duration,
    ) -> Result<Self, PoolInfoError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoolInfoError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            quote_mint,
        })
    }
}

#[async_trait]
impl PoolInfoApi for HttpPoolInfoApi {
    async fn pool_info(&self, mint: &Pubkey) -> Result<PoolInfo, PoolInfoError> {
        let timer = Timer::new();
        let response = self
            .http
            .get(format!("{}/v1/pools/pair", self.base_url))
            .query(&[
                ("mintA", mint.to_string()),
                ("mintB", self.quote_mint.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PoolInfoError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PoolInfoError::Status(response.status().as_u16()));
        }
        let pools: Vec<PoolInfo> = response
            .json()
            .await
            .map_err(|e| PoolInfoError::InvalidResponse(e.to_string()))?;
        timer.observe_duration(&metrics().http_latency);

        pools
            .into_iter()
            .next()
            .ok_or_else(|| PoolInfoError::NotFound(mint.to_string()))
    }
}

/// Poll until the pool reports non-zero liquidity, at most `max_attempts` times
///
/// Every failure (transport, missing pool, zero liquidity) is retried after
/// `delay`; the last error is returned on exhaustion.
pub async fn wait_for_liquidity(
    api: Arc<dyn PoolInfoApi>,
    mint: Pubkey,
    max_attempts: usize,
    delay: Duration,
) -> Result<PoolInfo, PoolInfoError> {
    let strategy = FixedInterval::new(delay).take(max_attempts.saturating_sub(1));
    Retry::start(strategy, || {
        let api = Arc::clone(&api);
        async move {
            let info = api.pool_info(&mint).await?;
            if info.has_liquidity() {
                Ok(info)
            } else {
                debug!(%mint, "Pool has no liquidity yet");
                Err(PoolInfoError::NoLiquidity(mint.to_string()))
            }
        }
    })
    .await
}
