//! Post-buy price sampling
//!
//! Each tracked token gets a sampler task that fetches the token price once
//! per interval. Samples flow over a channel to a single writer task that
//! owns `token-price-log.json` and flushes the whole log every
//! `flush_every` samples of a token, and when a sampler finishes.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("Price request failed: {0}")]
    Request(String),
    #[error("Unexpected price response: {0}")]
    InvalidResponse(String),
}

/// One price observation, `timestamp_sec` counted from token creation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub timestamp_sec: i64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPriceLog {
    /// RFC 3339
    pub created_at: String,
    pub history: Vec<PricePoint>,
}

pub type PriceLog = BTreeMap<String, TokenPriceLog>;

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price(&self, mint: &Pubkey) -> Result<f64, PriceError>;
}

/// `GET <base_url><mint>/price`, answering a bare number or `{"price": n}`
pub struct HttpPriceSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPriceSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PriceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        Value::Object(map) => map.get("price").and_then(parse_price),
        _ => None,
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn price(&self, mint: &Pubkey) -> Result<f64, PriceError> {
        let response = self
            .http
            .get(format!("{}{}/price", self.base_url, mint))
            .send()
            .await
            .map_err(|e| PriceError::Request(e.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| PriceError::Request(e.to_string()))?;
        parse_price(&body).ok_or_else(|| PriceError::InvalidResponse(body.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct PriceTrackerConfig {
    pub sample_interval: Duration,
    pub flush_every: usize,
    pub max_samples: usize,
}

impl Default for PriceTrackerConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(1),
            flush_every: 10,
            max_samples: 600,
        }
    }
}

#[derive(Debug)]
enum PriceEvent {
    Started { token: String, created_at: String },
    Sample { token: String, point: PricePoint },
    Finished { token: String },
}

/// Cloneable handle; `track` starts a sampler for one token
#[derive(Clone)]
pub struct PriceTracker {
    source: Arc<dyn PriceSource>,
    config: PriceTrackerConfig,
    tx: mpsc::UnboundedSender<PriceEvent>,
}

impl PriceTracker {
    /// Start the writer task for `path`
    pub fn spawn(
        path: impl Into<PathBuf>,
        source: Arc<dyn PriceSource>,
        config: PriceTrackerConfig,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let flush_every = config.flush_every.max(1);
        let writer = tokio::spawn(run_writer(path.into(), rx, flush_every));
        (Self { source, config, tx }, writer)
    }

    /// Sample `mint` every interval until `max_samples` are taken
    pub fn track(&self, mint: Pubkey, created_at: DateTime<Utc>) -> JoinHandle<()> {
        let token = mint.to_string();
        let _ = self.tx.send(PriceEvent::Started {
            token: token.clone(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        });

        let source = Arc::clone(&self.source);
        let config = self.config.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            info!(%mint, "Price tracking started");
            let mut ticker = interval(config.sample_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut taken = 0;
            while taken < config.max_samples {
                ticker.tick().await;
                match source.price(&mint).await {
                    Ok(price) => {
                        let elapsed = (Utc::now() - created_at).num_seconds();
                        let point = PricePoint {
                            timestamp_sec: elapsed,
                            price,
                        };
                        if tx.send(PriceEvent::Sample { token: token.clone(), point }).is_err() {
                            return;
                        }
                    }
                    Err(e) => debug!(%mint, error = %e, "Price sample failed"),
                }
                taken += 1;
            }
            let _ = tx.send(PriceEvent::Finished { token });
            info!(%mint, samples = taken, "Price tracking finished");
        })
    }
}

async fn load_existing(path: &Path) -> PriceLog {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Could not parse price log, starting fresh");
            PriceLog::new()
        }),
        Err(_) => PriceLog::new(),
    }
}

async fn flush(path: &Path, log: &PriceLog) {
    let result = match serde_json::to_string_pretty(log) {
        Ok(json) => tokio::fs::write(path, json).await.map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!(path = %path.display(), error = %e, "Failed to write price log");
    }
}

async fn run_writer(path: PathBuf, mut rx: mpsc::UnboundedReceiver<PriceEvent>, flush_every: usize) {
    let mut log = load_existing(&path).await;

    while let Some(event) = rx.recv().await {
        match event {
            PriceEvent::Started { token, created_at } => {
                log.entry(token).or_insert_with(|| TokenPriceLog {
                    created_at,
                    history: Vec::new(),
                });
            }
            PriceEvent::Sample { token, point } => {
                let Some(entry) = log.get_mut(&token) else {
                    continue;
                };
                entry.history.push(point);
                if entry.history.len() % flush_every == 0 {
                    flush(&path, &log).await;
                }
            }
            PriceEvent::Finished { token } => {
                debug!(%token, "Price sampling finished");
                flush(&path, &log).await;
            }
        }
    }
    flush(&path, &log).await;
}
