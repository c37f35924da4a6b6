//! Append-only JSON log of accepted listings
//!
//! The file holds one JSON array. It is owned by a single writer task; every
//! other component reaches it through a [`TradeLog`] handle, a one-way
//! channel, so concurrent listings never interleave read-modify-write
//! cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// One accepted listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// `Mon DD, YYYY HH:MM:SS +UTC`
    pub time: String,
    /// Base mint of the listing
    pub token: String,
    /// USD liquidity with a K/M suffix
    pub liquidity: String,
}

impl TradeRecord {
    pub fn new(at: DateTime<Utc>, token: impl Into<String>, liquidity_usd: f64) -> Self {
        Self {
            time: format_utc_time(at),
            token: token.into(),
            liquidity: format_number_km(liquidity_usd),
        }
    }
}

pub fn format_utc_time(at: DateTime<Utc>) -> String {
    at.format("%b %d, %Y %H:%M:%S +UTC").to_string()
}

/// `1234567.0` -> `1.2 M`, `12345.0` -> `12.3 K`, `999.0` -> `999.0`
pub fn format_number_km(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1} M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1} K", value / 1_000.0)
    } else {
        format!("{:.1}", value)
    }
}

/// Cloneable handle to the trade-log writer
#[derive(Debug, Clone)]
pub struct TradeLog {
    tx: mpsc::UnboundedSender<TradeRecord>,
}

impl TradeLog {
    /// Start the writer task for `path`
    ///
    /// The task exits after every handle is dropped and the queue drained.
    pub fn spawn(path: impl Into<PathBuf>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(path.into(), rx));
        (Self { tx }, handle)
    }

    /// Queue a record; never blocks
    pub fn record(&self, record: TradeRecord) {
        if self.tx.send(record).is_err() {
            warn!("Trade log writer is gone, dropping record");
        }
    }
}

async fn load_existing(path: &Path) -> Vec<TradeRecord> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Trade log is not a JSON array, starting fresh");
                Vec::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read trade log");
            Vec::new()
        }
    }
}

async fn persist(path: &Path, records: &[TradeRecord]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

async fn run_writer(path: PathBuf, mut rx: mpsc::UnboundedReceiver<TradeRecord>) {
    let mut records = load_existing(&path).await;
    if let Err(e) = persist(&path, &records).await {
        error!(path = %path.display(), error = %e, "Failed to initialize trade log");
    }

    while let Some(record) = rx.recv().await {
        debug!(token = %record.token, "Appending trade record");
        records.push(record);
        if let Err(e) = persist(&path, &records).await {
            error!(path = %path.display(), error = %e, "Failed to write trade log");
        }
    }
}
