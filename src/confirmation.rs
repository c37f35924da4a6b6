//! Signature status polling until a target finality
//!
//! The poller is the only place a trade waits on the cluster after
//! broadcast. It never resubmits; a lost transaction shows up as
//! [`ConfirmationError::Timeout`] when a deadline is configured.

use crate::metrics::{metrics, Timer};
use crate::rpc::{ChainRpc, Finality};
use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Default delay between two status queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(800);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationError {
    /// The transaction landed and its execution failed on chain
    #[error("Transaction {signature} failed: {details}")]
    TransactionFailed { signature: String, details: String },

    /// Target finality not reached before the deadline
    #[error("Transaction {signature} not {target} after {elapsed:?}")]
    Timeout {
        signature: String,
        target: Finality,
        elapsed: Duration,
    },
}

pub struct ConfirmationPoller {
    rpc: Arc<dyn ChainRpc>,
    interval: Duration,
    deadline: Option<Duration>,
}

impl ConfirmationPoller {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            rpc,
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Give up after `deadline`; `None` polls until a terminal status
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Poll until `signature` reaches `target` or fails
    ///
    /// A status at or above `target` counts as reached, so a transaction
    /// observed directly as `finalized` satisfies a `confirmed` target. A
    /// failed status query is logged and the next poll proceeds as usual.
    pub async fn await_status(
        &self,
        signature: &Signature,
        target: Finality,
    ) -> Result<Finality, ConfirmationError> {
        let timer = Timer::new();
        let started = Instant::now();

        loop {
            match self.rpc.signature_status(signature).await {
                Ok(Some(state)) => {
                    if let Some(details) = state.err {
                        return Err(ConfirmationError::TransactionFailed {
                            signature: signature.to_string(),
                            details,
                        });
                    }
                    match state.finality {
                        Some(finality) if finality.satisfies(target) => {
                            info!(%signature, %finality, "Transaction reached {}", target);
                            timer.observe_duration(&metrics().confirmation_latency);
                            return Ok(finality);
                        }
                        finality => debug!(%signature, ?finality, "Waiting for {}", target),
                    }
                }
                Ok(None) => debug!(%signature, "Signature not found yet"),
                Err(e) => warn!(%signature, error = %e, "Signature status query failed"),
            }

            if let Some(deadline) = self.deadline {
                let elapsed = started.elapsed();
                if elapsed + self.interval > deadline {
                    return Err(ConfirmationError::Timeout {
                        signature: signature.to_string(),
                        target,
                        elapsed,
                    });
                }
            }
            sleep(self.interval).await;
        }
    }
}
