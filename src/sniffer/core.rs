//! Subscription session loop with reconciliation and fixed-delay reconnect
//!
//! One session is: connect, subscribe (one request), reconcile existing
//! accounts into the known set, then dispatch live notifications in receipt
//! order until the stream closes. Any session end, clean or not, is followed
//! by the reconnect delay and a fresh session. Dedup state lives in the
//! handler and survives every reconnect; in-flight trades are never
//! cancelled by a session ending.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::errors::SnifferError;
use super::handler::ListingHandler;
use crate::metrics::metrics;
use crate::streaming::{ListingFilters, NotificationSource};

/// Lifecycle of the current subscription session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// Counters for one finished session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Accounts newly marked known by reconciliation
    pub seeded: usize,
    /// Live notifications dispatched
    pub notifications: u64,
}

/// Long-lived subscription client
pub struct SubscriptionClient {
    source: Arc<dyn NotificationSource>,
    handler: ListingHandler,
    filters: ListingFilters,
    reconnect_delay: Duration,
    state_tx: watch::Sender<SessionState>,
}

impl SubscriptionClient {
    pub fn new(
        source: Arc<dyn NotificationSource>,
        handler: ListingHandler,
        filters: ListingFilters,
        reconnect_delay: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            source,
            handler,
            filters,
            reconnect_delay,
            state_tx,
        }
    }

    /// Observe session state transitions
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn handler(&self) -> &ListingHandler {
        &self.handler
    }

    /// Run one session until the stream closes
    ///
    /// Reconciliation completes before the first live notification is
    /// dispatched; notifications that arrive meanwhile wait in the channel.
    pub async fn run_session(&self) -> Result<SessionSummary, SnifferError> {
        self.state_tx.send_replace(SessionState::Connecting);
        let mut notifications = self.source.subscribe(&self.filters).await?;
        self.state_tx.send_replace(SessionState::Subscribed);
        info!(program = %self.filters.program_id, "Subscribed to market accounts");

        let existing = self.source.reconcile(&self.filters).await?;
        let total = existing.len();
        let seeded = self.handler.dedup().seed_known(existing);
        metrics()
            .known_accounts
            .set(self.handler.dedup().known_len() as i64);
        info!(existing = total, seeded, "Loaded existing markets");

        let mut summary = SessionSummary {
            seeded,
            notifications: 0,
        };
        while let Some(notification) = notifications.recv().await {
            summary.notifications += 1;
            let outcome = self.handler.dispatch(notification);
            debug!(outcome = outcome.label(), "Notification dispatched");
        }
        Ok(summary)
    }

    /// Run sessions forever, reconnecting after `reconnect_delay`
    ///
    /// Returns when `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), SnifferError> {
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                result = self.run_session() => match result {
                    Ok(summary) => warn!(
                        notifications = summary.notifications,
                        "WebSocket disconnected, reconnecting in {:?}",
                        self.reconnect_delay
                    ),
                    Err(e) => warn!(
                        error = %e,
                        category = e.category(),
                        "Subscription session failed, reconnecting in {:?}",
                        self.reconnect_delay
                    ),
                },
                _ = shutdown.changed() => break,
            }

            self.state_tx.send_replace(SessionState::Disconnected);
            metrics().reconnects.inc();

            tokio::select! {
                _ = sleep(self.reconnect_delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.state_tx.send_replace(SessionState::Disconnected);
        info!("Subscription client stopped");
        Ok(())
    }
}
