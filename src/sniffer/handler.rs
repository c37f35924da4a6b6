//! Per-notification handling: dedup gate, decode, filter, launch
//!
//! Every admitted identity ends with exactly one of `commit_known` or
//! `release`. Malformed payloads and quick pools commit synchronously;
//! accepted listings hand their [`Admission`] to a spawned task that
//! resolves it with whatever the launcher reports.

use super::decoder::{self, MarketRecord};
use super::dedup::{Admission, DedupTracker, Resolution};
use super::errors::PayloadError;
use super::filter::{self, FilterVerdict};
use crate::metrics::metrics;
use crate::streaming::AccountNotification;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A decoded market that passed the listing filter
#[derive(Debug, Clone)]
pub struct AcceptedListing {
    pub account: Pubkey,
    pub record: MarketRecord,
    pub slot: u64,
}

/// Downstream consumer of accepted listings
///
/// The returned [`Resolution`] decides the identity's dedup fate:
/// `Committed` for any trade outcome, `Released` when the listing never
/// reached trading and a later notification may try again.
#[async_trait]
pub trait ListingLauncher: Send + Sync {
    async fn launch(&self, listing: AcceptedListing) -> Resolution;
}

/// What the handler did with one notification
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Identity already known or in flight
    Duplicate,
    /// Payload failed to decode; identity committed
    Malformed(PayloadError),
    /// Creator is a wallet; identity committed
    QuickPool,
    /// Listing handed to the launcher
    Launched(JoinHandle<Resolution>),
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Malformed(_) => "malformed",
            Self::QuickPool => "quick_pool",
            Self::Launched(_) => "launched",
        }
    }
}

/// Notification handler shared by every subscription session
pub struct ListingHandler {
    dedup: Arc<DedupTracker>,
    launcher: Arc<dyn ListingLauncher>,
    curve_check: fn(&Pubkey) -> bool,
}

impl ListingHandler {
    pub fn new(dedup: Arc<DedupTracker>, launcher: Arc<dyn ListingLauncher>) -> Self {
        Self {
            dedup,
            launcher,
            curve_check: filter::is_on_curve,
        }
    }

    /// Replace the ed25519 curve check (tests use synthetic creators)
    pub fn with_curve_check(mut self, curve_check: fn(&Pubkey) -> bool) -> Self {
        self.curve_check = curve_check;
        self
    }

    pub fn dedup(&self) -> &Arc<DedupTracker> {
        &self.dedup
    }

    /// Handle one notification
    ///
    /// Admission happens synchronously, so calling this in receipt order
    /// gives receipt-order admission. Only the launch runs concurrently.
    pub fn dispatch(&self, notification: AccountNotification) -> DispatchOutcome {
        metrics().notifications_received.inc();

        let Some(admission) = self.dedup.admit(notification.account) else {
            debug!(account = %notification.account, "Skipping known or in-flight account");
            metrics().duplicates_skipped.inc();
            return DispatchOutcome::Duplicate;
        };

        let outcome = match decode_payload(&notification.payload) {
            Err(e) => {
                warn!(account = %notification.account, error = %e, "Malformed market account");
                metrics().malformed_accounts.inc();
                admission.commit();
                DispatchOutcome::Malformed(e)
            }
            Ok(record) => match filter::evaluate(&record, self.curve_check) {
                FilterVerdict::QuickPool => {
                    debug!(
                        account = %notification.account,
                        creator = %record.creator,
                        "Quick pool, skipping"
                    );
                    metrics().quick_pools_rejected.inc();
                    admission.commit();
                    DispatchOutcome::QuickPool
                }
                FilterVerdict::Accepted => {
                    info!(
                        account = %notification.account,
                        mint = %record.base_mint,
                        slot = notification.slot,
                        "Listing accepted"
                    );
                    metrics().listings_accepted.inc();
                    let listing = AcceptedListing {
                        account: notification.account,
                        record,
                        slot: notification.slot,
                    };
                    DispatchOutcome::Launched(self.spawn_launch(admission, listing))
                }
            },
        };

        self.update_gauges();
        outcome
    }

    fn spawn_launch(&self, admission: Admission, listing: AcceptedListing) -> JoinHandle<Resolution> {
        let launcher = Arc::clone(&self.launcher);
        let dedup = Arc::clone(&self.dedup);
        tokio::spawn(async move {
            // A panic inside `launch` drops the admission, which releases it.
            let resolution = launcher.launch(listing).await;
            if resolution == Resolution::Released {
                metrics().listings_released.inc();
            }
            admission.resolve(resolution);
            metrics().known_accounts.set(dedup.known_len() as i64);
            metrics().in_flight_accounts.set(dedup.in_flight_len() as i64);
            resolution
        })
    }

    fn update_gauges(&self) {
        metrics().known_accounts.set(self.dedup.known_len() as i64);
        metrics().in_flight_accounts.set(self.dedup.in_flight_len() as i64);
    }
}

/// Base64 notification payload to a decoded market record
pub fn decode_payload(payload: &str) -> Result<MarketRecord, PayloadError> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| PayloadError::Encoding(e.to_string()))?;
    Ok(decoder::decode(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniffer::decoder::tests::encode;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct RecordingLauncher {
        launched: Mutex<Vec<Pubkey>>,
        resolution: Resolution,
        gate: Option<Arc<Notify>>,
    }

    impl RecordingLauncher {
        fn new(resolution: Resolution) -> Self {
            Self {
                launched: Mutex::new(Vec::new()),
                resolution,
                gate: None,
            }
        }
    }

    #[async_trait]
    impl ListingLauncher for RecordingLauncher {
        async fn launch(&self, listing: AcceptedListing) -> Resolution {
            self.launched.lock().push(listing.account);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.resolution
        }
    }

    fn never_on_curve(_: &Pubkey) -> bool {
        false
    }

    fn always_on_curve(_: &Pubkey) -> bool {
        true
    }

    fn notification(account: Pubkey) -> AccountNotification {
        let record = MarketRecord {
            pool_bump: 1,
            index: 0,
            creator: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
            lp_mint: Pubkey::new_unique(),
            pool_base_token_account: Pubkey::new_unique(),
            pool_quote_token_account: Pubkey::new_unique(),
            lp_supply: 10,
        };
        AccountNotification {
            account,
            payload: BASE64.encode(encode(&record)),
            slot: 7,
        }
    }

    fn handler(launcher: Arc<RecordingLauncher>) -> ListingHandler {
        ListingHandler::new(Arc::new(DedupTracker::new()), launcher).with_curve_check(never_on_curve)
    }

    #[tokio::test]
    async fn test_accepted_listing_commits() {
        let launcher = Arc::new(RecordingLauncher::new(Resolution::Committed));
        let handler = handler(Arc::clone(&launcher));
        let account = Pubkey::new_unique();

        let DispatchOutcome::Launched(handle) = handler.dispatch(notification(account)) else {
            panic!("expected launch");
        };
        assert_eq!(handle.await.unwrap(), Resolution::Committed);
        assert!(handler.dedup().is_known(&account));
        assert_eq!(handler.dedup().in_flight_len(), 0);
        assert_eq!(launcher.launched.lock().as_slice(), &[account]);
    }

    #[tokio::test]
    async fn test_duplicate_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let launcher = Arc::new(RecordingLauncher {
            gate: Some(Arc::clone(&gate)),
            ..RecordingLauncher::new(Resolution::Committed)
        });
        let handler = handler(Arc::clone(&launcher));
        let account = Pubkey::new_unique();

        let DispatchOutcome::Launched(handle) = handler.dispatch(notification(account)) else {
            panic!("expected launch");
        };
        assert!(matches!(
            handler.dispatch(notification(account)),
            DispatchOutcome::Duplicate
        ));
        gate.notify_one();
        handle.await.unwrap();
        assert!(matches!(
            handler.dispatch(notification(account)),
            DispatchOutcome::Duplicate
        ));
        assert_eq!(launcher.launched.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_released_listing_can_retry() {
        let launcher = Arc::new(RecordingLauncher::new(Resolution::Released));
        let handler = handler(Arc::clone(&launcher));
        let account = Pubkey::new_unique();

        for _ in 0..2 {
            let DispatchOutcome::Launched(handle) = handler.dispatch(notification(account)) else {
                panic!("expected launch");
            };
            assert_eq!(handle.await.unwrap(), Resolution::Released);
            assert!(!handler.dedup().is_known(&account));
        }
        assert_eq!(launcher.launched.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_payload_commits() {
        let launcher = Arc::new(RecordingLauncher::new(Resolution::Committed));
        let handler = handler(Arc::clone(&launcher));
        let account = Pubkey::new_unique();

        let short = AccountNotification {
            account,
            payload: BASE64.encode([0u8; 100]),
            slot: 1,
        };
        assert!(matches!(
            handler.dispatch(short),
            DispatchOutcome::Malformed(PayloadError::Layout(_))
        ));
        assert!(handler.dedup().is_known(&account));

        let garbage = AccountNotification {
            account: Pubkey::new_unique(),
            payload: "***".into(),
            slot: 1,
        };
        assert!(matches!(
            handler.dispatch(garbage),
            DispatchOutcome::Malformed(PayloadError::Encoding(_))
        ));
        assert!(launcher.launched.lock().is_empty());
    }

    #[tokio::test]
    async fn test_quick_pool_commits_without_launch() {
        let launcher = Arc::new(RecordingLauncher::new(Resolution::Committed));
        let handler = ListingHandler::new(Arc::new(DedupTracker::new()), launcher.clone())
            .with_curve_check(always_on_curve);
        let account = Pubkey::new_unique();

        assert!(matches!(
            handler.dispatch(notification(account)),
            DispatchOutcome::QuickPool
        ));
        assert!(handler.dedup().is_known(&account));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(launcher.launched.lock().is_empty());
    }

    struct PanickingLauncher;

    #[async_trait]
    impl ListingLauncher for PanickingLauncher {
        async fn launch(&self, _listing: AcceptedListing) -> Resolution {
            panic!("launcher blew up");
        }
    }

    #[tokio::test]
    async fn test_panicking_launch_releases() {
        let handler = ListingHandler::new(Arc::new(DedupTracker::new()), Arc::new(PanickingLauncher))
            .with_curve_check(never_on_curve);
        let account = Pubkey::new_unique();

        let DispatchOutcome::Launched(handle) = handler.dispatch(notification(account)) else {
            panic!("expected launch");
        };
        assert!(handle.await.is_err());
        assert!(!handler.dedup().is_known(&account));
        assert!(!handler.dedup().is_in_flight(&account));
    }
}
