//! Listing filter: decides whether a decoded market is a genuine new listing
//!
//! Pools created through the canonical migration path are owned by a
//! program-derived authority (off the ed25519 curve). A creator that is an
//! ordinary wallet (on curve) marks a "quick pool" created directly by a
//! user, which the pipeline does not trade.

use super::decoder::MarketRecord;
use solana_sdk::pubkey::Pubkey;

/// Outcome of evaluating one decoded market
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Creator is a program-derived authority
    Accepted,
    /// Creator is an on-curve wallet
    QuickPool,
}

impl FilterVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Evaluate a record against an externally supplied curve check
pub fn evaluate<F>(record: &MarketRecord, is_on_curve: F) -> FilterVerdict
where
    F: Fn(&Pubkey) -> bool,
{
    if is_on_curve(&record.creator) {
        FilterVerdict::QuickPool
    } else {
        FilterVerdict::Accepted
    }
}

/// Boolean form of [`evaluate`]
pub fn accept<F>(record: &MarketRecord, is_on_curve: F) -> bool
where
    F: Fn(&Pubkey) -> bool,
{
    evaluate(record, is_on_curve).is_accepted()
}

/// Default curve check backed by the SDK's ed25519 point decompression
pub fn is_on_curve(key: &Pubkey) -> bool {
    key.is_on_curve()
}
