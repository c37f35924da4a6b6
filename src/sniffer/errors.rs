//! Error types for the Sniffer module

use thiserror::Error;

/// Main error type for Sniffer operations
///
/// Every variant is a transport-level failure. They are contained by the
/// reconnect loop in [`super::core::SubscriptionClient`] and never reach an
/// admitted listing.
#[derive(Error, Debug, Clone)]
pub enum SnifferError {
    /// Stream connection failed
    #[error("Stream connection error: {0}")]
    StreamConnection(String),
    /// The subscribe request was rejected or never acknowledged
    #[error("Subscription error: {0}")]
    Subscription(String),
    /// Reconciliation query failed
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),
}

impl SnifferError {
    /// Short label used for metrics and structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::StreamConnection(_) => "connect",
            Self::Subscription(_) => "subscribe",
            Self::Reconciliation(_) => "reconcile",
        }
    }
}

/// Error type for market account decoding
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remain than the field at `offset` requires
    #[error("Account data truncated at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Error type for the notification payload envelope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload is not valid base64
    #[error("Invalid payload encoding: {0}")]
    Encoding(String),
    /// Payload decoded but the account layout did not
    #[error("Invalid account layout: {0}")]
    Layout(#[from] DecodeError),
}
