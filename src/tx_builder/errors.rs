//! Error types for swap building, simulation and execution
//!
//! Every error that ends a trade surfaces as an [`ExecutionError`]. Only
//! [`SimulationError::Slippage`] is retried, and only by the executor's
//! bounded slippage loop.

use crate::confirmation::ConfirmationError;
use thiserror::Error;

/// Failures talking to the quote / swap-build HTTP API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapApiError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("Swap API request failed: {0}")]
    Request(String),

    /// Non-success HTTP status
    #[error("Swap API returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Response JSON did not have the expected shape
    #[error("Invalid swap API response: {0}")]
    InvalidResponse(String),

    /// `swapTransaction` was not a base64 bincode `VersionedTransaction`
    #[error("Invalid swap transaction payload: {0}")]
    InvalidTransaction(String),
}

/// Classified simulation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// Price moved past the slippage bound between quote and simulation
    #[error("Slippage tolerance exceeded: {0}")]
    Slippage(String),

    /// Any other program or runtime failure
    #[error("Simulation failed: {0}")]
    Other(String),
}

/// Terminal failure of one trade
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Quote failed: {0}")]
    Quote(SwapApiError),

    #[error("Swap build failed: {0}")]
    Build(SwapApiError),

    /// Non-slippage simulation error
    #[error(transparent)]
    Simulation(SimulationError),

    /// The simulate call itself failed
    #[error("Simulation request failed: {0}")]
    SimulationRequest(String),

    #[error("Slippage retries exhausted after {attempts} attempts")]
    SlippageRetriesExhausted { attempts: u32 },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
}

impl ExecutionError {
    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Quote(_) => "quote",
            Self::Build(_) => "build",
            Self::Simulation(_) => "simulation",
            Self::SimulationRequest(_) => "simulation_rpc",
            Self::SlippageRetriesExhausted { .. } => "slippage",
            Self::Signing(_) => "signing",
            Self::Submission(_) => "submission",
            Self::Confirmation(ConfirmationError::TransactionFailed { .. }) => "on_chain",
            Self::Confirmation(ConfirmationError::Timeout { .. }) => "confirmation_timeout",
        }
    }
}
