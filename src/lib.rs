//! Listing Sniper - pump-swap listing detection and buy execution
//!
//! This library exposes the detection pipeline, the trade executor and
//! their collaborators for the binary and for integration tests.

pub mod buy_engine;
pub mod config;
pub mod confirmation;
pub mod endpoints;
pub mod metrics;
pub mod pool_info;
pub mod price_tracker;
pub mod rpc;
pub mod sniffer;
pub mod streaming;
pub mod structured_logging;
pub mod trade_log;
pub mod tx_builder;
pub mod wallet;

// Re-export commonly used types
pub use buy_engine::{BuyEngine, TradeExecutor, TradeOutcome, TradeStage, TradeState};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
