//! Structured logging for the listing pipeline
//!
//! Every accepted listing gets one [`ListingLogger`] carrying a fresh
//! context id, so all milestones of one trade can be correlated in the
//! JSON log output.

use uuid::Uuid;

/// Structured logger for one listing's pipeline events
#[derive(Debug, Clone)]
pub struct ListingLogger {
    context_id: String,
    account: String,
    mint: String,
}

impl ListingLogger {
    pub fn new(account: &str, mint: &str) -> Self {
        Self {
            context_id: Uuid::new_v4().to_string(),
            account: account.to_string(),
            mint: mint.to_string(),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn log_detected(&self, slot: u64) {
        tracing::info!(
            context_id = %self.context_id,
            account = %self.account,
            mint = %self.mint,
            slot,
            "New listing detected"
        );
    }

    pub fn log_pool_info(&self, liquidity_usd: f64, price_sol: f64, decimals: u8) {
        tracing::info!(
            context_id = %self.context_id,
            mint = %self.mint,
            liquidity_usd,
            price_sol,
            decimals,
            "Pool info resolved"
        );
    }

    pub fn log_stage(&self, stage: &str, attempt: u32) {
        tracing::debug!(
            context_id = %self.context_id,
            mint = %self.mint,
            stage = %stage,
            attempt,
            "Trade stage"
        );
    }

    pub fn log_slippage_retry(&self, attempt: u32, max: u32) {
        tracing::info!(
            context_id = %self.context_id,
            mint = %self.mint,
            attempt,
            max,
            "Simulation hit slippage, retrying"
        );
    }

    pub fn log_submitted(&self, signature: &str) {
        tracing::info!(
            context_id = %self.context_id,
            mint = %self.mint,
            signature = %signature,
            "Transaction submitted"
        );
    }

    pub fn log_buy_success(&self, signature: &str, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            mint = %self.mint,
            signature = %signature,
            latency_ms,
            "Buy transaction finalized"
        );
    }

    pub fn log_dry_run(&self, units_consumed: Option<u64>) {
        tracing::info!(
            context_id = %self.context_id,
            mint = %self.mint,
            units_consumed = ?units_consumed,
            "Dry run: simulation passed, not submitting"
        );
    }

    pub fn log_buy_failure(&self, category: &str, error: &str, latency_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            mint = %self.mint,
            category = %category,
            error = %error,
            latency_ms,
            "Buy transaction failed"
        );
    }

    pub fn log_released(&self, reason: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            account = %self.account,
            mint = %self.mint,
            reason = %reason,
            "Listing released for retry"
        );
    }
}
