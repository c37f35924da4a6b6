//! Trade execution for accepted listings
//!
//! [`TradeExecutor`] is the per-trade state machine:
//!
//! ```text
//! Quoting -> Building -> Simulating -+-> Signing -> Submitting -> Confirming -> Success
//!               ^                    |
//!               +---- RetryWait <----+ (slippage, counter < max)
//! ```
//!
//! Any other failure moves to `Failed`. Every pass through `Building`
//! rebuilds from the same quote; exactly one signed transaction is
//! broadcast per trade, and only after a clean simulation.
//!
//! [`BuyEngine`] is the [`ListingLauncher`] that wraps the executor with the
//! pool-liquidity wait, the trade log and optional price tracking.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tokio::time::sleep;
use tracing::debug;

use crate::confirmation::ConfirmationPoller;
use crate::metrics::{metrics, Timer};
use crate::pool_info::{wait_for_liquidity, PoolInfoApi};
use crate::price_tracker::PriceTracker;
use crate::rpc::{ChainRpc, Finality};
use crate::sniffer::dedup::Resolution;
use crate::sniffer::handler::{AcceptedListing, ListingLauncher};
use crate::structured_logging::ListingLogger;
use crate::trade_log::{TradeLog, TradeRecord};
use crate::tx_builder::{
    ExecutionError, QuoteRequest, SimulationClassifier, SimulationError, SimulationVerdict,
    SwapApi, SwapParams,
};
use crate::wallet::WalletManager;

/// Slippage-class simulation failures tolerated per trade
pub const MAX_SLIPPAGE_RETRIES: u32 = 10;

/// Pause before rebuilding after a slippage failure
pub const RETRY_DELAY: Duration = Duration::from_millis(800);

/// Buy configuration for every trade
#[derive(Debug, Clone)]
pub struct BuyConfig {
    /// Mint spent by the buy (wrapped SOL)
    pub input_mint: Pubkey,
    /// Input amount in base units
    pub buy_amount: u64,
    pub max_slippage_retries: u32,
    pub retry_delay: Duration,
    pub target_finality: Finality,
    /// Stop after a clean simulation; never sign or submit
    pub dry_run: bool,
}

impl BuyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buy_amount == 0 {
            return Err(anyhow!("buy_amount must be > 0"));
        }
        if self.max_slippage_retries == 0 {
            return Err(anyhow!("max_slippage_retries must be > 0"));
        }
        Ok(())
    }
}

/// Stages of one trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStage {
    Quoting,
    Building,
    Simulating,
    RetryWait,
    Signing,
    Submitting,
    Confirming,
    Success,
    Failed,
}

impl TradeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quoting => "quoting",
            Self::Building => "building",
            Self::Simulating => "simulating",
            Self::RetryWait => "retry_wait",
            Self::Signing => "signing",
            Self::Submitting => "submitting",
            Self::Confirming => "confirming",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Mutable state of one trade, owned by exactly one execution task
#[derive(Debug, Clone)]
pub struct TradeState {
    pub base_mint: Pubkey,
    pub decimals: u8,
    /// Slippage-class failures so far
    pub retries: u32,
    pub simulations: u32,
    pub stage: TradeStage,
    /// Every stage entered, in order
    pub history: Vec<TradeStage>,
}

impl TradeState {
    pub fn new(base_mint: Pubkey, decimals: u8) -> Self {
        Self {
            base_mint,
            decimals,
            retries: 0,
            simulations: 0,
            stage: TradeStage::Quoting,
            history: vec![TradeStage::Quoting],
        }
    }

    fn enter(&mut self, stage: TradeStage, logger: &ListingLogger) {
        self.stage = stage;
        self.history.push(stage);
        logger.log_stage(stage.as_str(), self.retries);
    }
}

/// How a trade that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeOutcome {
    /// Broadcast and reached the target finality
    Confirmed {
        signature: Signature,
        finality: Finality,
    },
    /// Dry run: simulation passed, nothing signed
    Simulated { units_consumed: Option<u64> },
}

pub struct TradeExecutor {
    swap: Arc<dyn SwapApi>,
    rpc: Arc<dyn ChainRpc>,
    wallet: WalletManager,
    classifier: Arc<dyn SimulationClassifier>,
    poller: ConfirmationPoller,
    swap_params: SwapParams,
    config: BuyConfig,
}

impl TradeExecutor {
    pub fn new(
        swap: Arc<dyn SwapApi>,
        rpc: Arc<dyn ChainRpc>,
        wallet: WalletManager,
        classifier: Arc<dyn SimulationClassifier>,
        poller: ConfirmationPoller,
        swap_params: SwapParams,
        config: BuyConfig,
    ) -> Self {
        Self {
            swap,
            rpc,
            wallet,
            classifier,
            poller,
            swap_params,
            config,
        }
    }

    /// Drive `state` from `Quoting` to `Success` or `Failed`
    pub async fn execute(
        &self,
        state: &mut TradeState,
        logger: &ListingLogger,
    ) -> Result<TradeOutcome, ExecutionError> {
        metrics().trades_total.inc();
        let result = self.run(state, logger).await;
        match &result {
            Ok(_) => {
                state.enter(TradeStage::Success, logger);
                metrics().trades_success.inc();
            }
            Err(_) => {
                state.enter(TradeStage::Failed, logger);
                metrics().trades_failed.inc();
            }
        }
        result
    }

    async fn run(
        &self,
        state: &mut TradeState,
        logger: &ListingLogger,
    ) -> Result<TradeOutcome, ExecutionError> {
        let request = QuoteRequest {
            input_mint: self.config.input_mint,
            output_mint: state.base_mint,
            amount: self.config.buy_amount,
            slippage_bps: self.swap_params.slippage_bps,
        };
        let quote = self
            .swap
            .quote(&request)
            .await
            .map_err(ExecutionError::Quote)?;

        let (unsigned, report) = loop {
            state.enter(TradeStage::Building, logger);
            let unsigned = self
                .swap
                .build(&quote, &self.swap_params)
                .await
                .map_err(ExecutionError::Build)?;

            state.enter(TradeStage::Simulating, logger);
            state.simulations += 1;
            metrics().simulations_total.inc();
            let report = self
                .rpc
                .simulate(&unsigned)
                .await
                .map_err(|e| ExecutionError::SimulationRequest(e.to_string()))?;

            match self.classifier.classify(&report) {
                SimulationVerdict::Success => break (unsigned, report),
                SimulationVerdict::Failed(SimulationError::Slippage(_)) => {
                    state.retries += 1;
                    metrics().slippage_retries.inc();
                    if state.retries >= self.config.max_slippage_retries {
                        return Err(ExecutionError::SlippageRetriesExhausted {
                            attempts: state.retries,
                        });
                    }
                    logger.log_slippage_retry(state.retries, self.config.max_slippage_retries);
                    state.enter(TradeStage::RetryWait, logger);
                    sleep(self.config.retry_delay).await;
                }
                SimulationVerdict::Failed(other) => {
                    return Err(ExecutionError::Simulation(other));
                }
            }
        };

        if self.config.dry_run {
            logger.log_dry_run(report.units_consumed);
            return Ok(TradeOutcome::Simulated {
                units_consumed: report.units_consumed,
            });
        }

        state.enter(TradeStage::Signing, logger);
        let signed = self
            .wallet
            .sign(&unsigned)
            .map_err(|e| ExecutionError::Signing(e.to_string()))?;

        state.enter(TradeStage::Submitting, logger);
        let signature = self
            .rpc
            .send(&signed)
            .await
            .map_err(|e| ExecutionError::Submission(e.to_string()))?;
        metrics().transactions_sent.inc();
        logger.log_submitted(&signature.to_string());

        state.enter(TradeStage::Confirming, logger);
        let finality = self
            .poller
            .await_status(&signature, self.config.target_finality)
            .await?;

        Ok(TradeOutcome::Confirmed {
            signature,
            finality,
        })
    }
}

/// Bounded wait for a new pool to show liquidity
#[derive(Debug, Clone, Copy)]
pub struct PoolWait {
    pub max_attempts: usize,
    pub delay: Duration,
}

/// Production listing launcher
pub struct BuyEngine {
    executor: Arc<TradeExecutor>,
    pool_info: Arc<dyn PoolInfoApi>,
    pool_wait: PoolWait,
    trade_log: TradeLog,
    price_tracker: Option<PriceTracker>,
}

impl BuyEngine {
    pub fn new(
        executor: Arc<TradeExecutor>,
        pool_info: Arc<dyn PoolInfoApi>,
        pool_wait: PoolWait,
        trade_log: TradeLog,
        price_tracker: Option<PriceTracker>,
    ) -> Self {
        Self {
            executor,
            pool_info,
            pool_wait,
            trade_log,
            price_tracker,
        }
    }
}

#[async_trait]
impl ListingLauncher for BuyEngine {
    /// Released only when the pool never showed liquidity; every trade
    /// outcome, success or failure, commits the listing.
    async fn launch(&self, listing: AcceptedListing) -> Resolution {
        let mint = listing.record.base_mint;
        let detected_at = Utc::now();
        let logger = ListingLogger::new(&listing.account.to_string(), &mint.to_string());
        logger.log_detected(listing.slot);

        let pool = match wait_for_liquidity(
            Arc::clone(&self.pool_info),
            mint,
            self.pool_wait.max_attempts,
            self.pool_wait.delay,
        )
        .await
        {
            Ok(pool) => pool,
            Err(e) => {
                logger.log_released(&e.to_string());
                return Resolution::Released;
            }
        };
        logger.log_pool_info(pool.liquidity_usd, pool.price_in_sol(), pool.base_mint_decimals);
        self.trade_log
            .record(TradeRecord::new(detected_at, mint.to_string(), pool.liquidity_usd));

        let mut state = TradeState::new(mint, pool.base_mint_decimals);
        let timer = Timer::new();
        metrics().active_trades.inc();
        let result = self.executor.execute(&mut state, &logger).await;
        metrics().active_trades.dec();
        timer.observe_duration(&metrics().trade_latency);

        match result {
            Ok(TradeOutcome::Confirmed { signature, .. }) => {
                logger.log_buy_success(&signature.to_string(), timer.elapsed_ms());
                if let Some(tracker) = &self.price_tracker {
                    // Sampler runs detached; its samples reach the price writer on their own.
                    drop(tracker.track(mint, detected_at));
                    debug!(%mint, "Price sampling started");
                }
            }
            Ok(TradeOutcome::Simulated { .. }) => {}
            Err(e) => logger.log_buy_failure(e.category(), &e.to_string(), timer.elapsed_ms()),
        }
        Resolution::Committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::ConfirmationError;
    use crate::pool_info::{PoolInfo, PoolInfoError};
    use crate::rpc::{RpcError, SignatureState, SimulationReport};
    use crate::sniffer::decoder::MarketRecord;
    use crate::sniffer::dedup::DedupTracker;
    use crate::tx_builder::swap_api::Quote;
    use crate::tx_builder::{SlippageClassifier, SwapApiError};
    use parking_lot::Mutex;
    use serde_json::json;
    use solana_sdk::message::{Message, VersionedMessage};
    use solana_sdk::signature::Keypair;
    use solana_sdk::transaction::VersionedTransaction;
    use std::collections::VecDeque;

    struct FakeSwap {
        payer: Pubkey,
        quote_fails: bool,
        quotes: Mutex<u32>,
        builds: Mutex<Vec<Quote>>,
    }

    #[async_trait]
    impl SwapApi for FakeSwap {
        async fn quote(&self, _request: &QuoteRequest) -> Result<Quote, SwapApiError> {
            *self.quotes.lock() += 1;
            if self.quote_fails {
                return Err(SwapApiError::Status {
                    status: 400,
                    body: "no route".into(),
                });
            }
            Ok(Quote(json!({"outAmount": "1000", "id": *self.quotes.lock()})))
        }

        async fn build(
            &self,
            quote: &Quote,
            _params: &SwapParams,
        ) -> Result<VersionedTransaction, SwapApiError> {
            self.builds.lock().push(quote.clone());
            Ok(VersionedTransaction {
                signatures: vec![Signature::default()],
                message: VersionedMessage::Legacy(Message::new(&[], Some(&self.payer))),
            })
        }
    }

    struct FakeRpc {
        simulations: Mutex<VecDeque<SimulationReport>>,
        simulate_calls: Mutex<u32>,
        sends: Mutex<Vec<VersionedTransaction>>,
        status: Option<SignatureState>,
    }

    #[async_trait]
    impl ChainRpc for FakeRpc {
        async fn simulate(&self, _tx: &VersionedTransaction) -> Result<SimulationReport, RpcError> {
            *self.simulate_calls.lock() += 1;
            Ok(self.simulations.lock().pop_front().unwrap_or_else(slippage))
        }

        async fn send(&self, tx: &VersionedTransaction) -> Result<Signature, RpcError> {
            self.sends.lock().push(tx.clone());
            Ok(tx.signatures[0])
        }

        async fn signature_status(
            &self,
            _signature: &Signature,
        ) -> Result<Option<SignatureState>, RpcError> {
            Ok(self.status.clone())
        }

        async fn balance(&self, _address: &Pubkey) -> Result<u64, RpcError> {
            Ok(0)
        }
    }

    fn slippage() -> SimulationReport {
        SimulationReport {
            err: Some(json!({"InstructionError": [3, {"Custom": 6001}]})),
            logs: vec![],
            units_consumed: None,
        }
    }

    fn clean() -> SimulationReport {
        SimulationReport {
            err: None,
            logs: vec!["Program log: ok".into()],
            units_consumed: Some(120_000),
        }
    }

    fn finalized() -> Option<SignatureState> {
        Some(SignatureState {
            err: None,
            finality: Some(Finality::Finalized),
        })
    }

    struct Harness {
        swap: Arc<FakeSwap>,
        rpc: Arc<FakeRpc>,
        executor: TradeExecutor,
    }

    fn harness(
        simulations: Vec<SimulationReport>,
        status: Option<SignatureState>,
        quote_fails: bool,
        dry_run: bool,
    ) -> Harness {
        let wallet = WalletManager::from_keypair(Keypair::new());
        let swap = Arc::new(FakeSwap {
            payer: wallet.pubkey(),
            quote_fails,
            quotes: Mutex::new(0),
            builds: Mutex::new(Vec::new()),
        });
        let rpc = Arc::new(FakeRpc {
            simulations: Mutex::new(simulations.into()),
            simulate_calls: Mutex::new(0),
            sends: Mutex::new(Vec::new()),
            status,
        });
        let executor = TradeExecutor::new(
            swap.clone(),
            rpc.clone(),
            wallet.clone(),
            Arc::new(SlippageClassifier::default()),
            ConfirmationPoller::new(rpc.clone()).with_deadline(Some(Duration::from_secs(30))),
            SwapParams::new(wallet.pubkey()),
            BuyConfig {
                input_mint: Pubkey::new_unique(),
                buy_amount: 10_000_000,
                max_slippage_retries: MAX_SLIPPAGE_RETRIES,
                retry_delay: RETRY_DELAY,
                target_finality: Finality::Finalized,
                dry_run,
            },
        );
        Harness {
            swap,
            rpc,
            executor,
        }
    }

    fn logger() -> ListingLogger {
        ListingLogger::new("account", "mint")
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_try_success() {
        let h = harness(vec![clean()], finalized(), false, false);
        let mut state = TradeState::new(Pubkey::new_unique(), 6);

        let outcome = h.executor.execute(&mut state, &logger()).await.unwrap();
        assert!(matches!(
            outcome,
            TradeOutcome::Confirmed {
                finality: Finality::Finalized,
                ..
            }
        ));
        assert_eq!(*h.rpc.simulate_calls.lock(), 1);
        assert_eq!(h.rpc.sends.lock().len(), 1);
        assert_eq!(state.retries, 0);
        assert_eq!(
            state.history,
            vec![
                TradeStage::Quoting,
                TradeStage::Building,
                TradeStage::Simulating,
                TradeStage::Signing,
                TradeStage::Submitting,
                TradeStage::Confirming,
                TradeStage::Success,
            ]
        );
        // broadcast transaction carries a real signature
        assert_ne!(h.rpc.sends.lock()[0].signatures[0], Signature::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_slippage_exhausts_without_sending() {
        let h = harness(vec![], finalized(), false, false);
        let mut state = TradeState::new(Pubkey::new_unique(), 6);
        let started = tokio::time::Instant::now();

        let err = h.executor.execute(&mut state, &logger()).await.unwrap_err();
        assert_eq!(err, ExecutionError::SlippageRetriesExhausted { attempts: 10 });
        assert_eq!(*h.rpc.simulate_calls.lock(), 10);
        assert!(h.rpc.sends.lock().is_empty());
        assert_eq!(state.stage, TradeStage::Failed);
        // nine waits between ten simulations
        let waited = started.elapsed();
        assert!(waited >= RETRY_DELAY * 9 && waited < RETRY_DELAY * 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slippage_then_success_reuses_quote() {
        let h = harness(vec![slippage(), slippage(), clean()], finalized(), false, false);
        let mut state = TradeState::new(Pubkey::new_unique(), 6);

        h.executor.execute(&mut state, &logger()).await.unwrap();
        assert_eq!(state.retries, 2);
        assert_eq!(*h.rpc.simulate_calls.lock(), 3);
        assert_eq!(h.rpc.sends.lock().len(), 1);
        assert_eq!(*h.swap.quotes.lock(), 1);
        let builds = h.swap.builds.lock();
        assert_eq!(builds.len(), 3);
        assert!(builds.iter().all(|q| *q == builds[0]));
        assert_eq!(
            state.history.iter().filter(|s| **s == TradeStage::RetryWait).count(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_simulation_error_is_terminal() {
        let other = SimulationReport {
            err: Some(json!({"InstructionError": [1, {"Custom": 1}]})),
            logs: vec!["Program log: insufficient funds".into()],
            units_consumed: None,
        };
        let h = harness(vec![other], finalized(), false, false);
        let mut state = TradeState::new(Pubkey::new_unique(), 6);

        let err = h.executor.execute(&mut state, &logger()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Simulation(SimulationError::Other(_))));
        assert_eq!(*h.rpc.simulate_calls.lock(), 1);
        assert!(h.rpc.sends.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_failure_never_builds() {
        let h = harness(vec![clean()], finalized(), true, false);
        let mut state = TradeState::new(Pubkey::new_unique(), 6);

        let err = h.executor.execute(&mut state, &logger()).await.unwrap_err();
        assert_eq!(err.category(), "quote");
        assert!(h.swap.builds.lock().is_empty());
        assert_eq!(*h.rpc.simulate_calls.lock(), 0);
        assert_eq!(state.history, vec![TradeStage::Quoting, TradeStage::Failed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_chain_failure_after_single_send() {
        let failed = Some(SignatureState {
            err: Some("InstructionError(2, Custom(6001))".into()),
            finality: Some(Finality::Confirmed),
        });
        let h = harness(vec![clean()], failed, false, false);
        let mut state = TradeState::new(Pubkey::new_unique(), 6);

        let err = h.executor.execute(&mut state, &logger()).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Confirmation(ConfirmationError::TransactionFailed { .. })
        ));
        assert_eq!(h.rpc.sends.lock().len(), 1);
        assert_eq!(*h.rpc.simulate_calls.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_stops_after_simulation() {
        let h = harness(vec![clean()], finalized(), false, true);
        let mut state = TradeState::new(Pubkey::new_unique(), 6);

        let outcome = h.executor.execute(&mut state, &logger()).await.unwrap();
        assert_eq!(
            outcome,
            TradeOutcome::Simulated {
                units_consumed: Some(120_000)
            }
        );
        assert!(h.rpc.sends.lock().is_empty());
        assert!(!state.history.contains(&TradeStage::Signing));
    }

    #[test]
    fn test_buy_config_validation() {
        let config = BuyConfig {
            input_mint: Pubkey::new_unique(),
            buy_amount: 0,
            max_slippage_retries: 10,
            retry_delay: RETRY_DELAY,
            target_finality: Finality::Finalized,
            dry_run: false,
        };
        assert!(config.validate().is_err());
    }

    struct FixedPool {
        liquidity_usd: f64,
        lookups: Mutex<u32>,
    }

    #[async_trait]
    impl PoolInfoApi for FixedPool {
        async fn pool_info(&self, _mint: &Pubkey) -> Result<PoolInfo, PoolInfoError> {
            *self.lookups.lock() += 1;
            Ok(PoolInfo {
                base_reserves: 1_000_000_000_000_000.0,
                quote_reserves: 85_000_000_000.0,
                base_mint_decimals: 6,
                quote_mint_decimals: 9,
                liquidity_usd: self.liquidity_usd,
                timestamp: None,
            })
        }
    }

    fn listing() -> AcceptedListing {
        AcceptedListing {
            account: Pubkey::new_unique(),
            record: MarketRecord {
                pool_bump: 255,
                index: 0,
                creator: Pubkey::new_unique(),
                base_mint: Pubkey::new_unique(),
                quote_mint: Pubkey::new_unique(),
                lp_mint: Pubkey::new_unique(),
                pool_base_token_account: Pubkey::new_unique(),
                pool_quote_token_account: Pubkey::new_unique(),
                lp_supply: 1_000,
            },
            slot: 42,
        }
    }

    fn engine(
        executor: TradeExecutor,
        pool: Arc<FixedPool>,
        log_path: &std::path::Path,
    ) -> BuyEngine {
        let (trade_log, _writer) = TradeLog::spawn(log_path);
        BuyEngine::new(
            Arc::new(executor),
            pool,
            PoolWait {
                max_attempts: 2,
                delay: Duration::from_millis(800),
            },
            trade_log,
            None,
        )
    }

    fn pool(liquidity_usd: f64) -> Arc<FixedPool> {
        Arc::new(FixedPool {
            liquidity_usd,
            lookups: Mutex::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_without_liquidity_releases() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(vec![clean()], finalized(), false, false);
        let pool = pool(0.0);
        let engine = engine(h.executor, pool.clone(), &dir.path().join("trades.json"));

        let resolution = engine.launch(listing()).await;
        assert_eq!(resolution, Resolution::Released);
        assert_eq!(*pool.lookups.lock(), 2);
        assert_eq!(*h.swap.quotes.lock(), 0);
        assert!(h.rpc.sends.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_commits_after_successful_buy() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(vec![clean()], finalized(), false, false);
        let engine = engine(h.executor, pool(12_000.0), &dir.path().join("trades.json"));

        assert_eq!(engine.launch(listing()).await, Resolution::Committed);
        assert_eq!(h.rpc.sends.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_commits_after_failed_trade() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(vec![clean()], finalized(), true, false);
        let engine = engine(h.executor, pool(12_000.0), &dir.path().join("trades.json"));

        assert_eq!(engine.launch(listing()).await, Resolution::Committed);
        assert_eq!(*h.swap.quotes.lock(), 1);
        assert!(h.rpc.sends.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_commits_dry_run_without_sending() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(vec![clean()], finalized(), false, true);
        let engine = engine(h.executor, pool(12_000.0), &dir.path().join("trades.json"));

        assert_eq!(engine.launch(listing()).await, Resolution::Committed);
        assert_eq!(*h.rpc.simulate_calls.lock(), 1);
        assert!(h.rpc.sends.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_listing_can_be_admitted_again() {
        let dir = tempfile::tempdir().unwrap();
        let dedup = Arc::new(DedupTracker::new());
        let listing = listing();
        let account = listing.account;

        let h = harness(vec![clean()], finalized(), false, false);
        let starved = engine(h.executor, pool(0.0), &dir.path().join("trades.json"));
        let admission = dedup.admit(account).unwrap();
        admission.resolve(starved.launch(listing.clone()).await);
        assert!(!dedup.is_known(&account));
        assert!(!dedup.is_in_flight(&account));

        let h = harness(vec![clean()], finalized(), false, false);
        let live = engine(h.executor, pool(12_000.0), &dir.path().join("trades.json"));
        let admission = dedup.admit(account).unwrap();
        admission.resolve(live.launch(listing).await);
        assert!(dedup.is_known(&account));
        assert!(dedup.admit(account).is_none());
    }
}
