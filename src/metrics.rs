//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Detection counters
    pub notifications_received: IntCounter,
    pub duplicates_skipped: IntCounter,
    pub malformed_accounts: IntCounter,
    pub quick_pools_rejected: IntCounter,
    pub listings_accepted: IntCounter,
    pub listings_released: IntCounter,
    pub reconnects: IntCounter,

    // Execution counters
    pub trades_total: IntCounter,
    pub trades_success: IntCounter,
    pub trades_failed: IntCounter,
    pub simulations_total: IntCounter,
    pub slippage_retries: IntCounter,
    pub transactions_sent: IntCounter,

    // Gauges
    pub known_accounts: IntGauge,
    pub in_flight_accounts: IntGauge,
    pub active_trades: IntGauge,

    // Histograms
    pub trade_latency: Histogram,
    pub confirmation_latency: Histogram,
    pub http_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let notifications_received = IntCounter::with_opts(Opts::new(
            "notifications_received",
            "Account notifications received from the subscription",
        ))?;

        let duplicates_skipped = IntCounter::with_opts(Opts::new(
            "duplicates_skipped",
            "Notifications for accounts already known or in flight",
        ))?;

        let malformed_accounts = IntCounter::with_opts(Opts::new(
            "malformed_accounts",
            "Notifications whose payload failed to decode",
        ))?;

        let quick_pools_rejected = IntCounter::with_opts(Opts::new(
            "quick_pools_rejected",
            "Markets rejected because the creator is a wallet",
        ))?;

        let listings_accepted = IntCounter::with_opts(Opts::new(
            "listings_accepted",
            "Markets accepted as new listings",
        ))?;

        let listings_released = IntCounter::with_opts(Opts::new(
            "listings_released",
            "Accepted listings released back for a later retry",
        ))?;

        let reconnects = IntCounter::with_opts(Opts::new(
            "subscription_reconnects",
            "Subscription sessions that ended and were restarted",
        ))?;

        let trades_total = IntCounter::with_opts(Opts::new(
            "trades_total",
            "Total number of trades attempted",
        ))?;

        let trades_success =
            IntCounter::with_opts(Opts::new("trades_success", "Number of successful trades"))?;

        let trades_failed =
            IntCounter::with_opts(Opts::new("trades_failed", "Number of failed trades"))?;

        let simulations_total = IntCounter::with_opts(Opts::new(
            "simulations_total",
            "Swap transactions simulated",
        ))?;

        let slippage_retries = IntCounter::with_opts(Opts::new(
            "slippage_retries",
            "Simulations that failed with a slippage-class error",
        ))?;

        let transactions_sent = IntCounter::with_opts(Opts::new(
            "transactions_sent",
            "Signed transactions broadcast",
        ))?;

        let known_accounts =
            IntGauge::with_opts(Opts::new("known_accounts", "Size of the known account set"))?;

        let in_flight_accounts = IntGauge::with_opts(Opts::new(
            "in_flight_accounts",
            "Accounts currently owned by a handler",
        ))?;

        let active_trades = IntGauge::with_opts(Opts::new(
            "active_trades",
            "Number of trades currently in progress",
        ))?;

        let trade_latency = Histogram::with_opts(
            HistogramOpts::new("trade_latency_seconds", "Trade execution latency")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 80.0]),
        )?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "confirmation_latency_seconds",
                "Time from submission to target finality",
            )
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 30.0, 60.0]),
        )?;

        let http_latency = Histogram::with_opts(
            HistogramOpts::new("http_latency_seconds", "Swap and pool API call latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(notifications_received.clone()))?;
        registry.register(Box::new(duplicates_skipped.clone()))?;
        registry.register(Box::new(malformed_accounts.clone()))?;
        registry.register(Box::new(quick_pools_rejected.clone()))?;
        registry.register(Box::new(listings_accepted.clone()))?;
        registry.register(Box::new(listings_released.clone()))?;
        registry.register(Box::new(reconnects.clone()))?;
        registry.register(Box::new(trades_total.clone()))?;
        registry.register(Box::new(trades_success.clone()))?;
        registry.register(Box::new(trades_failed.clone()))?;
        registry.register(Box::new(simulations_total.clone()))?;
        registry.register(Box::new(slippage_retries.clone()))?;
        registry.register(Box::new(transactions_sent.clone()))?;
        registry.register(Box::new(known_accounts.clone()))?;
        registry.register(Box::new(in_flight_accounts.clone()))?;
        registry.register(Box::new(active_trades.clone()))?;
        registry.register(Box::new(trade_latency.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;
        registry.register(Box::new(http_latency.clone()))?;

        Ok(Self {
            registry,
            notifications_received,
            duplicates_skipped,
            malformed_accounts,
            quick_pools_rejected,
            listings_accepted,
            listings_released,
            reconnects,
            trades_total,
            trades_success,
            trades_failed,
            simulations_total,
            slippage_retries,
            transactions_sent,
            known_accounts,
            in_flight_accounts,
            active_trades,
            trade_latency,
            confirmation_latency,
            http_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
