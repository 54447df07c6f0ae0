//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `wallet_deposits_total` - Successful deposits
//! - `wallet_withdrawals_total` - Successful withdrawals
//! - `wallet_releases_total` - Milestone payment releases
//! - `wallet_insufficient_funds_total` - Debits rejected for insufficient balance
//! - `wallet_op_duration_seconds` - Histogram of mutation latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Successful deposits
    pub deposits_total: IntCounter,

    /// Successful withdrawals
    pub withdrawals_total: IntCounter,

    /// Milestone payment releases
    pub releases_total: IntCounter,

    /// Debits rejected for insufficient balance
    pub insufficient_funds_total: IntCounter,

    /// Mutation latency histogram
    pub op_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deposits_total = IntCounter::with_opts(Opts::new(
            "wallet_deposits_total",
            "Successful deposits",
        ))?;
        registry.register(Box::new(deposits_total.clone()))?;

        let withdrawals_total = IntCounter::with_opts(Opts::new(
            "wallet_withdrawals_total",
            "Successful withdrawals",
        ))?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let releases_total = IntCounter::with_opts(Opts::new(
            "wallet_releases_total",
            "Milestone payment releases",
        ))?;
        registry.register(Box::new(releases_total.clone()))?;

        let insufficient_funds_total = IntCounter::with_opts(Opts::new(
            "wallet_insufficient_funds_total",
            "Debits rejected for insufficient balance",
        ))?;
        registry.register(Box::new(insufficient_funds_total.clone()))?;

        let op_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_op_duration_seconds",
                "Histogram of mutation latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(op_duration.clone()))?;

        Ok(Self {
            deposits_total,
            withdrawals_total,
            releases_total,
            insufficient_funds_total,
            op_duration,
            registry,
        })
    }

    /// Record successful deposit
    pub fn record_deposit(&self, duration_seconds: f64) {
        self.deposits_total.inc();
        self.op_duration.observe(duration_seconds);
    }

    /// Record successful withdrawal
    pub fn record_withdrawal(&self, duration_seconds: f64) {
        self.withdrawals_total.inc();
        self.op_duration.observe(duration_seconds);
    }

    /// Record milestone payment release
    pub fn record_release(&self, duration_seconds: f64) {
        self.releases_total.inc();
        self.op_duration.observe(duration_seconds);
    }

    /// Record a debit rejected for insufficient balance
    pub fn record_insufficient_funds(&self) {
        self.insufficient_funds_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
