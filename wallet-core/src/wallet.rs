//! Wallet service facade
//!
//! Ties together storage, the single-writer actor, and metrics into the
//! high-level API: deposit, withdraw, details, and the internal transfer
//! used by milestone settlement.
//!
//! # Example
//!
//! ```no_run
//! use wallet_core::{Caller, Config, Role, WalletService};
//! use rust_decimal::Decimal;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let service = WalletService::open(Config::default())?;
//!
//!     let client = Caller::new(Uuid::new_v4(), Role::Client);
//!     let balance = service.deposit(&client, Decimal::from(500)).await?;
//!     assert_eq!(balance, Decimal::from(500));
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_wallet_actor, WalletHandle},
    metrics::Metrics,
    types::{Caller, Role, WalletDetails},
    Config, Error, Result, Storage,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Main wallet service interface
#[derive(Debug)]
pub struct WalletService {
    /// Actor handle for serialized mutation
    handle: WalletHandle,

    /// Direct storage access (for invariant checks)
    storage: Arc<Storage>,

    /// Prometheus metrics
    metrics: Metrics,
}

impl WalletService {
    /// Open the service with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let handle = spawn_wallet_actor(storage.clone(), config.mailbox_capacity);
        let metrics = Metrics::new()
            .map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;

        Ok(Self {
            handle,
            storage,
            metrics,
        })
    }

    /// Client deposits funds into their own wallet.
    ///
    /// Returns the new balance. Only the `client` role may deposit.
    pub async fn deposit(&self, caller: &Caller, amount: Decimal) -> Result<Decimal> {
        if caller.role != Role::Client {
            return Err(Error::Forbidden(
                "Only clients can deposit funds".to_string(),
            ));
        }
        Self::validate_amount(amount)?;

        let start = Instant::now();
        let balance = self
            .handle
            .deposit(caller.user_id, amount, "Client fund deposit")
            .await?;

        self.metrics.record_deposit(start.elapsed().as_secs_f64());

        tracing::info!(user = %caller.user_id, %amount, %balance, "Deposit complete");

        Ok(balance)
    }

    /// Freelancer withdraws funds from their own wallet.
    ///
    /// Returns the new balance. Fails with `InsufficientFunds` (no mutation)
    /// if the amount exceeds the balance.
    pub async fn withdraw(&self, caller: &Caller, amount: Decimal) -> Result<Decimal> {
        if caller.role != Role::Freelancer {
            return Err(Error::Forbidden(
                "Only freelancers can withdraw funds".to_string(),
            ));
        }
        Self::validate_amount(amount)?;

        let start = Instant::now();
        let result = self
            .handle
            .withdraw(caller.user_id, amount, "Freelancer fund withdrawal")
            .await;

        match &result {
            Ok(balance) => {
                self.metrics.record_withdrawal(start.elapsed().as_secs_f64());
                tracing::info!(user = %caller.user_id, %amount, %balance, "Withdrawal complete");
            }
            Err(Error::InsufficientFunds { available, .. }) => {
                self.metrics.record_insufficient_funds();
                tracing::warn!(user = %caller.user_id, %amount, %available, "Withdrawal rejected");
            }
            Err(_) => {}
        }

        result
    }

    /// Balance and full ledger (newest first) for a user.
    ///
    /// Creates an empty wallet on first read instead of failing.
    pub async fn details(&self, user: Uuid) -> Result<WalletDetails> {
        self.handle.get_details(user).await
    }

    /// Move funds between two users' wallets as one atomic unit.
    ///
    /// Not part of the request boundary: invoked solely by the settlement
    /// engine on milestone approval. Appends a `milestone_payment_release`
    /// pair (debit on the payer, credit on the payee) carrying `memo`.
    /// `InsufficientFunds` leaves both wallets untouched.
    pub async fn transfer(
        &self,
        from: Uuid,
        to: Uuid,
        amount: Decimal,
        memo: &str,
    ) -> Result<()> {
        Self::validate_amount(amount)?;
        if from == to {
            return Err(Error::InvalidAmount(
                "Transfer payer and payee must differ".to_string(),
            ));
        }

        let start = Instant::now();
        let result = self.handle.transfer(from, to, amount, memo).await;

        match &result {
            Ok(()) => {
                self.metrics.record_release(start.elapsed().as_secs_f64());
                tracing::info!(%from, %to, %amount, memo, "Milestone payment released");
            }
            Err(Error::InsufficientFunds { available, .. }) => {
                self.metrics.record_insufficient_funds();
                tracing::warn!(%from, %amount, %available, "Release rejected");
            }
            Err(_) => {}
        }

        result
    }

    /// Check the ledger-sum invariant for one wallet
    pub fn verify_ledger(&self, user: Uuid) -> Result<bool> {
        self.storage.verify_ledger(user)
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown service
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }

    fn validate_amount(amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "Amount must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}
