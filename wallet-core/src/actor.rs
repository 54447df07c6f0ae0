//! Actor-based concurrency for the wallet ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task owns every balance mutation
//! - The sufficiency check and the write happen inside the same message
//!   handler, so no interleaving of concurrent debits can drive a balance
//!   negative
//! - Async message passing with backpressure (bounded mailbox)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │            Request handlers (any task)                │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ WalletHandle (Clone)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              WalletActor (Single Task)                │
//! │   read fresh → check → apply → WriteBatch commit      │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//!                Storage (RocksDB)
//! ```

use crate::types::{Transaction, TransactionKind, WalletDetails, WalletRecord};
use crate::{Error, Result, Storage};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the wallet actor
pub enum WalletMessage {
    /// Credit a wallet; replies with the new balance
    Deposit {
        /// Wallet owner
        user: Uuid,
        /// Positive amount
        amount: Decimal,
        /// Ledger description
        description: String,
        /// Reply channel
        response: oneshot::Sender<Result<Decimal>>,
    },

    /// Debit a wallet; replies with the new balance
    Withdraw {
        /// Wallet owner
        user: Uuid,
        /// Positive amount to debit
        amount: Decimal,
        /// Ledger description
        description: String,
        /// Reply channel
        response: oneshot::Sender<Result<Decimal>>,
    },

    /// Move funds between two wallets as one atomic unit
    Transfer {
        /// Paying wallet
        from: Uuid,
        /// Receiving wallet
        to: Uuid,
        /// Positive amount
        amount: Decimal,
        /// Memo recorded on both ledger entries
        memo: String,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Read balance and ledger, creating the wallet if absent
    GetDetails {
        /// Wallet owner
        user: Uuid,
        /// Reply channel
        response: oneshot::Sender<Result<WalletDetails>>,
    },

    /// Shutdown actor
    Shutdown,
}

impl std::fmt::Debug for WalletMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WalletMessage::Deposit { .. } => "Deposit",
            WalletMessage::Withdraw { .. } => "Withdraw",
            WalletMessage::Transfer { .. } => "Transfer",
            WalletMessage::GetDetails { .. } => "GetDetails",
            WalletMessage::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

/// Actor that processes wallet messages
pub struct WalletActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<WalletMessage>,
}

impl WalletActor {
    /// Create new actor
    pub fn new(storage: Arc<Storage>, mailbox: mpsc::Receiver<WalletMessage>) -> Self {
        Self { storage, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                WalletMessage::Shutdown => break,
                other => self.handle_message(other),
            }
        }
    }

    /// Handle a single message.
    ///
    /// State is read fresh from storage at the top of every mutating handler;
    /// nothing is cached across messages.
    fn handle_message(&mut self, msg: WalletMessage) {
        match msg {
            WalletMessage::Deposit {
                user,
                amount,
                description,
                response,
            } => {
                let result = self.deposit(user, amount, description);
                let _ = response.send(result);
            }

            WalletMessage::Withdraw {
                user,
                amount,
                description,
                response,
            } => {
                let result = self.withdraw(user, amount, description);
                let _ = response.send(result);
            }

            WalletMessage::Transfer {
                from,
                to,
                amount,
                memo,
                response,
            } => {
                let result = self.transfer(from, to, amount, memo);
                let _ = response.send(result);
            }

            WalletMessage::GetDetails { user, response } => {
                let result = self.get_details(user);
                let _ = response.send(result);
            }

            WalletMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    fn load_or_empty(&self, user: Uuid) -> Result<WalletRecord> {
        Ok(self
            .storage
            .load_wallet(user)?
            .unwrap_or_else(|| WalletRecord::empty(user)))
    }

    fn deposit(&self, user: Uuid, amount: Decimal, description: String) -> Result<Decimal> {
        let mut record = self.load_or_empty(user)?;

        let txn = Transaction::new(amount, TransactionKind::Deposit, description);
        record.apply(&txn);
        self.storage.apply_entry(&record, &txn)?;

        Ok(record.balance)
    }

    fn withdraw(&self, user: Uuid, amount: Decimal, description: String) -> Result<Decimal> {
        let mut record = self.load_or_empty(user)?;

        if amount > record.balance {
            return Err(Error::InsufficientFunds {
                available: record.balance,
                requested: amount,
            });
        }

        // Stored as a negative amount so the ledger sum stays exact
        let txn = Transaction::new(-amount, TransactionKind::Withdrawal, description);
        record.apply(&txn);
        self.storage.apply_entry(&record, &txn)?;

        Ok(record.balance)
    }

    fn transfer(&self, from: Uuid, to: Uuid, amount: Decimal, memo: String) -> Result<()> {
        // Same wallet key twice in one batch: the credit would overwrite
        // the debit and fabricate money
        if from == to {
            return Err(Error::InvalidAmount(
                "Transfer payer and payee must differ".to_string(),
            ));
        }

        let mut payer = self.load_or_empty(from)?;

        if amount > payer.balance {
            return Err(Error::InsufficientFunds {
                available: payer.balance,
                requested: amount,
            });
        }

        let mut payee = self.load_or_empty(to)?;

        let debit = Transaction::new(
            -amount,
            TransactionKind::MilestonePaymentRelease,
            format!("Payment for: {}", memo),
        );
        let credit = Transaction::new(
            amount,
            TransactionKind::MilestonePaymentRelease,
            format!("Payment received for: {}", memo),
        );

        payer.apply(&debit);
        payee.apply(&credit);

        // Both ledger mutations commit in one batch, or neither does
        self.storage.apply_pair(&payer, &debit, &payee, &credit)?;

        Ok(())
    }

    fn get_details(&self, user: Uuid) -> Result<WalletDetails> {
        let record = match self.storage.load_wallet(user)? {
            Some(record) => record,
            None => {
                // Find-or-create: a first read materializes an empty wallet
                let record = WalletRecord::empty(user);
                self.storage.put_wallet(&record)?;
                record
            }
        };

        let mut transactions = self.storage.list_transactions(user)?;
        transactions.reverse(); // newest first

        Ok(WalletDetails {
            balance: record.balance,
            transactions,
        })
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct WalletHandle {
    sender: mpsc::Sender<WalletMessage>,
}

impl std::fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletHandle").finish_non_exhaustive()
    }
}

impl WalletHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<WalletMessage>) -> Self {
        Self { sender }
    }

    /// Credit a wallet; returns the new balance
    pub async fn deposit(
        &self,
        user: Uuid,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<Decimal> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::Deposit {
                user,
                amount,
                description: description.into(),
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Debit a wallet; returns the new balance
    pub async fn withdraw(
        &self,
        user: Uuid,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<Decimal> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::Withdraw {
                user,
                amount,
                description: description.into(),
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Atomic two-wallet transfer
    pub async fn transfer(
        &self,
        from: Uuid,
        to: Uuid,
        amount: Decimal,
        memo: impl Into<String>,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::Transfer {
                from,
                to,
                amount,
                memo: memo.into(),
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Balance and ledger, newest first
    pub async fn get_details(&self, user: Uuid) -> Result<WalletDetails> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::GetDetails { user, response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(WalletMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the wallet actor
pub fn spawn_wallet_actor(storage: Arc<Storage>, mailbox_capacity: usize) -> WalletHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = WalletActor::new(storage, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    WalletHandle::new(tx)
}
