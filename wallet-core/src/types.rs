//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for money)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Marketplace role attached to an authenticated caller.
///
/// Supplied per request by the identity collaborator; never inferred here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Posts projects and funds milestones
    Client,
    /// Delivers milestones and withdraws earnings
    Freelancer,
}

impl Role {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Freelancer => "freelancer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authenticated caller identity, as handed over by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// User ID
    pub user_id: Uuid,
    /// Role granted to this session
    pub role: Role,
}

impl Caller {
    /// Create a caller
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Kind of ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    /// Client funding their wallet
    Deposit = 1,
    /// Freelancer cashing out
    Withdrawal = 2,
    /// Escrow release on milestone approval (negative on payer, positive on payee)
    MilestonePaymentRelease = 3,
    /// Reversal of a release (dispute flow)
    MilestonePaymentRefund = 4,
}

impl TransactionKind {
    /// Snake-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::MilestonePaymentRelease => "milestone_payment_release",
            TransactionKind::MilestonePaymentRefund => "milestone_payment_refund",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single immutable ledger entry.
///
/// Signed amount: positive = credit, negative = debit. Once appended a
/// transaction is never modified or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Signed amount (exact decimal)
    pub amount: Decimal,

    /// Transaction kind
    pub kind: TransactionKind,

    /// Free-text description (e.g. milestone title)
    pub description: String,

    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a transaction stamped now
    pub fn new(amount: Decimal, kind: TransactionKind, description: impl Into<String>) -> Self {
        Self {
            amount,
            kind,
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Durable per-user wallet record.
///
/// `tx_count` is both the ledger length and the next transaction sequence
/// number; the storage layer keys transactions by `owner || seq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    /// Owning user
    pub owner: Uuid,

    /// Current balance; never negative
    pub balance: Decimal,

    /// Number of ledger entries appended so far
    pub tx_count: u64,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl WalletRecord {
    /// Fresh zero-balance wallet for `owner`
    pub fn empty(owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            owner,
            balance: Decimal::ZERO,
            tx_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply one ledger entry: adjust balance, bump sequence, touch timestamp.
    ///
    /// Callers must have verified sufficiency for debits beforehand.
    pub fn apply(&mut self, txn: &Transaction) {
        self.balance += txn.amount;
        self.tx_count += 1;
        self.updated_at = txn.timestamp;
    }
}

/// Read model returned by the wallet-details operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletDetails {
    /// Current balance
    pub balance: Decimal,

    /// Full ledger, newest first
    pub transactions: Vec<Transaction>,
}
