//! Escrow Rail Wallet Core
//!
//! Per-user monetary balances backed by an append-only transaction ledger.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor task owns every balance mutation, so the
//!   sufficiency check and the write can never interleave with another request
//! - **Append-only ledger**: transactions are never edited or deleted
//! - **Atomic double entry**: a transfer commits both wallet mutations in one
//!   storage batch, or neither
//!
//! # Invariants
//!
//! - `balance == Σ(transactions.amount)` for every wallet, at all times
//! - `balance >= 0` always; overdraws are rejected before any write

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod storage;
pub mod wallet;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Caller, Role, Transaction, TransactionKind, WalletDetails, WalletRecord,
};
pub use wallet::WalletService;
pub use storage::Storage;
pub use config::Config;
