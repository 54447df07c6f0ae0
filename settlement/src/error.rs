//! Error types for the settlement engine

use crate::types::MilestoneStatus;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Wallet error
    #[error("Wallet error: {0}")]
    Wallet(#[from] wallet_core::Error),

    /// Referenced milestone or project is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not the project's client/freelancer, or no freelancer assigned
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Requested state change is not legal from the current status
    #[error("Invalid transition: cannot {action} a milestone in status {from}")]
    InvalidTransition {
        /// Status the milestone was in
        from: MilestoneStatus,
        /// Operation that was attempted
        action: &'static str,
    },

    /// Escrow release failed during approval; milestone status unchanged
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
