//! Milestone Settlement Engine
//!
//! Orchestrates the milestone-approval state machine that gates escrow
//! releases between a client and a freelancer.
//!
//! # Flow
//!
//! 1. **Submit**: the assigned freelancer marks a milestone ready for review
//! 2. **Review**: the project's client approves or requests revision
//! 3. **Settlement**: approval moves `milestone.amount` from the client's
//!    wallet to the freelancer's wallet as one atomic unit
//! 4. **Completion**: once every milestone of a project is approved, the
//!    project is marked completed
//! 5. **Notification**: a fire-and-forget event tells the freelancer the
//!    payment arrived
//!
//! # Example
//!
//! ```no_run
//! use settlement::{Config, SettlementEngine};
//! use settlement::notify::NullSink;
//! use settlement::projects::InMemoryProjectDirectory;
//! use std::sync::Arc;
//! use wallet_core::WalletService;
//!
//! #[tokio::main]
//! async fn main() -> settlement::Result<()> {
//!     let config = Config::default();
//!     let wallet = Arc::new(WalletService::open(config.wallet.clone())?);
//!     let projects = Arc::new(InMemoryProjectDirectory::new());
//!     let engine = SettlementEngine::new(config, wallet, projects, Arc::new(NullSink))?;
//!
//!     // let milestones = engine.list_for_project(project_id).await?;
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod store;
pub mod projects;
pub mod notify;
pub mod error;
pub mod config;
pub mod actor;
pub mod engine;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Milestone, MilestoneStatus, ProjectRecord, ProjectStatus, ReviewDecision,
};
pub use config::Config;
pub use engine::SettlementEngine;
