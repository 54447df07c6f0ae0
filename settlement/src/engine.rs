//! Settlement engine facade
//!
//! Owns the milestone store and the settlement actor, and exposes the
//! operation surface: add, submit, review, list.

use crate::{
    actor::{spawn_settlement_actor, SettlementHandle},
    notify::NotificationSink,
    projects::ProjectDirectory,
    store::MilestoneStore,
    types::{Milestone, ReviewDecision},
    Config, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use wallet_core::{Caller, WalletService};

/// Main settlement engine interface
pub struct SettlementEngine {
    handle: SettlementHandle,
}

impl std::fmt::Debug for SettlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine").finish_non_exhaustive()
    }
}

impl SettlementEngine {
    /// Open the engine with configuration and its collaborators
    pub fn new(
        config: Config,
        wallet: Arc<WalletService>,
        projects: Arc<dyn ProjectDirectory>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let store = Arc::new(MilestoneStore::open(&config)?);
        let handle =
            spawn_settlement_actor(store, wallet, projects, sink, config.mailbox_capacity);

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            "Settlement engine started"
        );

        Ok(Self { handle })
    }

    /// Client adds a milestone to their project.
    ///
    /// The milestone starts in `pending` status.
    pub async fn add_milestone(
        &self,
        caller: &Caller,
        project_id: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Milestone> {
        self.handle
            .add_milestone(
                *caller,
                project_id,
                title.into(),
                description.into(),
                amount,
                due_date,
            )
            .await
    }

    /// Assigned freelancer submits a milestone for client review
    pub async fn submit(&self, caller: &Caller, milestone_id: Uuid) -> Result<Milestone> {
        self.handle.submit(*caller, milestone_id).await
    }

    /// Project client reviews a submitted milestone.
    ///
    /// Approval releases the escrow amount to the freelancer before the
    /// status changes; if the release fails, the milestone stays
    /// `submitted_for_review` and the call returns a payment error the
    /// client can retry after funding their wallet.
    pub async fn review(
        &self,
        caller: &Caller,
        milestone_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<Milestone> {
        self.handle.review(*caller, milestone_id, decision).await
    }

    /// All milestones of a project, in creation order
    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Milestone>> {
        self.handle.list_for_project(project_id).await
    }

    /// Graceful shutdown of the settlement actor
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }
}
