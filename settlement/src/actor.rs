//! Settlement actor
//!
//! All milestone mutations flow through one actor task, so every
//! check-then-write (submit guard, review guard, sufficiency-gated release)
//! runs as an atomic step. Two racing approvals of the same milestone are
//! handled one after the other; the loser sees `Approved` and gets an
//! invalid-transition error instead of a second payment.

use crate::{
    error::{Error, Result},
    notify::{Notification, NotificationKind, NotificationSink},
    projects::ProjectDirectory,
    store::MilestoneStore,
    types::{Milestone, MilestoneStatus, ReviewDecision},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;
use wallet_core::{Caller, Role, WalletService};

/// Messages the settlement actor processes
pub enum SettlementMessage {
    /// Create a milestone under a project
    AddMilestone {
        /// Requesting user
        caller: Caller,
        /// Owning project
        project_id: Uuid,
        /// Milestone title
        title: String,
        /// Milestone description
        description: String,
        /// Escrow amount released on approval
        amount: Decimal,
        /// Optional due date
        due_date: Option<DateTime<Utc>>,
        /// Response channel
        response: oneshot::Sender<Result<Milestone>>,
    },
    /// Freelancer submits a milestone for review
    Submit {
        /// Requesting user
        caller: Caller,
        /// Milestone to submit
        milestone_id: Uuid,
        /// Response channel
        response: oneshot::Sender<Result<Milestone>>,
    },
    /// Client reviews a submitted milestone
    Review {
        /// Requesting user
        caller: Caller,
        /// Milestone under review
        milestone_id: Uuid,
        /// Approve or request revision
        decision: ReviewDecision,
        /// Response channel
        response: oneshot::Sender<Result<Milestone>>,
    },
    /// List a project's milestones in creation order
    ListForProject {
        /// Project to list
        project_id: Uuid,
        /// Response channel
        response: oneshot::Sender<Result<Vec<Milestone>>>,
    },
    /// Graceful shutdown
    Shutdown,
}

impl std::fmt::Debug for SettlementMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementMessage::AddMilestone {
                project_id, title, ..
            } => f
                .debug_struct("AddMilestone")
                .field("project_id", project_id)
                .field("title", title)
                .finish_non_exhaustive(),
            SettlementMessage::Submit { milestone_id, .. } => f
                .debug_struct("Submit")
                .field("milestone_id", milestone_id)
                .finish_non_exhaustive(),
            SettlementMessage::Review {
                milestone_id,
                decision,
                ..
            } => f
                .debug_struct("Review")
                .field("milestone_id", milestone_id)
                .field("decision", decision)
                .finish_non_exhaustive(),
            SettlementMessage::ListForProject { project_id, .. } => f
                .debug_struct("ListForProject")
                .field("project_id", project_id)
                .finish_non_exhaustive(),
            SettlementMessage::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Single-writer actor over the milestone store
pub struct SettlementActor {
    store: Arc<MilestoneStore>,
    wallet: Arc<WalletService>,
    projects: Arc<dyn ProjectDirectory>,
    sink: Arc<dyn NotificationSink>,
    mailbox: mpsc::Receiver<SettlementMessage>,
}

impl std::fmt::Debug for SettlementActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementActor").finish_non_exhaustive()
    }
}

impl SettlementActor {
    /// Process messages until shutdown
    pub async fn run(mut self) {
        tracing::info!("Settlement actor started");

        while let Some(message) = self.mailbox.recv().await {
            if matches!(message, SettlementMessage::Shutdown) {
                tracing::info!("Settlement actor shutting down");
                break;
            }
            self.handle_message(message).await;
        }

        tracing::info!("Settlement actor stopped");
    }

    async fn handle_message(&mut self, message: SettlementMessage) {
        match message {
            SettlementMessage::AddMilestone {
                caller,
                project_id,
                title,
                description,
                amount,
                due_date,
                response,
            } => {
                let result =
                    self.add_milestone(&caller, project_id, title, description, amount, due_date);
                let _ = response.send(result);
            }
            SettlementMessage::Submit {
                caller,
                milestone_id,
                response,
            } => {
                let result = self.submit(&caller, milestone_id);
                let _ = response.send(result);
            }
            SettlementMessage::Review {
                caller,
                milestone_id,
                decision,
                response,
            } => {
                let result = self.review(&caller, milestone_id, decision).await;
                let _ = response.send(result);
            }
            SettlementMessage::ListForProject {
                project_id,
                response,
            } => {
                let _ = response.send(self.store.list_for_project(project_id));
            }
            SettlementMessage::Shutdown => unreachable!("handled in run loop"),
        }
    }

    fn add_milestone(
        &self,
        caller: &Caller,
        project_id: Uuid,
        title: String,
        description: String,
        amount: Decimal,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Milestone> {
        let project = self
            .projects
            .get(project_id)?
            .ok_or_else(|| Error::NotFound(format!("Project {} not found", project_id)))?;

        if caller.role != Role::Client || caller.user_id != project.client {
            return Err(Error::Forbidden(
                "Only the project client may add milestones".to_string(),
            ));
        }

        if amount <= Decimal::ZERO {
            return Err(Error::Wallet(wallet_core::Error::InvalidAmount(
                "Milestone amount must be positive".to_string(),
            )));
        }

        let milestone = Milestone::new(project_id, title, description, amount, due_date);
        self.store.insert(&milestone)?;

        tracing::info!(
            milestone_id = %milestone.milestone_id,
            project_id = %project_id,
            amount = %amount,
            "Milestone added"
        );

        Ok(milestone)
    }

    fn submit(&self, caller: &Caller, milestone_id: Uuid) -> Result<Milestone> {
        let mut milestone = self
            .store
            .get(milestone_id)?
            .ok_or_else(|| Error::NotFound(format!("Milestone {} not found", milestone_id)))?;

        let project = self.load_project(&milestone)?;

        let freelancer = project.freelancer.ok_or_else(|| {
            Error::Forbidden("Project has no assigned freelancer".to_string())
        })?;

        if caller.role != Role::Freelancer || caller.user_id != freelancer {
            return Err(Error::Forbidden(
                "Only the assigned freelancer may submit this milestone".to_string(),
            ));
        }

        if !milestone.status.can_submit() {
            return Err(Error::InvalidTransition {
                from: milestone.status,
                action: "submit",
            });
        }

        milestone.set_status(MilestoneStatus::SubmittedForReview);
        self.store.put(&milestone)?;

        tracing::info!(
            milestone_id = %milestone_id,
            "Milestone submitted for review"
        );

        self.sink.send(Notification::new(
            project.client,
            NotificationKind::MilestoneUpdate,
            format!("Milestone '{}' was submitted for review", milestone.title),
            milestone.project_id,
        ));

        Ok(milestone)
    }

    async fn review(
        &self,
        caller: &Caller,
        milestone_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<Milestone> {
        let mut milestone = self
            .store
            .get(milestone_id)?
            .ok_or_else(|| Error::NotFound(format!("Milestone {} not found", milestone_id)))?;

        let project = self.load_project(&milestone)?;

        if caller.role != Role::Client || caller.user_id != project.client {
            return Err(Error::Forbidden(
                "Only the project client may review this milestone".to_string(),
            ));
        }

        if milestone.status != MilestoneStatus::SubmittedForReview {
            return Err(Error::InvalidTransition {
                from: milestone.status,
                action: "review",
            });
        }

        match decision {
            ReviewDecision::Approved => {
                let freelancer = project.freelancer.ok_or_else(|| {
                    Error::Forbidden("Project has no assigned freelancer".to_string())
                })?;

                // Payment first. If the release fails the milestone stays
                // submitted and the client can retry after funding.
                self.wallet
                    .transfer(project.client, freelancer, milestone.amount, &milestone.title)
                    .await
                    .map_err(|e| Error::PaymentFailed(e.to_string()))?;

                milestone.set_status(MilestoneStatus::Approved);
                if let Err(e) = self.store.put(&milestone) {
                    // The transfer is already durable; a retry would release
                    // a second payment. Flag for manual reconciliation.
                    tracing::error!(
                        milestone_id = %milestone_id,
                        amount = %milestone.amount,
                        error = %e,
                        "Payment settled but approved status write failed"
                    );
                    return Err(e);
                }

                tracing::info!(
                    milestone_id = %milestone_id,
                    amount = %milestone.amount,
                    "Milestone approved, payment released"
                );

                self.maybe_complete_project(&milestone);

                self.sink.send(Notification::new(
                    freelancer,
                    NotificationKind::PaymentReceived,
                    format!(
                        "You received a payment of ${} for milestone '{}'",
                        milestone.amount, milestone.title
                    ),
                    milestone.project_id,
                ));
            }
            ReviewDecision::RevisionRequested => {
                milestone.set_status(MilestoneStatus::RevisionRequested);
                self.store.put(&milestone)?;

                tracing::info!(
                    milestone_id = %milestone_id,
                    "Revision requested"
                );

                if let Some(freelancer) = project.freelancer {
                    self.sink.send(Notification::new(
                        freelancer,
                        NotificationKind::MilestoneUpdate,
                        format!("Revision requested for milestone '{}'", milestone.title),
                        milestone.project_id,
                    ));
                }
            }
        }

        Ok(milestone)
    }

    fn load_project(&self, milestone: &Milestone) -> Result<crate::types::ProjectRecord> {
        match self.projects.get(milestone.project_id)? {
            Some(project) => Ok(project),
            None => {
                tracing::error!(
                    milestone_id = %milestone.milestone_id,
                    project_id = %milestone.project_id,
                    "Milestone references a missing project"
                );
                Err(Error::NotFound(format!(
                    "Project {} not found",
                    milestone.project_id
                )))
            }
        }
    }

    /// Mark the project completed when the last milestone is approved.
    ///
    /// The payment has already settled at this point, so a directory failure
    /// is logged rather than surfaced to the client.
    fn maybe_complete_project(&self, milestone: &Milestone) {
        let all_approved = match self.store.list_for_project(milestone.project_id) {
            Ok(milestones) => milestones
                .iter()
                .all(|m| m.status == MilestoneStatus::Approved),
            Err(e) => {
                tracing::error!(
                    project_id = %milestone.project_id,
                    error = %e,
                    "Failed to list milestones for completion check"
                );
                return;
            }
        };

        if !all_approved {
            return;
        }

        match self.projects.mark_completed(milestone.project_id) {
            Ok(()) => {
                tracing::info!(
                    project_id = %milestone.project_id,
                    "All milestones approved, project completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    project_id = %milestone.project_id,
                    error = %e,
                    "Payment settled but project completion failed"
                );
            }
        }
    }
}

/// Handle for sending messages to the settlement actor
#[derive(Clone)]
pub struct SettlementHandle {
    sender: mpsc::Sender<SettlementMessage>,
}

impl std::fmt::Debug for SettlementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementHandle").finish_non_exhaustive()
    }
}

impl SettlementHandle {
    /// Create a milestone
    pub async fn add_milestone(
        &self,
        caller: Caller,
        project_id: Uuid,
        title: String,
        description: String,
        amount: Decimal,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Milestone> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(SettlementMessage::AddMilestone {
                caller,
                project_id,
                title,
                description,
                amount,
                due_date,
                response,
            })
            .await
            .map_err(|_| Error::Concurrency("Settlement actor unavailable".to_string()))?;
        receiver
            .await
            .map_err(|_| Error::Concurrency("Settlement actor dropped response".to_string()))?
    }

    /// Submit a milestone for review
    pub async fn submit(&self, caller: Caller, milestone_id: Uuid) -> Result<Milestone> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(SettlementMessage::Submit {
                caller,
                milestone_id,
                response,
            })
            .await
            .map_err(|_| Error::Concurrency("Settlement actor unavailable".to_string()))?;
        receiver
            .await
            .map_err(|_| Error::Concurrency("Settlement actor dropped response".to_string()))?
    }

    /// Review a submitted milestone
    pub async fn review(
        &self,
        caller: Caller,
        milestone_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<Milestone> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(SettlementMessage::Review {
                caller,
                milestone_id,
                decision,
                response,
            })
            .await
            .map_err(|_| Error::Concurrency("Settlement actor unavailable".to_string()))?;
        receiver
            .await
            .map_err(|_| Error::Concurrency("Settlement actor dropped response".to_string()))?
    }

    /// List a project's milestones
    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Milestone>> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(SettlementMessage::ListForProject {
                project_id,
                response,
            })
            .await
            .map_err(|_| Error::Concurrency("Settlement actor unavailable".to_string()))?;
        receiver
            .await
            .map_err(|_| Error::Concurrency("Settlement actor dropped response".to_string()))?
    }

    /// Request graceful shutdown
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SettlementMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Settlement actor unavailable".to_string()))
    }
}

/// Spawn the settlement actor and return its handle
pub fn spawn_settlement_actor(
    store: Arc<MilestoneStore>,
    wallet: Arc<WalletService>,
    projects: Arc<dyn ProjectDirectory>,
    sink: Arc<dyn NotificationSink>,
    mailbox_capacity: usize,
) -> SettlementHandle {
    let (sender, mailbox) = mpsc::channel(mailbox_capacity);

    let actor = SettlementActor {
        store,
        wallet,
        projects,
        sink,
        mailbox,
    };

    tokio::spawn(actor.run());

    SettlementHandle { sender }
}
