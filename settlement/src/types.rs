//! Core types for the settlement engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Milestone review status.
///
/// `Approved` is terminal: once a milestone is approved no further mutation
/// is permitted, which is what makes payment release idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MilestoneStatus {
    /// Created, not started
    Pending = 1,
    /// Work underway
    InProgress = 2,
    /// Freelancer submitted work for client review
    SubmittedForReview = 3,
    /// Client approved; payment released (terminal)
    Approved = 4,
    /// Client asked for changes
    RevisionRequested = 5,
}

impl MilestoneStatus {
    /// Snake-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::SubmittedForReview => "submitted_for_review",
            MilestoneStatus::Approved => "approved",
            MilestoneStatus::RevisionRequested => "revision_requested",
        }
    }

    /// Whether a freelancer may submit from this status
    pub fn can_submit(&self) -> bool {
        matches!(
            self,
            MilestoneStatus::Pending
                | MilestoneStatus::InProgress
                | MilestoneStatus::RevisionRequested
        )
    }

    /// Whether this status permits no further mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, MilestoneStatus::Approved)
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client's verdict on a submitted milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    /// Release payment and close the milestone
    Approved,
    /// Send the milestone back for changes
    RevisionRequested,
}

impl ReviewDecision {
    /// Snake-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::RevisionRequested => "revision_requested",
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payable sub-deliverable of a project, gated by the review state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique milestone ID (UUIDv7 for time-ordering)
    pub milestone_id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Short title; doubles as the payment memo
    pub title: String,

    /// What the deliverable is
    pub description: String,

    /// Escrow amount released on approval (always positive)
    pub amount: Decimal,

    /// Current review status
    pub status: MilestoneStatus,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Milestone {
    /// Create a new pending milestone
    pub fn new(
        project_id: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
        due_date: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            milestone_id: Uuid::now_v7(),
            project_id,
            title: title.into(),
            description: description.into(),
            amount,
            status: MilestoneStatus::Pending,
            due_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to a new status and touch the update timestamp
    pub fn set_status(&mut self, status: MilestoneStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Project lifecycle status.
///
/// The settlement engine writes only the `Completed` transition; every other
/// transition belongs to the project collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProjectStatus {
    /// Accepting proposals
    Open = 1,
    /// Freelancer assigned, work underway
    InProgress = 2,
    /// Every milestone approved
    Completed = 3,
    /// Under dispute
    Disputed = 4,
}

impl ProjectStatus {
    /// Snake-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Open => "open",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Disputed => "disputed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Project view consumed from the project collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project ID
    pub project_id: Uuid,

    /// Owning client
    pub client: Uuid,

    /// Assigned freelancer; `None` until a proposal is accepted
    pub freelancer: Option<Uuid>,

    /// Current status
    pub status: ProjectStatus,
}

impl ProjectRecord {
    /// Project with an assigned freelancer, work underway
    pub fn assigned(project_id: Uuid, client: Uuid, freelancer: Uuid) -> Self {
        Self {
            project_id,
            client,
            freelancer: Some(freelancer),
            status: ProjectStatus::InProgress,
        }
    }

    /// Open project with no freelancer yet
    pub fn open(project_id: Uuid, client: Uuid) -> Self {
        Self {
            project_id,
            client,
            freelancer: None,
            status: ProjectStatus::Open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_submit_guard() {
        assert!(MilestoneStatus::Pending.can_submit());
        assert!(MilestoneStatus::InProgress.can_submit());
        assert!(MilestoneStatus::RevisionRequested.can_submit());
        assert!(!MilestoneStatus::SubmittedForReview.can_submit());
        assert!(!MilestoneStatus::Approved.can_submit());
    }

    #[test]
    fn test_approved_is_terminal() {
        assert!(MilestoneStatus::Approved.is_terminal());
        assert!(!MilestoneStatus::RevisionRequested.is_terminal());
    }

    #[test]
    fn test_milestone_ids_are_time_ordered() {
        let project_id = Uuid::new_v4();
        let first = Milestone::new(project_id, "one", "first", dec!(100.00), None);
        let second = Milestone::new(project_id, "two", "second", dec!(100.00), None);
        assert!(first.milestone_id < second.milestone_id);
    }

    #[test]
    fn test_set_status_touches_timestamp() {
        let mut milestone =
            Milestone::new(Uuid::new_v4(), "one", "first", dec!(100.00), None);
        let before = milestone.updated_at;
        milestone.set_status(MilestoneStatus::SubmittedForReview);
        assert_eq!(milestone.status, MilestoneStatus::SubmittedForReview);
        assert!(milestone.updated_at >= before);
    }
}
