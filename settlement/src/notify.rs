//! Outbound notifications
//!
//! Notifications are fire-and-forget: settlement never fails because a
//! notification could not be delivered. [`ChannelSink`] drops on a full
//! buffer with a warning instead of blocking the settlement actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Escrow release landed in the recipient's wallet
    PaymentReceived,
    /// A milestone changed state and needs the recipient's attention
    MilestoneUpdate,
}

impl NotificationKind {
    /// Snake-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::MilestoneUpdate => "milestone_update",
        }
    }
}

/// A single user-facing event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification ID
    pub notification_id: Uuid,

    /// User this notification is for
    pub recipient: Uuid,

    /// Event kind
    pub kind: NotificationKind,

    /// Human-readable message
    pub message: String,

    /// Project the event belongs to
    pub project_id: Uuid,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build a notification for a recipient
    pub fn new(
        recipient: Uuid,
        kind: NotificationKind,
        message: impl Into<String>,
        project_id: Uuid,
    ) -> Self {
        Self {
            notification_id: Uuid::new_v4(),
            recipient,
            kind,
            message: message.into(),
            project_id,
            created_at: Utc::now(),
        }
    }
}

/// Delivery seam for notifications
pub trait NotificationSink: Send + Sync {
    /// Deliver a notification; must not block and must not fail the caller
    fn send(&self, notification: Notification);
}

/// Bounded-channel sink for in-process consumers
#[derive(Debug)]
pub struct ChannelSink {
    sender: mpsc::Sender<Notification>,
}

impl ChannelSink {
    /// Create a sink and the receiving half, with the given buffer size
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn send(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(
                    recipient = %n.recipient,
                    kind = n.kind.as_str(),
                    "Notification buffer full, dropping notification"
                );
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                tracing::warn!(
                    recipient = %n.recipient,
                    kind = n.kind.as_str(),
                    "Notification receiver gone, dropping notification"
                );
            }
        }
    }
}

/// Sink that discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn send(&self, _notification: Notification) {}
}
