//! Notification model.

use serde::{Deserialize, Serialize};

/// What triggered a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationKind {
    /// A physician sent the user an assignment request
    AssignmentRequest,
    /// The user's assignment request was decided
    AssignmentDecision,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AssignmentRequest => "assignment_request",
            NotificationKind::AssignmentDecision => "assignment_decision",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assignment_request" => Some(NotificationKind::AssignmentRequest),
            "assignment_decision" => Some(NotificationKind::AssignmentDecision),
            _ => None,
        }
    }
}

/// An in-app notification for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Unique notification id
    pub id: String,
    /// Recipient user id
    pub user_id: String,
    /// Kind of event
    pub kind: NotificationKind,
    /// Human-readable message
    pub message: String,
    /// Whether the user has seen it
    pub read: bool,
    /// Creation timestamp
    pub created_at: String,
}

impl Notification {
    /// Create an unread notification.
    pub fn new(user_id: String, kind: NotificationKind, message: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            kind,
            message,
            read: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
