//! Append-only audit records of resolved validation actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{MessageId, PendingMessageId, UserId};

/// Outcome archived for a validation action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum AuditAction {
    /// The message was published; `message_id` is its ledger entry.
    #[serde(rename_all = "camelCase")]
    Approved { message_id: MessageId },
    /// The message was dropped with the reviewer's reason (possibly empty).
    Rejected { reason: String },
    /// Content or metadata was revised; the message stayed pending.
    Edited,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Approved { .. } => "approved",
            AuditAction::Rejected { .. } => "rejected",
            AuditAction::Edited => "edited",
        }
    }
}

/// One entry in the validation audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// The pending message the action applied to.
    pub pending_id: PendingMessageId,
    /// What the reviewer did.
    pub action: AuditAction,
    /// Who did it.
    pub reviewer: UserId,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(pending_id: PendingMessageId, action: AuditAction, reviewer: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            pending_id,
            action,
            reviewer,
            recorded_at: Utc::now(),
        }
    }
}
