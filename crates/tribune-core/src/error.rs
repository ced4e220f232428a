use thiserror::Error;

use tribune_shared::{MessageId, MessageStatus, PendingMessageId, TemplateId};
use tribune_store::StoreError;

/// Errors produced by the service layer.  All of them are request-scoped and
/// recoverable; none poisons a service.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The pending message is gone: already resolved by another reviewer, or
    /// never queued.
    #[error("Pending message {0} is no longer queued")]
    PendingNotFound(PendingMessageId),

    /// No ledger message with this id.
    #[error("Message {0} not found")]
    MessageNotFound(MessageId),

    /// No template with this id.
    #[error("Template {0} not found")]
    TemplateNotFound(TemplateId),

    /// The input violates a documented precondition (blank content, missing
    /// required variables, malformed template schema, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Attempted delivery-status regression or no-op transition.
    #[error("Invalid status transition: {} -> {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: MessageStatus,
        to: MessageStatus,
    },

    /// Storage backend failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
