//! # tribune-shared
//!
//! Domain types shared by every Tribune crate: message templates and the
//! variable-substitution renderer, the pending-message moderation model,
//! the delivery-ledger message model, and the validation audit records.
//!
//! Everything in here is pure data and pure functions.  No I/O, no async,
//! no storage; those live in `tribune-store` and `tribune-core`.

pub mod audit;
pub mod message;
pub mod pending;
pub mod template;
pub mod types;

pub use audit::{AuditAction, AuditRecord};
pub use message::{ChatMessage, MessageKind, MessageReaction, MessageStatus};
pub use pending::{
    MetadataPatch, NewPendingMessage, PendingFilter, PendingMessage, PendingSort, PendingSource,
    Priority, ValidationAction,
};
pub use template::{
    MessageTemplate, NewTemplate, RenderOutcome, TemplateFilter, TemplateSort, TemplateUpdate,
    TemplateVariable, VariableKind,
};
pub use types::{ConversationId, MessageId, PendingMessageId, TemplateId, UserId};
