//! Backend-neutral storage traits.
//!
//! All methods are synchronous and must not block on anything slower than
//! local disk; the async services in `tribune-core` call them directly.
//! Implementations must be `Send + Sync` so a single store instance can sit
//! behind several `Arc<dyn ...>` handles at once.

use tribune_shared::{
    AuditRecord, ChatMessage, MessageReaction, MessageStatus, MessageTemplate, PendingFilter,
    PendingMessage, PendingSort, TemplateFilter, TemplateSort,
};
use tribune_shared::{MessageId, PendingMessageId, TemplateId, UserId};

use crate::error::Result;

/// Template catalog persistence.
pub trait TemplateStore: Send + Sync {
    /// Insert a new template.
    fn insert_template(&self, template: &MessageTemplate) -> Result<()>;

    /// Fetch a template by id, active or not.
    fn get_template(&self, id: TemplateId) -> Result<MessageTemplate>;

    /// Replace a stored template wholesale.
    fn put_template(&self, template: &MessageTemplate) -> Result<()>;

    /// Delete a template.  Returns `true` if a row was deleted.
    fn remove_template(&self, id: TemplateId) -> Result<bool>;

    /// List templates matching `filter`, ordered by `sort`.
    fn list_templates(
        &self,
        filter: &TemplateFilter,
        sort: TemplateSort,
    ) -> Result<Vec<MessageTemplate>>;
}

/// Moderation queue persistence.
pub trait PendingStore: Send + Sync {
    /// Insert a new queue entry.
    fn insert_pending(&self, message: &PendingMessage) -> Result<()>;

    /// Fetch a queue entry by id.
    fn get_pending(&self, id: PendingMessageId) -> Result<PendingMessage>;

    /// Replace a queue entry wholesale (edits).
    fn put_pending(&self, message: &PendingMessage) -> Result<()>;

    /// Atomically remove and return the entry, or `None` if it is no longer
    /// queued.  This is the single point that decides races between
    /// concurrent resolutions: exactly one caller gets the entry.
    fn take_pending(&self, id: PendingMessageId) -> Result<Option<PendingMessage>>;

    /// List queue entries matching `filter`, ordered by `sort`.
    fn list_pending(&self, filter: &PendingFilter, sort: PendingSort)
        -> Result<Vec<PendingMessage>>;
}

/// Delivery ledger persistence.  The ledger is append-only: after the append
/// only `status` and the reaction set may change.
pub trait LedgerStore: Send + Sync {
    /// Append a message to the ledger.
    fn append_message(&self, message: &ChatMessage) -> Result<()>;

    /// Fetch a message, reactions included.
    fn get_message(&self, id: MessageId) -> Result<ChatMessage>;

    /// Overwrite the delivery status.  Transition legality is the caller's
    /// responsibility.
    fn set_message_status(&self, id: MessageId, status: MessageStatus) -> Result<()>;

    /// Record a reaction.  Duplicate (message, user, emoji) triples are
    /// ignored.
    fn add_reaction(&self, id: MessageId, reaction: &MessageReaction) -> Result<()>;

    /// Remove a reaction.  Returns `true` if one existed.
    fn remove_reaction(&self, id: MessageId, user_id: &UserId, emoji: &str) -> Result<bool>;

    /// Page through the ledger in timestamp order (oldest first, stable
    /// tiebreak on insertion order).
    fn list_messages(&self, limit: u32, offset: u32) -> Result<Vec<ChatMessage>>;
}

/// Validation audit-trail persistence.  Append-only.
pub trait AuditStore: Send + Sync {
    /// Append an audit record.
    fn record_audit(&self, record: &AuditRecord) -> Result<()>;

    /// All records for one pending message, oldest first.
    fn list_audit_for(&self, pending_id: PendingMessageId) -> Result<Vec<AuditRecord>>;
}
