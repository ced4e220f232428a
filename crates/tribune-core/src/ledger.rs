//! The delivery ledger: published messages, their status lifecycle, and
//! reactions.
//!
//! Status only moves forward (sending, sent, delivered, read); skipping
//! intermediate states is allowed, repeating or going back is not.  Reaction
//! toggles and status changes for one message run under that message's
//! entity lock, so concurrent toggles of the same reaction settle on a
//! definite end state.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use tribune_shared::{
    ChatMessage, MessageId, MessageKind, MessageReaction, MessageStatus, TemplateId, UserId,
};
use tribune_store::{LedgerStore, StoreError};

use crate::error::{CoreError, Result};
use crate::locks::EntityLocks;

/// Fields supplied when publishing a message directly, without passing
/// through the moderation queue.
#[derive(Debug, Clone)]
pub struct NewDirectMessage {
    pub sender: UserId,
    pub content: String,
    /// Origin class.  `None` means infer it: template when `template_id` is
    /// set, text otherwise.
    pub kind: Option<MessageKind>,
    pub template_id: Option<TemplateId>,
    pub reply_to: Option<MessageId>,
}

pub struct DeliveryLedger {
    store: Arc<dyn LedgerStore>,
    locks: EntityLocks<MessageId>,
}

impl DeliveryLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            locks: EntityLocks::new(),
        }
    }

    /// Publish an already-validated message.
    pub fn send_direct(&self, new: NewDirectMessage) -> Result<ChatMessage> {
        if new.content.trim().is_empty() {
            return Err(CoreError::Validation("message content is empty".to_string()));
        }
        let kind = resolve_kind(new.kind, new.template_id)?;

        let message = ChatMessage {
            id: MessageId::new(),
            sender_id: new.sender,
            content: new.content,
            timestamp: Utc::now(),
            kind,
            status: MessageStatus::Sending,
            reply_to: new.reply_to,
            reactions: Vec::new(),
            template_id: new.template_id,
            validated_by: None,
            validated_at: None,
        };

        self.store.append_message(&message)?;
        info!(
            message_id = %message.id,
            sender = %message.sender_id,
            kind = %message.kind.as_str(),
            "message appended to ledger"
        );
        Ok(message)
    }

    pub fn get(&self, id: MessageId) -> Result<ChatMessage> {
        self.store.get_message(id).map_err(|e| not_found(id, e))
    }

    /// Ledger page, oldest first.
    pub fn list(&self, limit: u32, offset: u32) -> Result<Vec<ChatMessage>> {
        Ok(self.store.list_messages(limit, offset)?)
    }

    /// Advance a message's delivery status.  Returns the updated message.
    pub async fn advance_status(&self, id: MessageId, next: MessageStatus) -> Result<ChatMessage> {
        let _guard = self.locks.acquire(&id).await;

        let mut message = self.store.get_message(id).map_err(|e| not_found(id, e))?;
        if !message.status.can_advance_to(next) {
            return Err(CoreError::InvalidTransition {
                from: message.status,
                to: next,
            });
        }

        self.store.set_message_status(id, next)?;
        info!(
            message_id = %id,
            from = %message.status.as_str(),
            to = %next.as_str(),
            "message status advanced"
        );
        message.status = next;
        Ok(message)
    }

    /// Toggle `user`'s `emoji` reaction on a message.  Returns `true` when
    /// the reaction was added, `false` when an existing one was removed.
    pub async fn toggle_reaction(&self, id: MessageId, user: &UserId, emoji: &str) -> Result<bool> {
        let _guard = self.locks.acquire(&id).await;

        let message = self.store.get_message(id).map_err(|e| not_found(id, e))?;
        let exists = message
            .reactions
            .iter()
            .any(|r| r.user_id == *user && r.emoji == emoji);

        if exists {
            self.store.remove_reaction(id, user, emoji)?;
            info!(message_id = %id, user = %user, emoji, "reaction removed");
            Ok(false)
        } else {
            let reaction = MessageReaction {
                emoji: emoji.to_string(),
                user_id: user.clone(),
                timestamp: Utc::now(),
            };
            self.store.add_reaction(id, &reaction)?;
            info!(message_id = %id, user = %user, emoji, "reaction added");
            Ok(true)
        }
    }

    /// Drop idle per-message locks.
    pub async fn purge_idle_locks(&self) -> usize {
        self.locks.purge_unused().await
    }
}

/// Reconcile the caller's declared kind with the presence of a template id.
fn resolve_kind(kind: Option<MessageKind>, template_id: Option<TemplateId>) -> Result<MessageKind> {
    match (template_id, kind) {
        (Some(_), None) | (Some(_), Some(MessageKind::Template)) => Ok(MessageKind::Template),
        (Some(_), Some(other)) => Err(CoreError::Validation(format!(
            "a template-derived message cannot be of kind {}",
            other.as_str()
        ))),
        (None, Some(MessageKind::Template)) => Err(CoreError::Validation(
            "template kind requires a template id".to_string(),
        )),
        (None, Some(kind)) => Ok(kind),
        (None, None) => Ok(MessageKind::Text),
    }
}

fn not_found(id: MessageId, err: StoreError) -> CoreError {
    match err {
        StoreError::NotFound => CoreError::MessageNotFound(id),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribune_store::MemoryStore;

    fn ledger() -> DeliveryLedger {
        DeliveryLedger::new(Arc::new(MemoryStore::new()))
    }

    fn direct(content: &str) -> NewDirectMessage {
        NewDirectMessage {
            sender: UserId::new("sender-1"),
            content: content.to_string(),
            kind: None,
            template_id: None,
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn test_send_direct_defaults() {
        let ledger = ledger();
        let message = ledger.send_direct(direct("hello there")).unwrap();
        assert_eq!(message.kind, MessageKind::Text);
        assert_eq!(message.status, MessageStatus::Sending);
        assert!(message.validated_by.is_none());

        let fetched = ledger.get(message.id).unwrap();
        assert_eq!(fetched.content, "hello there");
    }

    #[tokio::test]
    async fn test_send_direct_blank_rejected() {
        let ledger = ledger();
        assert!(matches!(
            ledger.send_direct(direct("  \n ")),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_kind_matrix() {
        let tid = TemplateId::new();
        assert_eq!(resolve_kind(None, Some(tid)).unwrap(), MessageKind::Template);
        assert_eq!(
            resolve_kind(Some(MessageKind::Template), Some(tid)).unwrap(),
            MessageKind::Template
        );
        assert!(resolve_kind(Some(MessageKind::System), Some(tid)).is_err());
        assert!(resolve_kind(Some(MessageKind::Template), None).is_err());
        assert_eq!(
            resolve_kind(Some(MessageKind::System), None).unwrap(),
            MessageKind::System
        );
        assert_eq!(resolve_kind(None, None).unwrap(), MessageKind::Text);
    }

    #[tokio::test]
    async fn test_status_advances_forward_only() {
        let ledger = ledger();
        let message = ledger.send_direct(direct("status check")).unwrap();

        let updated = ledger
            .advance_status(message.id, MessageStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(updated.status, MessageStatus::Delivered);

        // Repeating the same status is an invalid transition.
        let same = ledger
            .advance_status(message.id, MessageStatus::Delivered)
            .await;
        assert!(matches!(
            same,
            Err(CoreError::InvalidTransition {
                from: MessageStatus::Delivered,
                to: MessageStatus::Delivered,
            })
        ));

        // Going backwards is too.
        let back = ledger.advance_status(message.id, MessageStatus::Sent).await;
        assert!(matches!(back, Err(CoreError::InvalidTransition { .. })));

        // Forward still works, and the stored row reflects it.
        ledger
            .advance_status(message.id, MessageStatus::Read)
            .await
            .unwrap();
        assert_eq!(ledger.get(message.id).unwrap().status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn test_status_unknown_message() {
        let ledger = ledger();
        let result = ledger
            .advance_status(MessageId::new(), MessageStatus::Sent)
            .await;
        assert!(matches!(result, Err(CoreError::MessageNotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_reaction_round_trip() {
        let ledger = ledger();
        let message = ledger.send_direct(direct("react to me")).unwrap();
        let user = UserId::new("reader-1");

        assert!(ledger.toggle_reaction(message.id, &user, "🔥").await.unwrap());
        assert_eq!(ledger.get(message.id).unwrap().reactions.len(), 1);

        // Second toggle of the same pair removes it.
        assert!(!ledger.toggle_reaction(message.id, &user, "🔥").await.unwrap());
        assert!(ledger.get(message.id).unwrap().reactions.is_empty());

        // Different emoji and different user are independent.
        assert!(ledger.toggle_reaction(message.id, &user, "🎉").await.unwrap());
        assert!(ledger
            .toggle_reaction(message.id, &UserId::new("reader-2"), "🎉")
            .await
            .unwrap());
        assert_eq!(ledger.get(message.id).unwrap().reactions.len(), 2);
    }

    #[tokio::test]
    async fn test_list_pages_oldest_first() {
        let ledger = ledger();
        for i in 0..5 {
            ledger.send_direct(direct(&format!("message {i}"))).unwrap();
        }

        let first = ledger.list(2, 0).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].content, "message 0");

        let rest = ledger.list(10, 2).unwrap();
        assert_eq!(rest.len(), 3);
        assert_eq!(rest[0].content, "message 2");
    }
}
