//! In-memory store backend.
//!
//! Backs tests and ephemeral deployments.  Each table lives behind its own
//! `RwLock` so unrelated entities never contend; the ledger is a `Vec`
//! because its insertion order is the stable pagination tiebreak.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tribune_shared::{
    AuditRecord, ChatMessage, MessageReaction, MessageStatus, MessageTemplate, PendingFilter,
    PendingMessage, PendingSort, TemplateFilter, TemplateSort,
};
use tribune_shared::{MessageId, PendingMessageId, TemplateId, UserId};

use crate::error::{Result, StoreError};
use crate::traits::{AuditStore, LedgerStore, PendingStore, TemplateStore};

#[derive(Default)]
pub struct MemoryStore {
    templates: RwLock<HashMap<TemplateId, MessageTemplate>>,
    pending: RwLock<HashMap<PendingMessageId, PendingMessage>>,
    messages: RwLock<Vec<ChatMessage>>,
    audit: RwLock<Vec<AuditRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::Poisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::Poisoned)
}

impl TemplateStore for MemoryStore {
    fn insert_template(&self, template: &MessageTemplate) -> Result<()> {
        write(&self.templates)?.insert(template.id, template.clone());
        Ok(())
    }

    fn get_template(&self, id: TemplateId) -> Result<MessageTemplate> {
        read(&self.templates)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn put_template(&self, template: &MessageTemplate) -> Result<()> {
        let mut templates = write(&self.templates)?;
        if !templates.contains_key(&template.id) {
            return Err(StoreError::NotFound);
        }
        templates.insert(template.id, template.clone());
        Ok(())
    }

    fn remove_template(&self, id: TemplateId) -> Result<bool> {
        Ok(write(&self.templates)?.remove(&id).is_some())
    }

    fn list_templates(
        &self,
        filter: &TemplateFilter,
        sort: TemplateSort,
    ) -> Result<Vec<MessageTemplate>> {
        let mut out: Vec<MessageTemplate> = read(&self.templates)?
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        sort.apply(&mut out);
        Ok(out)
    }
}

impl PendingStore for MemoryStore {
    fn insert_pending(&self, message: &PendingMessage) -> Result<()> {
        write(&self.pending)?.insert(message.id, message.clone());
        Ok(())
    }

    fn get_pending(&self, id: PendingMessageId) -> Result<PendingMessage> {
        read(&self.pending)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn put_pending(&self, message: &PendingMessage) -> Result<()> {
        let mut pending = write(&self.pending)?;
        if !pending.contains_key(&message.id) {
            return Err(StoreError::NotFound);
        }
        pending.insert(message.id, message.clone());
        Ok(())
    }

    fn take_pending(&self, id: PendingMessageId) -> Result<Option<PendingMessage>> {
        Ok(write(&self.pending)?.remove(&id))
    }

    fn list_pending(
        &self,
        filter: &PendingFilter,
        sort: PendingSort,
    ) -> Result<Vec<PendingMessage>> {
        let mut out: Vec<PendingMessage> = read(&self.pending)?
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        sort.apply(&mut out);
        Ok(out)
    }
}

impl LedgerStore for MemoryStore {
    fn append_message(&self, message: &ChatMessage) -> Result<()> {
        write(&self.messages)?.push(message.clone());
        Ok(())
    }

    fn get_message(&self, id: MessageId) -> Result<ChatMessage> {
        read(&self.messages)?
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn set_message_status(&self, id: MessageId, status: MessageStatus) -> Result<()> {
        let mut messages = write(&self.messages)?;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound)?;
        message.status = status;
        Ok(())
    }

    fn add_reaction(&self, id: MessageId, reaction: &MessageReaction) -> Result<()> {
        let mut messages = write(&self.messages)?;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound)?;
        let exists = message
            .reactions
            .iter()
            .any(|r| r.user_id == reaction.user_id && r.emoji == reaction.emoji);
        if !exists {
            message.reactions.push(reaction.clone());
        }
        Ok(())
    }

    fn remove_reaction(&self, id: MessageId, user_id: &UserId, emoji: &str) -> Result<bool> {
        let mut messages = write(&self.messages)?;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound)?;
        let before = message.reactions.len();
        message
            .reactions
            .retain(|r| !(&r.user_id == user_id && r.emoji == emoji));
        Ok(message.reactions.len() < before)
    }

    fn list_messages(&self, limit: u32, offset: u32) -> Result<Vec<ChatMessage>> {
        let messages = read(&self.messages)?;
        let mut ordered: Vec<ChatMessage> = messages.clone();
        // Stable sort keeps insertion order for equal timestamps.
        ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(ordered
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

impl AuditStore for MemoryStore {
    fn record_audit(&self, record: &AuditRecord) -> Result<()> {
        write(&self.audit)?.push(record.clone());
        Ok(())
    }

    fn list_audit_for(&self, pending_id: PendingMessageId) -> Result<Vec<AuditRecord>> {
        Ok(read(&self.audit)?
            .iter()
            .filter(|r| r.pending_id == pending_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tribune_shared::{MessageKind, Priority, UserId};

    fn template(title: &str) -> MessageTemplate {
        MessageTemplate {
            id: TemplateId::new(),
            title: title.to_string(),
            content: "Hello {name}".to_string(),
            category: "welcome".to_string(),
            tags: Vec::new(),
            target_audience: Vec::new(),
            estimated_engagement: 50,
            is_active: true,
            usage_count: 0,
            created_by: UserId::new("author-1"),
            created_at: Utc::now(),
            last_used: None,
            variables: Vec::new(),
        }
    }

    fn pending(priority: Priority) -> PendingMessage {
        PendingMessage {
            id: PendingMessageId::new(),
            content: "draft".to_string(),
            template_id: None,
            template_title: None,
            target_audience: Vec::new(),
            category: "announcement".to_string(),
            tags: Vec::new(),
            priority,
            estimated_reach: 100,
            created_by: UserId::new("creator-1"),
            created_at: Utc::now(),
            scheduled_for: None,
            context: None,
        }
    }

    fn message(age_mins: i64) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(),
            sender_id: UserId::new("sender-1"),
            content: "hi".to_string(),
            timestamp: Utc::now() - Duration::minutes(age_mins),
            kind: MessageKind::Text,
            status: MessageStatus::Sending,
            reply_to: None,
            reactions: Vec::new(),
            template_id: None,
            validated_by: None,
            validated_at: None,
        }
    }

    #[test]
    fn template_crud_round_trip() {
        let store = MemoryStore::new();
        let tpl = template("greet");
        store.insert_template(&tpl).unwrap();

        let loaded = store.get_template(tpl.id).unwrap();
        assert_eq!(loaded.title, "greet");

        let mut revised = loaded;
        revised.title = "greet v2".to_string();
        store.put_template(&revised).unwrap();
        assert_eq!(store.get_template(tpl.id).unwrap().title, "greet v2");

        assert!(store.remove_template(tpl.id).unwrap());
        assert!(!store.remove_template(tpl.id).unwrap());
        assert!(matches!(
            store.get_template(tpl.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn put_template_requires_existing_row() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.put_template(&template("ghost")),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn take_pending_returns_entry_exactly_once() {
        let store = MemoryStore::new();
        let msg = pending(Priority::High);
        store.insert_pending(&msg).unwrap();

        let first = store.take_pending(msg.id).unwrap();
        assert_eq!(first.map(|m| m.id), Some(msg.id));

        let second = store.take_pending(msg.id).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn list_pending_filters_and_sorts() {
        let store = MemoryStore::new();
        store.insert_pending(&pending(Priority::Low)).unwrap();
        store.insert_pending(&pending(Priority::Urgent)).unwrap();
        store.insert_pending(&pending(Priority::Urgent)).unwrap();

        let urgent = store
            .list_pending(
                &PendingFilter {
                    priority: Some(Priority::Urgent),
                },
                PendingSort::Date,
            )
            .unwrap();
        assert_eq!(urgent.len(), 2);

        let all = store
            .list_pending(&PendingFilter::default(), PendingSort::Priority)
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].priority, Priority::Urgent);
        assert_eq!(all[2].priority, Priority::Low);
    }

    #[test]
    fn ledger_lists_oldest_first_with_pagination() {
        let store = MemoryStore::new();
        let old = message(30);
        let mid = message(20);
        let new = message(10);
        // Insert out of order; listing sorts by timestamp.
        store.append_message(&new).unwrap();
        store.append_message(&old).unwrap();
        store.append_message(&mid).unwrap();

        let page = store.list_messages(10, 0).unwrap();
        assert_eq!(
            page.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![old.id, mid.id, new.id]
        );

        let page = store.list_messages(1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, mid.id);
    }

    #[test]
    fn reactions_are_unique_per_triple() {
        let store = MemoryStore::new();
        let msg = message(0);
        store.append_message(&msg).unwrap();

        let user = UserId::new("reader-1");
        let reaction = MessageReaction {
            emoji: "🔥".to_string(),
            user_id: user.clone(),
            timestamp: Utc::now(),
        };
        store.add_reaction(msg.id, &reaction).unwrap();
        store.add_reaction(msg.id, &reaction).unwrap();

        assert_eq!(store.get_message(msg.id).unwrap().reactions.len(), 1);
        assert!(store.remove_reaction(msg.id, &user, "🔥").unwrap());
        assert!(!store.remove_reaction(msg.id, &user, "🔥").unwrap());
    }

    #[test]
    fn status_update_requires_existing_message() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_message_status(MessageId::new(), MessageStatus::Sent),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn audit_records_filter_by_pending_id() {
        let store = MemoryStore::new();
        let a = PendingMessageId::new();
        let b = PendingMessageId::new();
        store
            .record_audit(&AuditRecord::new(
                a,
                tribune_shared::AuditAction::Edited,
                UserId::new("reviewer-1"),
            ))
            .unwrap();
        store
            .record_audit(&AuditRecord::new(
                b,
                tribune_shared::AuditAction::Rejected {
                    reason: "off brand".to_string(),
                },
                UserId::new("reviewer-1"),
            ))
            .unwrap();

        assert_eq!(store.list_audit_for(a).unwrap().len(), 1);
        assert_eq!(store.list_audit_for(b).unwrap().len(), 1);
        assert!(store.list_audit_for(PendingMessageId::new()).unwrap().is_empty());
    }
}
