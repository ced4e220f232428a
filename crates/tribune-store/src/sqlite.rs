//! Thread-safe SQLite store.
//!
//! [`crate::Database`] owns a single `rusqlite::Connection`, which is `Send`
//! but not `Sync`.  [`SqliteStore`] wraps it in a mutex so one handle can be
//! shared behind `Arc<dyn ...Store>` by every service.  The mutex also makes
//! compound operations like [`Database::take_pending`] atomic.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tribune_shared::{
    AuditRecord, ChatMessage, MessageReaction, MessageStatus, MessageTemplate, PendingFilter,
    PendingMessage, PendingSort, TemplateFilter, TemplateSort,
};
use tribune_shared::{MessageId, PendingMessageId, TemplateId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::traits::{AuditStore, LedgerStore, PendingStore, TemplateStore};

pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    /// Open (or create) the default application database.
    pub fn new() -> Result<Self> {
        Ok(Self::from_database(Database::new()?))
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::from_database(Database::open_at(path)?))
    }

    /// Wrap an already-open database.
    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl TemplateStore for SqliteStore {
    fn insert_template(&self, template: &MessageTemplate) -> Result<()> {
        self.lock()?.insert_template(template)
    }

    fn get_template(&self, id: TemplateId) -> Result<MessageTemplate> {
        self.lock()?.get_template(id)
    }

    fn put_template(&self, template: &MessageTemplate) -> Result<()> {
        self.lock()?.put_template(template)
    }

    fn remove_template(&self, id: TemplateId) -> Result<bool> {
        self.lock()?.remove_template(id)
    }

    fn list_templates(
        &self,
        filter: &TemplateFilter,
        sort: TemplateSort,
    ) -> Result<Vec<MessageTemplate>> {
        self.lock()?.list_templates(filter, sort)
    }
}

impl PendingStore for SqliteStore {
    fn insert_pending(&self, message: &PendingMessage) -> Result<()> {
        self.lock()?.insert_pending(message)
    }

    fn get_pending(&self, id: PendingMessageId) -> Result<PendingMessage> {
        self.lock()?.get_pending(id)
    }

    fn put_pending(&self, message: &PendingMessage) -> Result<()> {
        self.lock()?.put_pending(message)
    }

    fn take_pending(&self, id: PendingMessageId) -> Result<Option<PendingMessage>> {
        self.lock()?.take_pending(id)
    }

    fn list_pending(
        &self,
        filter: &PendingFilter,
        sort: PendingSort,
    ) -> Result<Vec<PendingMessage>> {
        self.lock()?.list_pending(filter, sort)
    }
}

impl LedgerStore for SqliteStore {
    fn append_message(&self, message: &ChatMessage) -> Result<()> {
        self.lock()?.append_message(message)
    }

    fn get_message(&self, id: MessageId) -> Result<ChatMessage> {
        self.lock()?.get_message(id)
    }

    fn set_message_status(&self, id: MessageId, status: MessageStatus) -> Result<()> {
        self.lock()?.set_message_status(id, status)
    }

    fn add_reaction(&self, id: MessageId, reaction: &MessageReaction) -> Result<()> {
        self.lock()?.add_reaction(id, reaction)
    }

    fn remove_reaction(&self, id: MessageId, user_id: &UserId, emoji: &str) -> Result<bool> {
        self.lock()?.remove_reaction(id, user_id, emoji)
    }

    fn list_messages(&self, limit: u32, offset: u32) -> Result<Vec<ChatMessage>> {
        self.lock()?.list_messages(limit, offset)
    }
}

impl AuditStore for SqliteStore {
    fn record_audit(&self, record: &AuditRecord) -> Result<()> {
        self.lock()?.record_audit(record)
    }

    fn list_audit_for(&self, pending_id: PendingMessageId) -> Result<Vec<AuditRecord>> {
        self.lock()?.list_audit_for(pending_id)
    }
}
