//! The pending-message moderation workflow.
//!
//! Drafts enter the queue through [`ValidationWorkflow::create_pending`] and
//! leave it through exactly one resolution: approve (published to the
//! ledger), reject (dropped), or stay after an edit.  Every action on one
//! pending id runs under that id's entity lock, and the queue's atomic
//! `take` decides races: concurrent reviewers get exactly one winner, the
//! rest observe [`CoreError::PendingNotFound`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use tribune_shared::{
    AuditAction, AuditRecord, ChatMessage, MessageId, MessageKind, MessageStatus, MetadataPatch,
    NewPendingMessage, PendingFilter, PendingMessage, PendingMessageId, PendingSort,
    PendingSource, UserId, ValidationAction,
};
use tribune_store::{AuditStore, LedgerStore, PendingStore, StoreError};

use crate::catalog::TemplateCatalog;
use crate::error::{CoreError, Result};
use crate::locks::EntityLocks;

/// What a [`ValidationWorkflow::validate`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Published to the ledger; `message` is the new ledger entry.
    Approved { message: ChatMessage },
    /// Dropped from the queue.
    Rejected,
    /// Revised; `message` is the updated queue entry.
    Edited { message: PendingMessage },
}

pub struct ValidationWorkflow {
    pending: Arc<dyn PendingStore>,
    ledger: Arc<dyn LedgerStore>,
    audit: Arc<dyn AuditStore>,
    catalog: Arc<TemplateCatalog>,
    locks: EntityLocks<PendingMessageId>,
}

impl ValidationWorkflow {
    pub fn new(
        pending: Arc<dyn PendingStore>,
        ledger: Arc<dyn LedgerStore>,
        audit: Arc<dyn AuditStore>,
        catalog: Arc<TemplateCatalog>,
    ) -> Self {
        Self {
            pending,
            ledger,
            audit,
            catalog,
            locks: EntityLocks::new(),
        }
    }

    /// Submit a draft to the moderation queue.
    ///
    /// Freeform drafts must carry non-blank content.  Template drafts are
    /// rendered here; missing required variables block the submission.
    pub fn create_pending(&self, new: NewPendingMessage) -> Result<PendingMessage> {
        let (content, template_id, template_title) = match new.source {
            PendingSource::Freeform { content } => {
                if content.trim().is_empty() {
                    return Err(CoreError::Validation(
                        "pending message content is empty".to_string(),
                    ));
                }
                (content, None, None)
            }
            PendingSource::Template {
                template_id,
                bindings,
            } => {
                let template = self.catalog.get(template_id)?;
                let outcome = template.render(&bindings);
                if !outcome.is_complete() {
                    return Err(CoreError::Validation(format!(
                        "missing required variables: {}",
                        outcome.missing_variables.join(", ")
                    )));
                }
                (outcome.text, Some(template_id), Some(template.title))
            }
        };

        let message = PendingMessage {
            id: PendingMessageId::new(),
            content,
            template_id,
            template_title,
            target_audience: new.target_audience,
            category: new.category,
            tags: new.tags,
            priority: new.priority,
            estimated_reach: new.estimated_reach,
            created_by: new.created_by,
            created_at: Utc::now(),
            scheduled_for: new.scheduled_for,
            context: new.context,
        };

        self.pending.insert_pending(&message)?;
        info!(
            pending_id = %message.id,
            priority = %message.priority.as_str(),
            created_by = %message.created_by,
            "draft queued for validation"
        );
        Ok(message)
    }

    /// Apply a reviewer action to a pending message.
    pub async fn validate(
        &self,
        id: PendingMessageId,
        action: ValidationAction,
        reviewer: &UserId,
    ) -> Result<Resolution> {
        let _guard = self.locks.acquire(&id).await;

        match action {
            ValidationAction::Approve => self.approve(id, reviewer),
            ValidationAction::Reject { reason } => self.reject(id, reason, reviewer),
            ValidationAction::Edit {
                new_content,
                metadata,
            } => self.edit(id, new_content, metadata, reviewer),
        }
    }

    fn approve(&self, id: PendingMessageId, reviewer: &UserId) -> Result<Resolution> {
        let pending = self
            .pending
            .take_pending(id)?
            .ok_or(CoreError::PendingNotFound(id))?;

        let now = Utc::now();
        let message = ChatMessage {
            id: MessageId::new(),
            sender_id: reviewer.clone(),
            content: pending.content.clone(),
            timestamp: now,
            kind: if pending.template_id.is_some() {
                MessageKind::Template
            } else {
                MessageKind::Text
            },
            status: MessageStatus::Sending,
            reply_to: None,
            reactions: Vec::new(),
            template_id: pending.template_id,
            validated_by: Some(reviewer.clone()),
            validated_at: Some(now),
        };

        // The entry is already out of the queue; if the publish fails, put
        // it back so the draft is not lost.
        if let Err(append_err) = self.ledger.append_message(&message) {
            if let Err(restore_err) = self.pending.insert_pending(&pending) {
                error!(
                    pending_id = %id,
                    error = %restore_err,
                    "failed to restore pending entry after ledger error"
                );
            }
            return Err(append_err.into());
        }

        self.audit.record_audit(&AuditRecord::new(
            id,
            AuditAction::Approved {
                message_id: message.id,
            },
            reviewer.clone(),
        ))?;

        info!(
            pending_id = %id,
            message_id = %message.id,
            reviewer = %reviewer,
            "pending message approved"
        );
        Ok(Resolution::Approved { message })
    }

    fn reject(&self, id: PendingMessageId, reason: String, reviewer: &UserId) -> Result<Resolution> {
        let pending = self
            .pending
            .take_pending(id)?
            .ok_or(CoreError::PendingNotFound(id))?;

        // The audit record is the only trace a rejection leaves; if it can't
        // be written, the entry goes back in the queue.
        let record = AuditRecord::new(
            id,
            AuditAction::Rejected {
                reason: reason.clone(),
            },
            reviewer.clone(),
        );
        if let Err(audit_err) = self.audit.record_audit(&record) {
            if let Err(restore_err) = self.pending.insert_pending(&pending) {
                error!(
                    pending_id = %id,
                    error = %restore_err,
                    "failed to restore pending entry after audit error"
                );
            }
            return Err(audit_err.into());
        }

        info!(pending_id = %id, reviewer = %reviewer, reason = %reason, "pending message rejected");
        Ok(Resolution::Rejected)
    }

    fn edit(
        &self,
        id: PendingMessageId,
        new_content: String,
        metadata: MetadataPatch,
        reviewer: &UserId,
    ) -> Result<Resolution> {
        let mut pending = match self.pending.get_pending(id) {
            Ok(message) => message,
            Err(StoreError::NotFound) => return Err(CoreError::PendingNotFound(id)),
            Err(other) => return Err(other.into()),
        };

        // Empty replacement means "metadata-only edit"; whitespace-only is a
        // rejected attempt to blank the message.
        if !new_content.is_empty() {
            if new_content.trim().is_empty() {
                return Err(CoreError::Validation(
                    "replacement content is blank".to_string(),
                ));
            }
            pending.content = new_content;
        }
        metadata.apply_to(&mut pending);

        self.pending.put_pending(&pending)?;
        self.audit
            .record_audit(&AuditRecord::new(id, AuditAction::Edited, reviewer.clone()))?;

        info!(pending_id = %id, reviewer = %reviewer, "pending message edited");
        Ok(Resolution::Edited { message: pending })
    }

    /// List queue entries matching `filter`, ordered by `sort`.
    pub fn list_pending(
        &self,
        filter: &PendingFilter,
        sort: PendingSort,
    ) -> Result<Vec<PendingMessage>> {
        Ok(self.pending.list_pending(filter, sort)?)
    }

    /// Audit trail of one pending message, oldest first.
    pub fn audit_for(&self, id: PendingMessageId) -> Result<Vec<AuditRecord>> {
        Ok(self.audit.list_audit_for(id)?)
    }

    /// Drop idle per-entry locks.
    pub async fn purge_idle_locks(&self) -> usize {
        self.locks.purge_unused().await
    }
}
