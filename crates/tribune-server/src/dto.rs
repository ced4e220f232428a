//! Wire types for the REST API.
//!
//! Domain models serialize snake_case; the API speaks camelCase, so every
//! request and response body gets an explicit DTO here.  Enums keep their
//! lowercase wire strings from `tribune-shared`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tribune_core::{BulkReport, NewDirectMessage, Resolution};
use tribune_shared::{
    AuditAction, AuditRecord, ChatMessage, MessageId, MessageKind, MessageStatus, MessageTemplate,
    NewPendingMessage, NewTemplate, PendingMessage, PendingMessageId, PendingSource, Priority,
    RenderOutcome, TemplateId, TemplateUpdate, TemplateVariable, UserId, ValidationAction,
    VariableKind,
};

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDto {
    pub name: String,
    pub kind: VariableKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl From<TemplateVariable> for VariableDto {
    fn from(v: TemplateVariable) -> Self {
        Self {
            name: v.name,
            kind: v.kind,
            required: v.required,
            options: v.options,
            placeholder: v.placeholder,
            default_value: v.default_value,
        }
    }
}

impl From<VariableDto> for TemplateVariable {
    fn from(v: VariableDto) -> Self {
        Self {
            name: v.name,
            kind: v.kind,
            required: v.required,
            options: v.options,
            placeholder: v.placeholder,
            default_value: v.default_value,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDto {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub target_audience: Vec<String>,
    pub estimated_engagement: u8,
    pub is_active: bool,
    pub usage_count: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub variables: Vec<VariableDto>,
}

impl From<MessageTemplate> for TemplateDto {
    fn from(t: MessageTemplate) -> Self {
        Self {
            id: t.id.0,
            title: t.title,
            content: t.content,
            category: t.category,
            tags: t.tags,
            target_audience: t.target_audience,
            estimated_engagement: t.estimated_engagement,
            is_active: t.is_active,
            usage_count: t.usage_count,
            created_by: t.created_by.0,
            created_at: t.created_at,
            last_used: t.last_used,
            variables: t.variables.into_iter().map(VariableDto::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub actor: UserId,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    pub estimated_engagement: u8,
    #[serde(default)]
    pub variables: Vec<VariableDto>,
}

impl CreateTemplateRequest {
    pub fn split(self) -> (UserId, NewTemplate) {
        let new = NewTemplate {
            title: self.title,
            content: self.content,
            category: self.category,
            tags: self.tags,
            target_audience: self.target_audience,
            estimated_engagement: self.estimated_engagement,
            variables: self
                .variables
                .into_iter()
                .map(TemplateVariable::from)
                .collect(),
        };
        (self.actor, new)
    }
}

/// PATCH body: absent fields keep their stored values.  `isActive` rides
/// along and maps to the activate/deactivate toggle.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub target_audience: Option<Vec<String>>,
    pub estimated_engagement: Option<u8>,
    pub variables: Option<Vec<VariableDto>>,
    pub is_active: Option<bool>,
}

impl UpdateTemplateRequest {
    pub fn split(self) -> (TemplateUpdate, Option<bool>) {
        let update = TemplateUpdate {
            title: self.title,
            content: self.content,
            category: self.category,
            tags: self.tags,
            target_audience: self.target_audience,
            estimated_engagement: self.estimated_engagement,
            variables: self
                .variables
                .map(|vs| vs.into_iter().map(TemplateVariable::from).collect()),
        };
        (update, self.is_active)
    }

    pub fn has_field_changes(&self) -> bool {
        self.title.is_some()
            || self.content.is_some()
            || self.category.is_some()
            || self.tags.is_some()
            || self.target_audience.is_some()
            || self.estimated_engagement.is_some()
            || self.variables.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub bindings: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDto {
    pub text: String,
    pub missing_variables: Vec<String>,
    pub is_complete: bool,
}

impl From<RenderOutcome> for RenderDto {
    fn from(o: RenderOutcome) -> Self {
        let is_complete = o.is_complete();
        Self {
            text: o.text,
            missing_variables: o.missing_variables,
            is_complete,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTemplateRequest {
    pub actor: UserId,
    #[serde(default)]
    pub bindings: HashMap<String, String>,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDto {
    pub name: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Pending queue
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDto {
    pub id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_title: Option<String>,
    pub target_audience: Vec<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub estimated_reach: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl From<PendingMessage> for PendingDto {
    fn from(p: PendingMessage) -> Self {
        Self {
            id: p.id.0,
            content: p.content,
            template_id: p.template_id.map(|t| t.0),
            template_title: p.template_title,
            target_audience: p.target_audience,
            category: p.category,
            tags: p.tags,
            priority: p.priority,
            estimated_reach: p.estimated_reach,
            created_by: p.created_by.0,
            created_at: p.created_at,
            scheduled_for: p.scheduled_for,
            context: p.context,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePendingRequest {
    pub actor: UserId,
    pub source: PendingSource,
    #[serde(default)]
    pub target_audience: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Priority,
    pub estimated_reach: u32,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub context: Option<String>,
}

impl From<CreatePendingRequest> for NewPendingMessage {
    fn from(r: CreatePendingRequest) -> Self {
        Self {
            source: r.source,
            target_audience: r.target_audience,
            category: r.category,
            tags: r.tags,
            priority: r.priority,
            estimated_reach: r.estimated_reach,
            created_by: r.actor,
            scheduled_for: r.scheduled_for,
            context: r.context,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub actor: UserId,
    pub action: ValidationAction,
}

#[derive(Debug, Deserialize)]
pub struct BulkValidateRequest {
    pub actor: UserId,
    pub ids: Vec<Uuid>,
    pub action: ValidationAction,
}

/// One resolution, tagged the way the audit trail tags outcomes.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ResolutionDto {
    Approved { message: MessageDto },
    Rejected,
    Edited { pending: PendingDto },
}

impl From<Resolution> for ResolutionDto {
    fn from(r: Resolution) -> Self {
        match r {
            Resolution::Approved { message } => ResolutionDto::Approved {
                message: message.into(),
            },
            Resolution::Rejected => ResolutionDto::Rejected,
            Resolution::Edited { message } => ResolutionDto::Edited {
                pending: message.into(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcomeDto {
    pub id: Uuid,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReportDto {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<BulkOutcomeDto>,
}

impl From<BulkReport> for BulkReportDto {
    fn from(report: BulkReport) -> Self {
        let succeeded = report.succeeded();
        let failed = report.failed();
        let outcomes = report
            .outcomes
            .into_iter()
            .map(|(id, result)| match result {
                Ok(Resolution::Approved { .. }) => BulkOutcomeDto {
                    id: id.0,
                    outcome: "approved",
                    error: None,
                },
                Ok(Resolution::Rejected) => BulkOutcomeDto {
                    id: id.0,
                    outcome: "rejected",
                    error: None,
                },
                Ok(Resolution::Edited { .. }) => BulkOutcomeDto {
                    id: id.0,
                    outcome: "edited",
                    error: None,
                },
                Err(e) => BulkOutcomeDto {
                    id: id.0,
                    outcome: "error",
                    error: Some(e.to_string()),
                },
            })
            .collect();
        Self {
            total: succeeded + failed,
            succeeded,
            failed,
            outcomes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDto {
    pub id: Uuid,
    pub pending_id: Uuid,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub reviewer: String,
    pub recorded_at: DateTime<Utc>,
}

impl From<AuditRecord> for AuditDto {
    fn from(r: AuditRecord) -> Self {
        let (message_id, reason) = match &r.action {
            AuditAction::Approved { message_id } => (Some(message_id.0), None),
            AuditAction::Rejected { reason } => (None, Some(reason.clone())),
            AuditAction::Edited => (None, None),
        };
        Self {
            id: r.id,
            pending_id: r.pending_id.0,
            outcome: r.action.as_str(),
            message_id,
            reason,
            reviewer: r.reviewer.0,
            recorded_at: r.recorded_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Per-emoji reaction tally, in first-appearance order.
#[derive(Debug, Serialize)]
pub struct ReactionChipDto {
    pub emoji: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: Uuid,
    pub sender_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    pub status: MessageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    pub reactions: Vec<ReactionChipDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
}

impl From<ChatMessage> for MessageDto {
    fn from(m: ChatMessage) -> Self {
        let mut chips: Vec<ReactionChipDto> = Vec::new();
        for reaction in &m.reactions {
            match chips.iter_mut().find(|c| c.emoji == reaction.emoji) {
                Some(chip) => chip.count += 1,
                None => chips.push(ReactionChipDto {
                    emoji: reaction.emoji.clone(),
                    count: 1,
                }),
            }
        }
        Self {
            id: m.id.0,
            sender_id: m.sender_id.0,
            content: m.content,
            timestamp: m.timestamp,
            kind: m.kind,
            status: m.status,
            reply_to: m.reply_to.map(|r| r.0),
            reactions: chips,
            template_id: m.template_id.map(|t| t.0),
            validated_by: m.validated_by.map(|u| u.0),
            validated_at: m.validated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub actor: UserId,
    pub content: String,
    #[serde(default)]
    pub kind: Option<MessageKind>,
    #[serde(default)]
    pub template_id: Option<Uuid>,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
}

impl From<SendMessageRequest> for NewDirectMessage {
    fn from(r: SendMessageRequest) -> Self {
        Self {
            sender: r.actor,
            content: r.content,
            kind: r.kind,
            template_id: r.template_id.map(TemplateId),
            reply_to: r.reply_to.map(MessageId),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: MessageStatus,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub actor: UserId,
    pub emoji: String,
}

#[derive(Debug, Serialize)]
pub struct ReactionToggleDto {
    pub added: bool,
    pub reactions: Vec<ReactionChipDto>,
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TypingRequest {
    pub actor: UserId,
    pub typing: bool,
}

#[derive(Debug, Serialize)]
pub struct TypingDto {
    pub users: Vec<String>,
}

pub fn pending_ids(ids: Vec<Uuid>) -> Vec<PendingMessageId> {
    ids.into_iter().map(PendingMessageId).collect()
}
