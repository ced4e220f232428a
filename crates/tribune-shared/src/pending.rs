//! Pending outbound messages awaiting validation, and the actions a
//! reviewer can take on them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PendingMessageId, TemplateId, UserId};

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Review priority of a pending message.  Ordered: urgent > high > medium >
/// low.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Numeric rank used for descending priority sorts.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pending message
// ---------------------------------------------------------------------------

/// An outbound message waiting in the moderation queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingMessage {
    /// Unique identifier of the queue entry.
    pub id: PendingMessageId,
    /// Proposed message text (already rendered if template-derived).
    pub content: String,
    /// Source template, if the draft came from one.
    pub template_id: Option<TemplateId>,
    /// Title of the source template, carried for display.
    pub template_title: Option<String>,
    /// Audience segments the message targets.
    pub target_audience: Vec<String>,
    /// Grouping label, mirrors template categories.
    pub category: String,
    /// Search keywords.
    pub tags: Vec<String>,
    /// Review priority.
    pub priority: Priority,
    /// Estimated number of recipients.
    pub estimated_reach: u32,
    /// Who submitted the draft.
    pub created_by: UserId,
    /// When the draft entered the queue.
    pub created_at: DateTime<Utc>,
    /// Requested delivery time, if the sender scheduled one.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Free-form note from the submitter to the reviewer.
    pub context: Option<String>,
}

/// Content source for a new draft: freeform text, or a template plus
/// variable bindings to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PendingSource {
    Freeform {
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Template {
        template_id: TemplateId,
        #[serde(default)]
        bindings: HashMap<String, String>,
    },
}

/// Fields supplied when submitting a draft.  Id and creation time are
/// assigned by the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPendingMessage {
    pub source: PendingSource,
    #[serde(default)]
    pub target_audience: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Priority,
    pub estimated_reach: u32,
    pub created_by: UserId,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub context: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation actions
// ---------------------------------------------------------------------------

/// Reviewer decision on a pending message.  The three arms are the complete
/// set of transitions out of (or back into) the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValidationAction {
    /// Publish the message to the delivery ledger.
    Approve,
    /// Drop the message; `reason` is archived with the audit record.
    Reject {
        #[serde(default)]
        reason: String,
    },
    /// Revise content and/or metadata; the message stays pending.
    #[serde(rename_all = "camelCase")]
    Edit {
        /// Replacement text.  Empty means "keep the current content"
        /// (metadata-only edit); whitespace-only is rejected.
        #[serde(default)]
        new_content: String,
        #[serde(default)]
        metadata: MetadataPatch,
    },
}

/// Metadata revisions applied by an edit.  `Some` fields replace the stored
/// values, `None` fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub target_audience: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.priority.is_none()
            && self.target_audience.is_none()
            && self.tags.is_none()
    }

    pub fn apply_to(&self, message: &mut PendingMessage) {
        if let Some(category) = &self.category {
            message.category = category.clone();
        }
        if let Some(priority) = self.priority {
            message.priority = priority;
        }
        if let Some(audience) = &self.target_audience {
            message.target_audience = audience.clone();
        }
        if let Some(tags) = &self.tags {
            message.tags = tags.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Queue listing filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingFilter {
    pub priority: Option<Priority>,
}

impl PendingFilter {
    pub fn matches(&self, message: &PendingMessage) -> bool {
        match self.priority {
            Some(priority) => message.priority == priority,
            None => true,
        }
    }
}

/// Queue sort order.  All orders are descending: newest, most urgent, or
/// widest reach first.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PendingSort {
    #[default]
    Date,
    Priority,
    Reach,
}

impl PendingSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingSort::Date => "date",
            PendingSort::Priority => "priority",
            PendingSort::Reach => "reach",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "date" => Some(PendingSort::Date),
            "priority" => Some(PendingSort::Priority),
            "reach" => Some(PendingSort::Reach),
            _ => None,
        }
    }

    pub fn apply(&self, messages: &mut [PendingMessage]) {
        match self {
            PendingSort::Date => {
                messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            PendingSort::Priority => {
                messages.sort_by(|a, b| {
                    b.priority
                        .rank()
                        .cmp(&a.priority.rank())
                        .then(b.created_at.cmp(&a.created_at))
                });
            }
            PendingSort::Reach => {
                messages.sort_by(|a, b| {
                    b.estimated_reach
                        .cmp(&a.estimated_reach)
                        .then(b.created_at.cmp(&a.created_at))
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending(priority: Priority, reach: u32, age_mins: i64) -> PendingMessage {
        PendingMessage {
            id: PendingMessageId::new(),
            content: "hello".to_string(),
            template_id: None,
            template_title: None,
            target_audience: vec!["all".to_string()],
            category: "announcement".to_string(),
            tags: Vec::new(),
            priority,
            estimated_reach: reach,
            created_by: UserId::new("creator-1"),
            created_at: Utc::now() - Duration::minutes(age_mins),
            scheduled_for: None,
            context: None,
        }
    }

    #[test]
    fn test_priority_rank_order() {
        assert!(Priority::Urgent.rank() > Priority::High.rank());
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
    }

    #[test]
    fn test_priority_str_roundtrip() {
        for p in [
            Priority::Low,
            Priority::Medium,
            Priority::High,
            Priority::Urgent,
        ] {
            assert_eq!(Priority::from_str(p.as_str()), Some(p));
        }
        assert_eq!(Priority::from_str("severe"), None);
    }

    #[test]
    fn test_sort_by_priority_urgent_first() {
        let mut list = vec![
            pending(Priority::Low, 10, 1),
            pending(Priority::Urgent, 10, 5),
            pending(Priority::Medium, 10, 2),
        ];
        PendingSort::Priority.apply(&mut list);
        assert_eq!(list[0].priority, Priority::Urgent);
        assert_eq!(list[2].priority, Priority::Low);
    }

    #[test]
    fn test_sort_by_date_newest_first() {
        let mut list = vec![
            pending(Priority::Low, 10, 30),
            pending(Priority::Low, 10, 1),
            pending(Priority::Low, 10, 10),
        ];
        PendingSort::Date.apply(&mut list);
        assert!(list[0].created_at > list[1].created_at);
        assert!(list[1].created_at > list[2].created_at);
    }

    #[test]
    fn test_sort_by_reach_widest_first() {
        let mut list = vec![
            pending(Priority::Low, 100, 1),
            pending(Priority::Low, 5000, 1),
            pending(Priority::Low, 800, 1),
        ];
        PendingSort::Reach.apply(&mut list);
        assert_eq!(list[0].estimated_reach, 5000);
        assert_eq!(list[2].estimated_reach, 100);
    }

    #[test]
    fn test_filter_by_priority() {
        let filter = PendingFilter {
            priority: Some(Priority::Urgent),
        };
        assert!(filter.matches(&pending(Priority::Urgent, 10, 1)));
        assert!(!filter.matches(&pending(Priority::High, 10, 1)));
        assert!(PendingFilter::default().matches(&pending(Priority::Low, 10, 1)));
    }

    #[test]
    fn test_metadata_patch_merges_some_fields() {
        let mut msg = pending(Priority::Low, 10, 1);
        let patch = MetadataPatch {
            priority: Some(Priority::Urgent),
            tags: Some(vec!["revised".to_string()]),
            ..Default::default()
        };
        patch.apply_to(&mut msg);
        assert_eq!(msg.priority, Priority::Urgent);
        assert_eq!(msg.tags, vec!["revised".to_string()]);
        assert_eq!(msg.category, "announcement");
    }

    #[test]
    fn test_empty_patch_is_empty() {
        assert!(MetadataPatch::default().is_empty());
        let patch = MetadataPatch {
            category: Some("tips".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_validation_action_wire_shape() {
        let approve: ValidationAction = serde_json::from_str(r#"{"type":"approve"}"#).unwrap();
        assert_eq!(approve, ValidationAction::Approve);

        let reject: ValidationAction =
            serde_json::from_str(r#"{"type":"reject","reason":"off brand"}"#).unwrap();
        assert_eq!(
            reject,
            ValidationAction::Reject {
                reason: "off brand".to_string()
            }
        );

        let edit: ValidationAction =
            serde_json::from_str(r#"{"type":"edit","newContent":"better"}"#).unwrap();
        match edit {
            ValidationAction::Edit {
                new_content,
                metadata,
            } => {
                assert_eq!(new_content, "better");
                assert!(metadata.is_empty());
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }
}
