//! Delivered chat messages, their delivery-status state machine, and
//! per-user emoji reactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MessageId, TemplateId, UserId};

// ---------------------------------------------------------------------------
// Delivery status
// ---------------------------------------------------------------------------

/// Delivery lifecycle of a ledger message.
///
/// Status only ever moves forward: sending -> sent -> delivered -> read.
/// Skipping ahead is allowed (a read receipt can arrive before the delivery
/// receipt); moving back or re-applying the current status is not.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    /// Position in the forward-only ordering.
    pub fn rank(&self) -> u8 {
        match self {
            MessageStatus::Sending => 0,
            MessageStatus::Sent => 1,
            MessageStatus::Delivered => 2,
            MessageStatus::Read => 3,
        }
    }

    /// Whether a transition from `self` to `next` is legal.
    pub fn can_advance_to(&self, next: MessageStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Read)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sending" => Some(MessageStatus::Sending),
            "sent" => Some(MessageStatus::Sent),
            "delivered" => Some(MessageStatus::Delivered),
            "read" => Some(MessageStatus::Read),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Message kind
// ---------------------------------------------------------------------------

/// Origin class of a ledger message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Template,
    System,
    Media,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Template => "template",
            MessageKind::System => "system",
            MessageKind::Media => "media",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "template" => Some(MessageKind::Template),
            "system" => Some(MessageKind::System),
            "media" => Some(MessageKind::Media),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

/// One user's emoji reaction to a message.  At most one reaction exists per
/// (message, user, emoji) triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageReaction {
    pub emoji: String,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Chat message
// ---------------------------------------------------------------------------

/// A message recorded on the delivery ledger.  Content and sender are
/// immutable once appended; only `status` and `reactions` change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: MessageId,
    /// Who the message is attributed to.  For validated messages this is
    /// the approving reviewer.
    pub sender_id: UserId,
    /// Final message text.
    pub content: String,
    /// When the message was appended to the ledger.
    pub timestamp: DateTime<Utc>,
    /// Origin class.
    pub kind: MessageKind,
    /// Delivery status, monotonically advancing.
    pub status: MessageStatus,
    /// Message this one replies to, if any.  Advisory only.
    pub reply_to: Option<MessageId>,
    /// Reactions, in the order they were applied.
    pub reactions: Vec<MessageReaction>,
    /// Source template when the content came from one.
    pub template_id: Option<TemplateId>,
    /// Reviewer who approved the message, when it passed validation.
    pub validated_by: Option<UserId>,
    /// When the approval happened.
    pub validated_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Toggle `user_id`'s `emoji` reaction.  Returns `true` when the
    /// reaction was added, `false` when an existing one was removed.
    pub fn toggle_reaction(&mut self, user_id: &UserId, emoji: &str) -> bool {
        if let Some(pos) = self
            .reactions
            .iter()
            .position(|r| &r.user_id == user_id && r.emoji == emoji)
        {
            self.reactions.remove(pos);
            false
        } else {
            self.reactions.push(MessageReaction {
                emoji: emoji.to_string(),
                user_id: user_id.clone(),
                timestamp: Utc::now(),
            });
            true
        }
    }

    /// Whether the template path produced this message.
    pub fn is_template(&self) -> bool {
        self.template_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> ChatMessage {
        ChatMessage {
            id: MessageId::new(),
            sender_id: UserId::new("sender-1"),
            content: "hello".to_string(),
            timestamp: Utc::now(),
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
    fn test_status_moves_forward_only() {
        assert!(MessageStatus::Sending.can_advance_to(MessageStatus::Sent));
        assert!(MessageStatus::Sent.can_advance_to(MessageStatus::Delivered));
        assert!(MessageStatus::Delivered.can_advance_to(MessageStatus::Read));

        // Skipping ahead is fine.
        assert!(MessageStatus::Sending.can_advance_to(MessageStatus::Read));

        // Same or backwards is not.
        assert!(!MessageStatus::Sent.can_advance_to(MessageStatus::Sent));
        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Delivered));
        assert!(!MessageStatus::Delivered.can_advance_to(MessageStatus::Sending));
    }

    #[test]
    fn test_status_terminal() {
        assert!(MessageStatus::Read.is_terminal());
        assert!(!MessageStatus::Delivered.is_terminal());
    }

    #[test]
    fn test_status_str_roundtrip() {
        for s in [
            MessageStatus::Sending,
            MessageStatus::Sent,
            MessageStatus::Delivered,
            MessageStatus::Read,
        ] {
            assert_eq!(MessageStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(MessageStatus::from_str("queued"), None);
    }

    #[test]
    fn test_toggle_reaction_roundtrip() {
        let mut msg = message();
        let user = UserId::new("reader-1");

        assert!(msg.toggle_reaction(&user, "🔥"));
        assert_eq!(msg.reactions.len(), 1);

        // Same user, same emoji: toggles off.
        assert!(!msg.toggle_reaction(&user, "🔥"));
        assert!(msg.reactions.is_empty());
    }

    #[test]
    fn test_toggle_reaction_is_per_user_and_emoji() {
        let mut msg = message();
        let a = UserId::new("a");
        let b = UserId::new("b");

        assert!(msg.toggle_reaction(&a, "🔥"));
        assert!(msg.toggle_reaction(&b, "🔥"));
        assert!(msg.toggle_reaction(&a, "👍"));
        assert_eq!(msg.reactions.len(), 3);

        assert!(!msg.toggle_reaction(&a, "🔥"));
        assert_eq!(msg.reactions.len(), 2);
    }
}
