//! CRUD operations for ledger [`ChatMessage`] records.
//!
//! Reactions live in their own table (see `reactions.rs`); the read paths
//! here stitch them back onto the returned messages.

use rusqlite::params;
use tribune_shared::{ChatMessage, MessageId, MessageKind, MessageStatus, TemplateId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::rows;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Append a message to the ledger.  Reactions on the value are ignored;
    /// they are recorded separately.
    pub fn append_message(&self, message: &ChatMessage) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (id, sender_id, content, timestamp, kind, status,
                                   reply_to, template_id, validated_by, validated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                message.id.to_string(),
                message.sender_id.as_str(),
                message.content,
                message.timestamp.to_rfc3339(),
                message.kind.as_str(),
                message.status.as_str(),
                message.reply_to.map(|m| m.to_string()),
                message.template_id.map(|t| t.to_string()),
                message.validated_by.as_ref().map(|u| u.as_str().to_string()),
                message.validated_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single message by id, reactions included.
    pub fn get_message(&self, id: MessageId) -> Result<ChatMessage> {
        let mut message = self
            .conn()
            .query_row(
                "SELECT id, sender_id, content, timestamp, kind, status,
                        reply_to, template_id, validated_by, validated_at
                 FROM messages
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;
        message.reactions = self.get_reactions_for_message(id)?;
        Ok(message)
    }

    /// Page through the ledger, oldest first.  `rowid` breaks timestamp ties
    /// so pagination is stable.
    pub fn list_messages(&self, limit: u32, offset: u32) -> Result<Vec<ChatMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, sender_id, content, timestamp, kind, status,
                    reply_to, template_id, validated_by, validated_at
             FROM messages
             ORDER BY timestamp ASC, rowid ASC
             LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt.query_map(params![limit, offset], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }

        let ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();
        let mut reactions = self.get_reactions_for_messages(&ids)?;
        for message in &mut messages {
            if let Some(list) = reactions.remove(&message.id) {
                message.reactions = list;
            }
        }
        Ok(messages)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the delivery status of a message.
    pub fn set_message_status(&self, id: MessageId, status: MessageStatus) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE messages SET status = ?2 WHERE id = ?1",
            params![id.to_string(), status.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`ChatMessage`] with an empty reaction list.
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let id_str: String = row.get(0)?;
    let sender: String = row.get(1)?;
    let ts_str: String = row.get(3)?;
    let kind_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let reply_to_str: Option<String> = row.get(6)?;
    let template_id_str: Option<String> = row.get(7)?;
    let validated_by: Option<String> = row.get(8)?;
    let validated_at_str: Option<String> = row.get(9)?;

    Ok(ChatMessage {
        id: MessageId(rows::uuid_col(0, &id_str)?),
        sender_id: UserId::new(sender),
        content: row.get(2)?,
        timestamp: rows::ts_col(3, &ts_str)?,
        kind: rows::enum_col(4, &kind_str, MessageKind::from_str, "message kind")?,
        status: rows::enum_col(5, &status_str, MessageStatus::from_str, "message status")?,
        reply_to: rows::opt_uuid_col(6, reply_to_str)?.map(MessageId),
        reactions: Vec::new(),
        template_id: rows::opt_uuid_col(7, template_id_str)?.map(TemplateId),
        validated_by: validated_by.map(UserId::new),
        validated_at: rows::opt_ts_col(9, validated_at_str)?,
    })
}
