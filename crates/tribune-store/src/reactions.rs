//! CRUD operations for message reactions.

use std::collections::HashMap;

use rusqlite::params;
use uuid::Uuid;

use tribune_shared::{MessageId, MessageReaction, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::rows;

impl Database {
    /// Record a reaction.  The `UNIQUE (message_id, user_id, emoji)`
    /// constraint plus `OR IGNORE` makes duplicates a no-op.
    pub fn add_reaction(&self, message_id: MessageId, reaction: &MessageReaction) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO reactions (id, message_id, user_id, emoji, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                message_id.to_string(),
                reaction.user_id.as_str(),
                reaction.emoji,
                reaction.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Remove a reaction.  Returns `true` if one existed.
    pub fn remove_reaction(
        &self,
        message_id: MessageId,
        user_id: &UserId,
        emoji: &str,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
            params![message_id.to_string(), user_id.as_str(), emoji],
        )?;
        Ok(affected > 0)
    }

    /// All reactions on one message, in the order they were applied.
    pub fn get_reactions_for_message(&self, message_id: MessageId) -> Result<Vec<MessageReaction>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, emoji, created_at
             FROM reactions
             WHERE message_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let mapped = stmt.query_map(params![message_id.to_string()], |row| {
            let user: String = row.get(0)?;
            let emoji: String = row.get(1)?;
            let ts_str: String = row.get(2)?;
            Ok(MessageReaction {
                emoji,
                user_id: UserId::new(user),
                timestamp: rows::ts_col(2, &ts_str)?,
            })
        })?;

        let mut reactions = Vec::new();
        for row in mapped {
            reactions.push(row?);
        }
        Ok(reactions)
    }

    /// Get reactions for multiple messages at once (batch query).
    pub fn get_reactions_for_messages(
        &self,
        message_ids: &[MessageId],
    ) -> Result<HashMap<MessageId, Vec<MessageReaction>>> {
        let mut map = HashMap::new();
        for id in message_ids {
            let reactions = self.get_reactions_for_message(*id)?;
            if !reactions.is_empty() {
                map.insert(*id, reactions);
            }
        }
        Ok(map)
    }
}
