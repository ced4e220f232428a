//! CRUD operations for [`PendingMessage`] queue entries.

use rusqlite::params;
use tribune_shared::{
    PendingFilter, PendingMessage, PendingMessageId, PendingSort, Priority, TemplateId, UserId,
};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::rows;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new queue entry.
    pub fn insert_pending(&self, message: &PendingMessage) -> Result<()> {
        self.conn().execute(
            "INSERT INTO pending_messages (id, content, template_id, template_title,
                                           target_audience, category, tags, priority,
                                           estimated_reach, created_by, created_at,
                                           scheduled_for, context)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                message.id.to_string(),
                message.content,
                message.template_id.map(|t| t.to_string()),
                message.template_title,
                serde_json::to_string(&message.target_audience)?,
                message.category,
                serde_json::to_string(&message.tags)?,
                message.priority.as_str(),
                message.estimated_reach,
                message.created_by.as_str(),
                message.created_at.to_rfc3339(),
                message.scheduled_for.map(|t| t.to_rfc3339()),
                message.context,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single queue entry by id.
    pub fn get_pending(&self, id: PendingMessageId) -> Result<PendingMessage> {
        self.conn()
            .query_row(
                "SELECT id, content, template_id, template_title, target_audience,
                        category, tags, priority, estimated_reach, created_by,
                        created_at, scheduled_for, context
                 FROM pending_messages
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_pending,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List queue entries matching `filter`, ordered by `sort`.
    pub fn list_pending(
        &self,
        filter: &PendingFilter,
        sort: PendingSort,
    ) -> Result<Vec<PendingMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, content, template_id, template_title, target_audience,
                    category, tags, priority, estimated_reach, created_by,
                    created_at, scheduled_for, context
             FROM pending_messages",
        )?;

        let rows = stmt.query_map([], row_to_pending)?;

        let mut messages = Vec::new();
        for row in rows {
            let message = row?;
            if filter.matches(&message) {
                messages.push(message);
            }
        }
        sort.apply(&mut messages);
        Ok(messages)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace a queue entry wholesale.
    pub fn put_pending(&self, message: &PendingMessage) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE pending_messages
             SET content = ?2, template_id = ?3, template_title = ?4,
                 target_audience = ?5, category = ?6, tags = ?7, priority = ?8,
                 estimated_reach = ?9, created_by = ?10, created_at = ?11,
                 scheduled_for = ?12, context = ?13
             WHERE id = ?1",
            params![
                message.id.to_string(),
                message.content,
                message.template_id.map(|t| t.to_string()),
                message.template_title,
                serde_json::to_string(&message.target_audience)?,
                message.category,
                serde_json::to_string(&message.tags)?,
                message.priority.as_str(),
                message.estimated_reach,
                message.created_by.as_str(),
                message.created_at.to_rfc3339(),
                message.scheduled_for.map(|t| t.to_rfc3339()),
                message.context,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Atomically remove and return a queue entry, or `None` if it is no
    /// longer queued.  The surrounding mutex in [`crate::SqliteStore`]
    /// serializes callers, which makes the read-then-delete pair atomic.
    pub fn take_pending(&self, id: PendingMessageId) -> Result<Option<PendingMessage>> {
        let message = match self.get_pending(id) {
            Ok(message) => message,
            Err(StoreError::NotFound) => return Ok(None),
            Err(other) => return Err(other),
        };
        self.conn().execute(
            "DELETE FROM pending_messages WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(Some(message))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`PendingMessage`].
fn row_to_pending(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingMessage> {
    let id_str: String = row.get(0)?;
    let template_id_str: Option<String> = row.get(2)?;
    let audience_str: String = row.get(4)?;
    let tags_str: String = row.get(6)?;
    let priority_str: String = row.get(7)?;
    let created_by: String = row.get(9)?;
    let created_str: String = row.get(10)?;
    let scheduled_str: Option<String> = row.get(11)?;

    Ok(PendingMessage {
        id: PendingMessageId(rows::uuid_col(0, &id_str)?),
        content: row.get(1)?,
        template_id: rows::opt_uuid_col(2, template_id_str)?.map(TemplateId),
        template_title: row.get(3)?,
        target_audience: rows::json_col(4, &audience_str)?,
        category: row.get(5)?,
        tags: rows::json_col(6, &tags_str)?,
        priority: rows::enum_col(7, &priority_str, Priority::from_str, "priority")?,
        estimated_reach: row.get(8)?,
        created_by: UserId::new(created_by),
        created_at: rows::ts_col(10, &created_str)?,
        scheduled_for: rows::opt_ts_col(11, scheduled_str)?,
        context: row.get(12)?,
    })
}
