//! CRUD operations for the validation audit trail.

use rusqlite::params;

use tribune_shared::{AuditAction, AuditRecord, MessageId, PendingMessageId, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::rows;

impl Database {
    /// Append an audit record.  The action is decomposed into the `action`,
    /// `message_id` and `reason` columns.
    pub fn record_audit(&self, record: &AuditRecord) -> Result<()> {
        let (message_id, reason) = match &record.action {
            AuditAction::Approved { message_id } => (Some(message_id.to_string()), None),
            AuditAction::Rejected { reason } => (None, Some(reason.clone())),
            AuditAction::Edited => (None, None),
        };

        self.conn().execute(
            "INSERT INTO validation_audit (id, pending_id, action, message_id, reason,
                                           reviewer, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.pending_id.to_string(),
                record.action.as_str(),
                message_id,
                reason,
                record.reviewer.as_str(),
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All audit records for one pending message, oldest first.
    pub fn list_audit_for(&self, pending_id: PendingMessageId) -> Result<Vec<AuditRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, pending_id, action, message_id, reason, reviewer, recorded_at
             FROM validation_audit
             WHERE pending_id = ?1
             ORDER BY recorded_at ASC, rowid ASC",
        )?;

        let mapped = stmt.query_map(params![pending_id.to_string()], row_to_audit)?;

        let mut records = Vec::new();
        for row in mapped {
            records.push(row?);
        }
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to an [`AuditRecord`], recomposing the action from
/// its three columns.
fn row_to_audit(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    let id_str: String = row.get(0)?;
    let pending_str: String = row.get(1)?;
    let action_str: String = row.get(2)?;
    let message_id_str: Option<String> = row.get(3)?;
    let reason: Option<String> = row.get(4)?;
    let reviewer: String = row.get(5)?;
    let recorded_str: String = row.get(6)?;

    let action = match action_str.as_str() {
        "approved" => {
            let message_id = message_id_str.ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    "approved audit record without message_id".to_string().into(),
                )
            })?;
            AuditAction::Approved {
                message_id: MessageId(rows::uuid_col(3, &message_id)?),
            }
        }
        "rejected" => AuditAction::Rejected {
            reason: reason.unwrap_or_default(),
        },
        "edited" => AuditAction::Edited,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown audit action: {other}").into(),
            ))
        }
    };

    Ok(AuditRecord {
        id: rows::uuid_col(0, &id_str)?,
        pending_id: PendingMessageId(rows::uuid_col(1, &pending_str)?),
        action,
        reviewer: UserId::new(reviewer),
        recorded_at: rows::ts_col(6, &recorded_str)?,
    })
}
