//! CRUD operations for [`MessageTemplate`] records.

use rusqlite::params;
use tribune_shared::{MessageTemplate, TemplateFilter, TemplateId, TemplateSort, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::rows;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new template.
    pub fn insert_template(&self, template: &MessageTemplate) -> Result<()> {
        self.conn().execute(
            "INSERT INTO templates (id, title, content, category, tags, target_audience,
                                    estimated_engagement, is_active, usage_count,
                                    created_by, created_at, last_used, variables)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                template.id.to_string(),
                template.title,
                template.content,
                template.category,
                serde_json::to_string(&template.tags)?,
                serde_json::to_string(&template.target_audience)?,
                template.estimated_engagement,
                template.is_active,
                template.usage_count as i64,
                template.created_by.as_str(),
                template.created_at.to_rfc3339(),
                template.last_used.map(|t| t.to_rfc3339()),
                serde_json::to_string(&template.variables)?,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single template by id.
    pub fn get_template(&self, id: TemplateId) -> Result<MessageTemplate> {
        self.conn()
            .query_row(
                "SELECT id, title, content, category, tags, target_audience,
                        estimated_engagement, is_active, usage_count,
                        created_by, created_at, last_used, variables
                 FROM templates
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_template,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List templates matching `filter`, ordered by `sort`.
    ///
    /// Search and ordering reuse the shared matcher and comparators so both
    /// backends agree exactly; the catalog is small enough to scan.
    pub fn list_templates(
        &self,
        filter: &TemplateFilter,
        sort: TemplateSort,
    ) -> Result<Vec<MessageTemplate>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, title, content, category, tags, target_audience,
                    estimated_engagement, is_active, usage_count,
                    created_by, created_at, last_used, variables
             FROM templates",
        )?;

        let rows = stmt.query_map([], row_to_template)?;

        let mut templates = Vec::new();
        for row in rows {
            let template = row?;
            if filter.matches(&template) {
                templates.push(template);
            }
        }
        sort.apply(&mut templates);
        Ok(templates)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace a stored template wholesale.
    pub fn put_template(&self, template: &MessageTemplate) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE templates
             SET title = ?2, content = ?3, category = ?4, tags = ?5,
                 target_audience = ?6, estimated_engagement = ?7, is_active = ?8,
                 usage_count = ?9, created_by = ?10, created_at = ?11,
                 last_used = ?12, variables = ?13
             WHERE id = ?1",
            params![
                template.id.to_string(),
                template.title,
                template.content,
                template.category,
                serde_json::to_string(&template.tags)?,
                serde_json::to_string(&template.target_audience)?,
                template.estimated_engagement,
                template.is_active,
                template.usage_count as i64,
                template.created_by.as_str(),
                template.created_at.to_rfc3339(),
                template.last_used.map(|t| t.to_rfc3339()),
                serde_json::to_string(&template.variables)?,
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

    /// Delete a template by id.  Returns `true` if a row was deleted.
    pub fn remove_template(&self, id: TemplateId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM templates WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`MessageTemplate`].
fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageTemplate> {
    let id_str: String = row.get(0)?;
    let tags_str: String = row.get(4)?;
    let audience_str: String = row.get(5)?;
    let usage_count: i64 = row.get(8)?;
    let created_by: String = row.get(9)?;
    let created_str: String = row.get(10)?;
    let last_used_str: Option<String> = row.get(11)?;
    let variables_str: String = row.get(12)?;

    Ok(MessageTemplate {
        id: TemplateId(rows::uuid_col(0, &id_str)?),
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        tags: rows::json_col(4, &tags_str)?,
        target_audience: rows::json_col(5, &audience_str)?,
        estimated_engagement: row.get(6)?,
        is_active: row.get(7)?,
        usage_count: usage_count as u64,
        created_by: UserId::new(created_by),
        created_at: rows::ts_col(10, &created_str)?,
        last_used: rows::opt_ts_col(11, last_used_str)?,
        variables: rows::json_col(12, &variables_str)?,
    })
}
