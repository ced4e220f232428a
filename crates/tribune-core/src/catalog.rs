//! Template catalog: CRUD, search, and rendering over a [`TemplateStore`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use tribune_shared::{
    MessageTemplate, NewTemplate, RenderOutcome, TemplateFilter, TemplateId, TemplateSort,
    TemplateUpdate, UserId, VariableKind,
};
use tribune_store::{StoreError, TemplateStore};

use crate::error::{CoreError, Result};
use crate::locks::EntityLocks;

pub struct TemplateCatalog {
    store: Arc<dyn TemplateStore>,
    locks: EntityLocks<TemplateId>,
}

impl TemplateCatalog {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self {
            store,
            locks: EntityLocks::new(),
        }
    }

    /// Create a template.  Id, creation time and usage counters are assigned
    /// here; the schema is checked before anything is stored.
    pub fn create(&self, new: NewTemplate, created_by: UserId) -> Result<MessageTemplate> {
        let template = new.into_template(created_by, Utc::now());
        check_template(&template)?;
        warn_on_undeclared(&template);

        self.store.insert_template(&template)?;
        info!(template_id = %template.id, title = %template.title, "template created");
        Ok(template)
    }

    /// Fetch a template by id, active or not.
    pub fn get(&self, id: TemplateId) -> Result<MessageTemplate> {
        self.store.get_template(id).map_err(|e| not_found(id, e))
    }

    /// Apply a partial update.  Runs under the template's entity lock so
    /// concurrent updates cannot interleave their read-modify-write cycles.
    pub async fn update(&self, id: TemplateId, update: TemplateUpdate) -> Result<MessageTemplate> {
        let _guard = self.locks.acquire(&id).await;

        let mut template = self.get(id)?;
        update.apply_to(&mut template);
        check_template(&template)?;
        warn_on_undeclared(&template);

        self.store
            .put_template(&template)
            .map_err(|e| not_found(id, e))?;
        info!(template_id = %id, "template updated");
        Ok(template)
    }

    /// Activate or deactivate a template.  Inactive templates stay stored
    /// (ledger history keeps referring to them) but drop out of active-only
    /// listings.
    pub async fn set_active(&self, id: TemplateId, active: bool) -> Result<MessageTemplate> {
        let _guard = self.locks.acquire(&id).await;

        let mut template = self.get(id)?;
        template.is_active = active;
        self.store
            .put_template(&template)
            .map_err(|e| not_found(id, e))?;
        info!(template_id = %id, active, "template active flag changed");
        Ok(template)
    }

    /// Delete a template from the catalog.
    pub fn remove(&self, id: TemplateId) -> Result<()> {
        if !self.store.remove_template(id)? {
            return Err(CoreError::TemplateNotFound(id));
        }
        info!(template_id = %id, "template removed");
        Ok(())
    }

    /// List templates matching `filter`, ordered by `sort`.
    pub fn list(
        &self,
        filter: &TemplateFilter,
        sort: TemplateSort,
    ) -> Result<Vec<MessageTemplate>> {
        Ok(self.store.list_templates(filter, sort)?)
    }

    /// Distinct categories with template counts, alphabetical.
    pub fn categories(&self) -> Result<Vec<(String, usize)>> {
        let templates = self
            .store
            .list_templates(&TemplateFilter::default(), TemplateSort::Date)?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for template in templates {
            *counts.entry(template.category).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }

    /// Render a stored template against `bindings`.  Works for inactive
    /// templates too; previews do not depend on catalog visibility.
    pub fn render(
        &self,
        id: TemplateId,
        bindings: &HashMap<String, String>,
    ) -> Result<RenderOutcome> {
        let template = self.get(id)?;
        Ok(template.render(bindings))
    }

    /// Record one use of the template (usage counter + last-used stamp).
    pub async fn record_use(&self, id: TemplateId) -> Result<MessageTemplate> {
        let _guard = self.locks.acquire(&id).await;

        let mut template = self.get(id)?;
        template.record_use(Utc::now());
        self.store
            .put_template(&template)
            .map_err(|e| not_found(id, e))?;
        Ok(template)
    }

    /// Drop idle per-template locks.
    pub async fn purge_idle_locks(&self) -> usize {
        self.locks.purge_unused().await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(id: TemplateId, e: StoreError) -> CoreError {
    match e {
        StoreError::NotFound => CoreError::TemplateNotFound(id),
        other => CoreError::Store(other),
    }
}

/// Structural checks applied on create and after every update.
fn check_template(template: &MessageTemplate) -> Result<()> {
    if template.title.trim().is_empty() {
        return Err(CoreError::Validation("template title is empty".to_string()));
    }
    if template.content.trim().is_empty() {
        return Err(CoreError::Validation(
            "template content is empty".to_string(),
        ));
    }
    if template.estimated_engagement > 100 {
        return Err(CoreError::Validation(format!(
            "estimated engagement {} is out of range (0-100)",
            template.estimated_engagement
        )));
    }

    let mut seen = Vec::new();
    for variable in &template.variables {
        if variable.name.is_empty()
            || !variable
                .name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(CoreError::Validation(format!(
                "variable name {:?} is not addressable as a placeholder",
                variable.name
            )));
        }
        if seen.contains(&variable.name) {
            return Err(CoreError::Validation(format!(
                "duplicate variable name: {}",
                variable.name
            )));
        }
        seen.push(variable.name.clone());

        if variable.kind == VariableKind::Select && variable.options.is_empty() {
            return Err(CoreError::Validation(format!(
                "select variable {} has no options",
                variable.name
            )));
        }
    }
    Ok(())
}

/// Placeholder/schema mismatches are tolerated but logged.
fn warn_on_undeclared(template: &MessageTemplate) {
    let undeclared = template.undeclared_placeholders();
    if !undeclared.is_empty() {
        warn!(
            template_id = %template.id,
            placeholders = ?undeclared,
            "template content references undeclared placeholders"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribune_shared::TemplateVariable;
    use tribune_store::MemoryStore;

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::new(Arc::new(MemoryStore::new()))
    }

    fn new_template(title: &str, content: &str) -> NewTemplate {
        NewTemplate {
            title: title.to_string(),
            content: content.to_string(),
            category: "welcome".to_string(),
            tags: vec!["intro".to_string()],
            target_audience: Vec::new(),
            estimated_engagement: 80,
            variables: Vec::new(),
        }
    }

    fn select_variable(name: &str, options: Vec<&str>) -> TemplateVariable {
        TemplateVariable {
            name: name.to_string(),
            kind: VariableKind::Select,
            required: true,
            options: options.into_iter().map(String::from).collect(),
            placeholder: None,
            default_value: None,
        }
    }

    #[test]
    fn test_create_assigns_id_and_defaults() {
        let catalog = catalog();
        let tpl = catalog
            .create(new_template("Welcome", "Hello!"), UserId::new("author-1"))
            .unwrap();
        assert!(tpl.is_active);
        assert_eq!(tpl.usage_count, 0);
        assert!(tpl.last_used.is_none());
        assert_eq!(catalog.get(tpl.id).unwrap().title, "Welcome");
    }

    #[test]
    fn test_create_rejects_blank_fields() {
        let catalog = catalog();
        assert!(matches!(
            catalog.create(new_template("  ", "Hello"), UserId::new("a")),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            catalog.create(new_template("Hi", "   "), UserId::new("a")),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_create_rejects_engagement_out_of_range() {
        let catalog = catalog();
        let mut new = new_template("Hi", "Hello");
        new.estimated_engagement = 101;
        assert!(matches!(
            catalog.create(new, UserId::new("a")),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_create_rejects_bad_variable_schemas() {
        let catalog = catalog();

        let mut dup = new_template("Hi", "Hello {name}");
        dup.variables = vec![
            select_variable("name", vec!["a"]),
            select_variable("name", vec!["b"]),
        ];
        assert!(matches!(
            catalog.create(dup, UserId::new("a")),
            Err(CoreError::Validation(_))
        ));

        let mut empty_options = new_template("Hi", "Hello {tier}");
        empty_options.variables = vec![select_variable("tier", vec![])];
        assert!(matches!(
            catalog.create(empty_options, UserId::new("a")),
            Err(CoreError::Validation(_))
        ));

        let mut bad_name = new_template("Hi", "Hello");
        bad_name.variables = vec![select_variable("first name", vec!["x"])];
        assert!(matches!(
            catalog.create(bad_name, UserId::new("a")),
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_merges_and_revalidates() {
        let catalog = catalog();
        let tpl = catalog
            .create(new_template("Welcome", "Hello!"), UserId::new("a"))
            .unwrap();

        let updated = catalog
            .update(
                tpl.id,
                TemplateUpdate {
                    title: Some("Welcome v2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Welcome v2");
        assert_eq!(updated.content, "Hello!");

        let blanked = catalog
            .update(
                tpl.id,
                TemplateUpdate {
                    content: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(blanked, Err(CoreError::Validation(_))));
        // Failed update leaves the stored template untouched.
        assert_eq!(catalog.get(tpl.id).unwrap().content, "Hello!");
    }

    #[tokio::test]
    async fn test_set_active_hides_from_active_listing() {
        let catalog = catalog();
        let tpl = catalog
            .create(new_template("Welcome", "Hello!"), UserId::new("a"))
            .unwrap();

        catalog.set_active(tpl.id, false).await.unwrap();

        let active = catalog
            .list(
                &TemplateFilter {
                    active_only: true,
                    ..Default::default()
                },
                TemplateSort::Date,
            )
            .unwrap();
        assert!(active.is_empty());

        let all = catalog
            .list(&TemplateFilter::default(), TemplateSort::Date)
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let catalog = catalog();
        assert!(matches!(
            catalog.remove(TemplateId::new()),
            Err(CoreError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_categories_counts() {
        let catalog = catalog();
        catalog
            .create(new_template("a", "x"), UserId::new("a"))
            .unwrap();
        catalog
            .create(new_template("b", "y"), UserId::new("a"))
            .unwrap();
        let mut reminder = new_template("c", "z");
        reminder.category = "reminder".to_string();
        catalog.create(reminder, UserId::new("a")).unwrap();

        assert_eq!(
            catalog.categories().unwrap(),
            vec![("reminder".to_string(), 1), ("welcome".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_record_use_bumps_counter() {
        let catalog = catalog();
        let tpl = catalog
            .create(new_template("Welcome", "Hello!"), UserId::new("a"))
            .unwrap();

        catalog.record_use(tpl.id).await.unwrap();
        let tpl = catalog.record_use(tpl.id).await.unwrap();
        assert_eq!(tpl.usage_count, 2);
        assert!(tpl.last_used.is_some());
    }

    #[test]
    fn test_render_by_id() {
        let catalog = catalog();
        let mut new = new_template("Welcome", "Hi {name}");
        new.variables = vec![TemplateVariable {
            name: "name".to_string(),
            kind: VariableKind::Text,
            required: true,
            options: Vec::new(),
            placeholder: None,
            default_value: None,
        }];
        let tpl = catalog.create(new, UserId::new("a")).unwrap();

        let mut bindings = HashMap::new();
        bindings.insert("name".to_string(), "Ada".to_string());
        let out = catalog.render(tpl.id, &bindings).unwrap();
        assert_eq!(out.text, "Hi Ada");

        assert!(matches!(
            catalog.render(TemplateId::new(), &bindings),
            Err(CoreError::TemplateNotFound(_))
        ));
    }
}
