//! Message templates and the variable-substitution renderer.
//!
//! A template's `content` may embed `{variable_name}` placeholders.  The
//! renderer substitutes caller-supplied bindings into those placeholders and
//! reports which required variables were missing.  It never fails outright,
//! so previews over partial input stay cheap.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::types::{TemplateId, UserId};

// Placeholder tokens are `{name}` where name is one or more word characters.
// Anything else (`{}`, `{two words}`, a lone `{`) is literal text.
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder regex"));

// ---------------------------------------------------------------------------
// Template variable schema
// ---------------------------------------------------------------------------

/// Input widget class for a template variable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Text,
    Number,
    Date,
    Select,
}

impl VariableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKind::Text => "text",
            VariableKind::Number => "number",
            VariableKind::Date => "date",
            VariableKind::Select => "select",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(VariableKind::Text),
            "number" => Some(VariableKind::Number),
            "date" => Some(VariableKind::Date),
            "select" => Some(VariableKind::Select),
            _ => None,
        }
    }
}

/// Declared variable of a template.  `name` must be unique within the
/// template; `options` is only meaningful (and then must be non-empty) for
/// [`VariableKind::Select`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateVariable {
    /// Placeholder name as it appears inside `{...}` in the content.
    pub name: String,
    /// Input widget class.
    pub kind: VariableKind,
    /// Whether a binding is mandatory for a complete render.
    pub required: bool,
    /// Allowed values for select variables, empty otherwise.
    #[serde(default)]
    pub options: Vec<String>,
    /// Short hint shown next to the input.
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Value pre-filled by the UI; the renderer itself never applies it.
    #[serde(default)]
    pub default_value: Option<String>,
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A reusable outbound-message template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageTemplate {
    /// Unique template identifier.
    pub id: TemplateId,
    /// Display title.
    pub title: String,
    /// Message body, possibly containing `{variable}` placeholders.
    pub content: String,
    /// Free-form grouping label ("welcome", "reminder", ...).
    pub category: String,
    /// Search keywords.
    pub tags: Vec<String>,
    /// Audience segments this template is aimed at.
    pub target_audience: Vec<String>,
    /// Author's expected engagement score, 0-100.
    pub estimated_engagement: u8,
    /// Inactive templates are hidden from the default catalog listing.
    pub is_active: bool,
    /// How many times the template has been used to send a message.
    pub usage_count: u64,
    /// Who created the template.
    pub created_by: UserId,
    /// When the template was created.
    pub created_at: DateTime<Utc>,
    /// Last time `record_use` was applied, if ever.
    pub last_used: Option<DateTime<Utc>>,
    /// Declared variable schema.
    pub variables: Vec<TemplateVariable>,
}

impl MessageTemplate {
    /// Substitute `bindings` into the template content.
    ///
    /// Never fails: placeholders with no binding, or with an empty binding,
    /// are left verbatim in the output, and every required variable whose
    /// binding is absent or blank is reported in
    /// [`RenderOutcome::missing_variables`].  A select variable bound to a
    /// value outside its options is reported the same way.
    pub fn render(&self, bindings: &HashMap<String, String>) -> RenderOutcome {
        let mut missing = Vec::new();
        for var in &self.variables {
            match bindings.get(&var.name) {
                None => {
                    if var.required {
                        missing.push(var.name.clone());
                    }
                }
                Some(value) => {
                    if value.trim().is_empty() {
                        if var.required {
                            missing.push(var.name.clone());
                        }
                    } else if var.kind == VariableKind::Select
                        && !var.options.iter().any(|o| o == value)
                    {
                        missing.push(var.name.clone());
                    }
                }
            }
        }

        let text = PLACEHOLDER_RE
            .replace_all(&self.content, |caps: &Captures| {
                let name = &caps[1];
                match bindings.get(name) {
                    Some(value) if !value.is_empty() => value.clone(),
                    _ => caps[0].to_string(),
                }
            })
            .into_owned();

        RenderOutcome {
            text,
            missing_variables: missing,
        }
    }

    /// Placeholder names that appear in the content but have no entry in the
    /// variable schema.  A mismatch is tolerated (the renderer leaves such
    /// tokens verbatim); callers may surface it as a warning.
    pub fn undeclared_placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = PLACEHOLDER_RE
            .captures_iter(&self.content)
            .map(|caps| caps[1].to_string())
            .filter(|name| !self.variables.iter().any(|v| &v.name == name))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Record one use of this template.
    pub fn record_use(&mut self, at: DateTime<Utc>) {
        self.usage_count += 1;
        self.last_used = Some(at);
    }
}

// ---------------------------------------------------------------------------
// Render outcome
// ---------------------------------------------------------------------------

/// Result of a render pass.  `text` is always produced; a non-empty
/// `missing_variables` means the render was partial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderOutcome {
    pub text: String,
    pub missing_variables: Vec<String>,
}

impl RenderOutcome {
    pub fn is_complete(&self) -> bool {
        self.missing_variables.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Catalog input types
// ---------------------------------------------------------------------------

/// Fields supplied when creating a template.  Id, creation time and usage
/// counters are assigned by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    pub estimated_engagement: u8,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
}

impl NewTemplate {
    pub fn into_template(self, created_by: UserId, now: DateTime<Utc>) -> MessageTemplate {
        MessageTemplate {
            id: TemplateId::new(),
            title: self.title,
            content: self.content,
            category: self.category,
            tags: self.tags,
            target_audience: self.target_audience,
            estimated_engagement: self.estimated_engagement,
            is_active: true,
            usage_count: 0,
            created_by,
            created_at: now,
            last_used: None,
            variables: self.variables,
        }
    }
}

/// Partial update: every `Some` field replaces the stored one, `None` fields
/// are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub target_audience: Option<Vec<String>>,
    pub estimated_engagement: Option<u8>,
    pub variables: Option<Vec<TemplateVariable>>,
}

impl TemplateUpdate {
    pub fn apply_to(&self, template: &mut MessageTemplate) {
        if let Some(title) = &self.title {
            template.title = title.clone();
        }
        if let Some(content) = &self.content {
            template.content = content.clone();
        }
        if let Some(category) = &self.category {
            template.category = category.clone();
        }
        if let Some(tags) = &self.tags {
            template.tags = tags.clone();
        }
        if let Some(audience) = &self.target_audience {
            template.target_audience = audience.clone();
        }
        if let Some(engagement) = self.estimated_engagement {
            template.estimated_engagement = engagement;
        }
        if let Some(variables) = &self.variables {
            template.variables = variables.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Catalog listing filter.  `query` matches title, content or any tag,
/// case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateFilter {
    pub category: Option<String>,
    pub query: Option<String>,
    pub active_only: bool,
}

impl TemplateFilter {
    pub fn matches(&self, template: &MessageTemplate) -> bool {
        if self.active_only && !template.is_active {
            return false;
        }
        if let Some(category) = &self.category {
            if &template.category != category {
                return false;
            }
        }
        if let Some(query) = &self.query {
            let needle = query.to_lowercase();
            if needle.is_empty() {
                return true;
            }
            let in_title = template.title.to_lowercase().contains(&needle);
            let in_content = template.content.to_lowercase().contains(&needle);
            let in_tags = template
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&needle));
            if !(in_title || in_content || in_tags) {
                return false;
            }
        }
        true
    }
}

/// Catalog sort order.  All orders are descending with newest-first as the
/// tiebreak, matching how the catalog is browsed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSort {
    #[default]
    Usage,
    Date,
    Engagement,
}

impl TemplateSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateSort::Usage => "usage",
            TemplateSort::Date => "date",
            TemplateSort::Engagement => "engagement",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "usage" => Some(TemplateSort::Usage),
            "date" => Some(TemplateSort::Date),
            "engagement" => Some(TemplateSort::Engagement),
            _ => None,
        }
    }

    pub fn apply(&self, templates: &mut [MessageTemplate]) {
        match self {
            TemplateSort::Usage => {
                templates.sort_by(|a, b| {
                    b.usage_count
                        .cmp(&a.usage_count)
                        .then(b.created_at.cmp(&a.created_at))
                });
            }
            TemplateSort::Date => {
                templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            TemplateSort::Engagement => {
                templates.sort_by(|a, b| {
                    b.estimated_engagement
                        .cmp(&a.estimated_engagement)
                        .then(b.created_at.cmp(&a.created_at))
                });
            }
        }
    }
}
