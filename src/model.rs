//! Data models for the template manager
//!
//! This module defines the shape of a template and its nested field and theme
//! definitions, plus the payloads used to create and partially update one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Theme colour applied when a template does not declare one
pub const DEFAULT_THEME_COLOR: &str = "#3b82f6";

/// Font family applied when a template does not declare one
pub const DEFAULT_THEME_FONT: &str = "Inter";

/// A user-defined, reusable form schema plus its display theme
///
/// `id`, `usage_count`, `created_at` and `updated_at` are assigned by the
/// store; clients never set them on create (see [`NewTemplate`]).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Template {
    /// Unique identifier assigned at creation
    pub id: String,

    /// Owner of the template
    pub user_id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered field definitions; order drives rendering and editing
    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Soft-delete flag hiding the template from default listings
    #[serde(default)]
    pub is_archived: bool,

    #[serde(default)]
    pub shared: bool,

    /// Public sharing address. Stored and displayed, never resolved.
    #[serde(default)]
    pub shared_slug: Option<String>,

    /// Number of times the template has been used to produce an entry
    #[serde(default)]
    pub usage_count: u64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Returns the theme with read-time defaults applied.
    pub fn effective_theme(&self) -> ResolvedTheme {
        ResolvedTheme::from(self.theme.as_ref())
    }
}

/// One input definition within a template
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Field {
    /// Caller-generated token, unique within the template
    pub id: String,

    pub label: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    /// Only meaningful for [`FieldType::Select`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,

    /// Declared constraints. Kept with the data; nothing enforces them yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
}

/// The fixed set of field kinds a template can declare
///
/// Type strings this build does not know deserialize to [`FieldType::Unknown`]
/// so templates written by newer clients still load.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Textarea,
    Number,
    Email,
    Select,
    Checkbox,
    Date,
    File,
    #[serde(other)]
    Unknown,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Email => "email",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::File => "file",
            FieldType::Unknown => "unknown",
        }
    }
}

/// Default value of a field: text, number or boolean
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Validation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Display theme of a template
///
/// Every attribute is optional; defaults are applied when reading
/// (see [`ResolvedTheme`]) and never written back onto the template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Theme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

impl Theme {
    /// Theme a freshly created template starts with.
    pub fn starter() -> Self {
        Self {
            color: Some(DEFAULT_THEME_COLOR.to_string()),
            layout: Some(Layout::Standard),
            font: Some(DEFAULT_THEME_FONT.to_string()),
            background_color: None,
            text_color: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Standard,
    Compact,
    Wide,
}

impl Layout {
    /// Width class of the rendered form container
    pub fn width_class(self) -> &'static str {
        match self {
            Layout::Compact => "max-w-md",
            Layout::Standard => "max-w-xl",
            Layout::Wide => "max-w-3xl",
        }
    }
}

/// A theme with every display default filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTheme {
    pub color: String,
    pub layout: Layout,
    pub font: String,
}

impl From<Option<&Theme>> for ResolvedTheme {
    fn from(theme: Option<&Theme>) -> Self {
        let theme = theme.cloned().unwrap_or_default();
        Self {
            color: theme.color.unwrap_or_else(|| DEFAULT_THEME_COLOR.to_string()),
            layout: theme.layout.unwrap_or_default(),
            font: theme.font.unwrap_or_else(|| DEFAULT_THEME_FONT.to_string()),
        }
    }
}

/// Payload for creating a template
///
/// Carries no id, timestamps or usage counter; the store assigns those and
/// stamps the owner from the caller's scope.
///
/// # Example
/// ```json
/// {
///   "name": "Invoice",
///   "fields": [{ "id": "f1", "label": "Amount", "type": "number", "required": true }],
///   "tags": ["billing"]
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub shared_slug: Option<String>,
}

/// Partial update of a template
///
/// Absent attributes are left untouched. For `description` and
/// `shared_slug` an empty string clears the stored value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TemplatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_slug: Option<String>,
}

impl TemplatePatch {
    /// Merges the present attributes into `template`.
    ///
    /// Does not touch `updated_at`; the store stamps it.
    pub fn apply_to(self, template: &mut Template) {
        if let Some(name) = self.name {
            template.name = name;
        }
        if let Some(description) = self.description {
            template.description = non_empty(description);
        }
        if let Some(fields) = self.fields {
            template.fields = fields;
        }
        if let Some(theme) = self.theme {
            template.theme = Some(theme);
        }
        if let Some(tags) = self.tags {
            template.tags = tags;
        }
        if let Some(is_archived) = self.is_archived {
            template.is_archived = is_archived;
        }
        if let Some(shared) = self.shared {
            template.shared = shared;
        }
        if let Some(slug) = self.shared_slug {
            template.shared_slug = non_empty(slug);
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Query parameters for listing templates
///
/// # Example
/// Query string: `?include_archived=true&search=invoice&tags=billing,finance`
#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    /// Include archived templates (default: false)
    #[serde(default)]
    pub include_archived: bool,

    /// Case-insensitive substring matched against name or description
    pub search: Option<String>,

    /// Comma-separated tags; a template must carry every one of them
    pub tags: Option<String>,
}

impl ListParams {
    /// Selected tags parsed from the comma-separated `tags` parameter
    pub fn selected_tags(&self) -> Vec<String> {
        split_tags(self.tags.as_deref())
    }
}

/// Query parameters for deleting a template
///
/// Deletion is irreversible and must be confirmed explicitly.
#[derive(Deserialize, Debug, Default)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

/// Query parameters of the template pages
///
/// # Example
/// Query string: `?archived=true&search=form&tags=a,b&preview=<template id>`
#[derive(Deserialize, Debug, Default)]
pub struct PageParams {
    #[serde(default)]
    pub archived: bool,
    pub search: Option<String>,
    pub tags: Option<String>,
    /// Template shown in the preview overlay
    pub preview: Option<String>,
    /// Template opened by the edit view
    pub id: Option<String>,
}

impl PageParams {
    pub fn selected_tags(&self) -> Vec<String> {
        split_tags(self.tags.as_deref())
    }
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Credentials for sign-up and sign-in
#[derive(Deserialize, Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
}
