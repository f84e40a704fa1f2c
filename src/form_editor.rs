//! Create/edit state for a single template
//!
//! The editor has two levels: the template itself (name, description,
//! theme, tags, fields) and a field builder that assembles one pending field
//! before it is appended. Nothing reaches the store until [`TemplateForm::submit`]
//! passes validation.

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    Field, FieldType, Layout, NewTemplate, ResolvedTheme, Template, TemplatePatch, Theme,
};
use crate::preview::escape_html;
use crate::store::TemplateStore;

/// Where a validation or save message belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSlot {
    Name,
    Fields,
    NewField,
    Form,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("template has validation errors")]
    Invalid,

    #[error("failed to save template: {0}")]
    Save(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

/// Editable attributes of a template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub theme: Theme,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub shared: bool,
    pub shared_slug: Option<String>,
}

impl Default for TemplateDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            fields: Vec::new(),
            theme: Theme::starter(),
            tags: Vec::new(),
            is_archived: false,
            shared: false,
            shared_slug: None,
        }
    }
}

impl From<&Template> for TemplateDraft {
    fn from(template: &Template) -> Self {
        Self {
            name: template.name.clone(),
            description: template.description.clone().unwrap_or_default(),
            fields: template.fields.clone(),
            theme: template.theme.clone().unwrap_or_else(Theme::starter),
            tags: template.tags.clone(),
            is_archived: template.is_archived,
            shared: template.shared,
            shared_slug: template.shared_slug.clone(),
        }
    }
}

/// The pending field in the builder
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldDraft {
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub placeholder: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TemplateForm {
    mode: FormMode,
    pub draft: TemplateDraft,
    pub new_field: FieldDraft,
    pub new_tag: String,
    pub new_option: String,
    errors: BTreeMap<ErrorSlot, String>,
}

impl TemplateForm {
    /// Create mode when `initial` is absent, edit mode seeded from it
    /// otherwise.
    pub fn new(initial: Option<&Template>) -> Self {
        let (mode, draft) = match initial {
            Some(template) => (
                FormMode::Edit {
                    id: template.id.clone(),
                },
                TemplateDraft::from(template),
            ),
            None => (FormMode::Create, TemplateDraft::default()),
        };

        Self {
            mode,
            draft,
            new_field: FieldDraft::default(),
            new_tag: String::new(),
            new_option: String::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit { .. })
    }

    pub fn error(&self, slot: ErrorSlot) -> Option<&str> {
        self.errors.get(&slot).map(String::as_str)
    }

    // --- template attributes ---

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
        self.errors.remove(&ErrorSlot::Name);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    pub fn set_shared(&mut self, shared: bool) {
        self.draft.shared = shared;
    }

    pub fn set_theme_color(&mut self, color: impl Into<String>) {
        self.draft.theme.color = Some(color.into());
    }

    pub fn set_theme_layout(&mut self, layout: Layout) {
        self.draft.theme.layout = Some(layout);
    }

    pub fn set_theme_font(&mut self, font: impl Into<String>) {
        self.draft.theme.font = Some(font.into());
    }

    // --- tags ---

    pub fn set_new_tag(&mut self, tag: impl Into<String>) {
        self.new_tag = tag.into();
    }

    /// Appends the trimmed pending tag unless it is blank or already present.
    pub fn add_tag(&mut self) {
        let tag = self.new_tag.trim().to_string();
        self.new_tag.clear();

        if tag.is_empty() || self.draft.tags.contains(&tag) {
            return;
        }
        self.draft.tags.push(tag);
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.draft.tags.retain(|t| t != tag);
    }

    // --- field builder ---

    pub fn set_field_label(&mut self, label: impl Into<String>) {
        self.new_field.label = label.into();
    }

    /// Changes the pending field type. Leaving `select` drops its options.
    pub fn set_field_type(&mut self, field_type: FieldType) {
        self.new_field.field_type = field_type;
        if field_type != FieldType::Select {
            self.new_field.options.clear();
        }
    }

    pub fn set_field_required(&mut self, required: bool) {
        self.new_field.required = required;
    }

    pub fn set_field_placeholder(&mut self, placeholder: impl Into<String>) {
        self.new_field.placeholder = placeholder.into();
    }

    pub fn set_new_option(&mut self, option: impl Into<String>) {
        self.new_option = option.into();
    }

    /// Appends the trimmed pending option; blank input is ignored.
    pub fn add_option(&mut self) {
        let option = self.new_option.trim().to_string();
        if option.is_empty() {
            return;
        }
        self.new_field.options.push(option);
        self.new_option.clear();
    }

    pub fn remove_option(&mut self, index: usize) {
        if index < self.new_field.options.len() {
            self.new_field.options.remove(index);
        }
    }

    /// Appends the pending field with a fresh id and resets the builder.
    ///
    /// Returns `false`, with a `NewField` error, when the label is blank.
    pub fn add_field(&mut self) -> bool {
        if self.new_field.label.trim().is_empty() {
            self.errors
                .insert(ErrorSlot::NewField, "Field label is required".to_string());
            return false;
        }

        let pending = std::mem::take(&mut self.new_field);
        let options = (pending.field_type == FieldType::Select).then_some(pending.options);
        let placeholder = Some(pending.placeholder).filter(|p| !p.is_empty());

        self.draft.fields.push(Field {
            id: Uuid::new_v4().to_string(),
            label: pending.label,
            field_type: pending.field_type,
            required: pending.required,
            placeholder,
            options,
            default_value: None,
            validation: None,
        });
        self.new_option.clear();

        self.errors.remove(&ErrorSlot::NewField);
        self.errors.remove(&ErrorSlot::Fields);
        true
    }

    /// Removes the field at `index`; position decides, not content.
    pub fn remove_field(&mut self, index: usize) {
        if index < self.draft.fields.len() {
            self.draft.fields.remove(index);
        }
    }

    // --- submit ---

    /// Replaces the error map with the current validation result.
    pub fn validate(&mut self) -> bool {
        self.errors.clear();

        if self.draft.name.trim().is_empty() {
            self.errors
                .insert(ErrorSlot::Name, "Template name is required".to_string());
        }
        if self.draft.fields.is_empty() {
            self.errors
                .insert(ErrorSlot::Fields, "At least one field is required".to_string());
        }

        self.errors.is_empty()
    }

    /// Validates, then creates or updates through `store`.
    ///
    /// A store failure sets the `Form` error and keeps everything entered.
    pub async fn submit(&mut self, store: &dyn TemplateStore) -> Result<Template, SubmitError> {
        if !self.validate() {
            return Err(SubmitError::Invalid);
        }

        let result = match &self.mode {
            FormMode::Create => store.create_template(self.new_template()).await,
            FormMode::Edit { id } => store.update_template(id, self.patch()).await,
        };

        match result {
            Ok(template) => Ok(template),
            Err(err) => {
                tracing::error!(error = %err, "Error saving template");
                self.errors.insert(
                    ErrorSlot::Form,
                    "Failed to save template. Please try again.".to_string(),
                );
                Err(SubmitError::Save(err))
            }
        }
    }

    /// Create payload for the current draft
    pub fn new_template(&self) -> NewTemplate {
        let draft = self.draft.clone();
        NewTemplate {
            name: draft.name,
            description: Some(draft.description).filter(|d| !d.is_empty()),
            fields: draft.fields,
            theme: Some(draft.theme),
            tags: draft.tags,
            is_archived: draft.is_archived,
            shared: draft.shared,
            shared_slug: draft.shared_slug,
        }
    }

    /// Update payload carrying every editable attribute
    pub fn patch(&self) -> TemplatePatch {
        let draft = self.draft.clone();
        TemplatePatch {
            name: Some(draft.name),
            description: Some(draft.description),
            fields: Some(draft.fields),
            theme: Some(draft.theme),
            tags: Some(draft.tags),
            is_archived: Some(draft.is_archived),
            shared: Some(draft.shared),
            shared_slug: Some(draft.shared_slug.unwrap_or_default()),
        }
    }
}

impl TemplateForm {
    /// Renders the editor as an HTML form with its current errors.
    pub fn render(&self) -> String {
        let heading = if self.is_editing() { "Edit" } else { "Create" };
        let mut html = format!(r#"<form class="template-form"><h2>{heading} Template</h2>"#);

        if let Some(message) = self.error(ErrorSlot::Form) {
            html.push_str(&format!(r#"<div class="form-error">{}</div>"#, escape_html(message)));
        }

        html.push_str(&format!(
            r#"<label>Template Name *<input type="text" name="name" value="{}"></label>"#,
            escape_html(&self.draft.name)
        ));
        html.push_str(&slot_error(self.error(ErrorSlot::Name)));
        html.push_str(&format!(
            r#"<label>Description<textarea name="description">{}</textarea></label>"#,
            escape_html(&self.draft.description)
        ));

        let theme = ResolvedTheme::from(Some(&self.draft.theme));
        html.push_str(&format!(
            r#"<fieldset class="theme"><input type="color" name="color" value="{}"><span class="layout">{}</span><span class="font">{}</span></fieldset>"#,
            escape_html(&theme.color),
            theme.layout.width_class(),
            escape_html(&theme.font),
        ));

        html.push_str(r#"<ol class="fields">"#);
        for field in &self.draft.fields {
            let required = if field.required { " *" } else { "" };
            html.push_str(&format!(
                r#"<li data-id="{}">{}{required} <small>{}</small></li>"#,
                escape_html(&field.id),
                escape_html(&field.label),
                field.field_type.as_str(),
            ));
        }
        html.push_str("</ol>");
        html.push_str(&slot_error(self.error(ErrorSlot::Fields)));
        html.push_str(&slot_error(self.error(ErrorSlot::NewField)));

        html.push_str(r#"<div class="tags">"#);
        for tag in &self.draft.tags {
            html.push_str(&format!(r#"<span class="tag">{}</span>"#, escape_html(tag)));
        }
        html.push_str("</div>");

        let submit = if self.is_editing() { "Update" } else { "Create" };
        html.push_str(&format!(r#"<button type="submit">{submit} Template</button></form>"#));
        html
    }
}

fn slot_error(message: Option<&str>) -> String {
    message
        .map(|m| format!(r#"<p class="field-error">{}</p>"#, escape_html(m)))
        .unwrap_or_default()
}
