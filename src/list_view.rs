//! Template list state: fetching, search and tag filtering, and the
//! archive/delete actions
//!
//! Mutations never patch the local sequence. After an archive or delete the
//! list re-fetches everything from the store, so what is shown is always
//! what the store last returned.

use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::model::Template;
use crate::preview::escape_html;
use crate::store::TemplateStore;

/// Prompt shown before a delete
pub const DELETE_CONFIRMATION: &str =
    "Are you sure you want to delete this template? This action cannot be undone.";

/// Interactive yes/no confirmation
pub trait Confirm: Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// What a delete request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

#[derive(Debug, Default)]
pub struct TemplateList {
    pub templates: Vec<Template>,
    pub loading: bool,
    pub show_archived: bool,
    pub search_term: String,
    pub selected_tags: Vec<String>,
    /// List-level message of the last failed store call
    pub error: Option<String>,
}

impl TemplateList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-fetches the whole sequence with the current archived toggle.
    ///
    /// On failure the previous sequence is kept and `error` is set.
    pub async fn load(&mut self, store: &dyn TemplateStore) -> Result<(), StoreError> {
        self.loading = true;
        let result = store.fetch_templates(self.show_archived).await;
        self.loading = false;

        match result {
            Ok(templates) => {
                self.templates = templates;
                self.error = None;
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "Error loading templates");
                self.error = Some("Failed to load templates.".to_string());
                Err(err)
            }
        }
    }

    /// Flips archived visibility and re-fetches.
    pub async fn set_show_archived(
        &mut self,
        store: &dyn TemplateStore,
        show_archived: bool,
    ) -> Result<(), StoreError> {
        self.show_archived = show_archived;
        self.load(store).await
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn set_selected_tags(&mut self, tags: Vec<String>) {
        self.selected_tags = tags;
    }

    /// Sorted, de-duplicated tags across the loaded templates
    pub fn all_tags(&self) -> Vec<String> {
        self.templates
            .iter()
            .flat_map(|t| t.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Templates matching both the search term and every selected tag
    pub fn filtered(&self) -> Vec<&Template> {
        self.templates
            .iter()
            .filter(|t| matches_search(t, &self.search_term) && matches_tags(t, &self.selected_tags))
            .collect()
    }

    /// Archives `id` and re-fetches. No confirmation is asked.
    ///
    /// Only the archive call decides the result. A failed re-fetch leaves
    /// the list-level `error` set.
    pub async fn archive(&mut self, store: &dyn TemplateStore, id: &str) -> Result<(), StoreError> {
        if let Err(err) = store.archive_template(id).await {
            tracing::error!(error = %err, template_id = %id, "Error archiving template");
            self.error = Some("Failed to archive template.".to_string());
            return Err(err);
        }
        self.refresh(store).await;
        Ok(())
    }

    /// Deletes `id` after `confirm` agrees, then re-fetches.
    ///
    /// As with [`TemplateList::archive`], a failed re-fetch is not a failed
    /// delete.
    pub async fn delete(
        &mut self,
        store: &dyn TemplateStore,
        id: &str,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, StoreError> {
        if !confirm.confirm(DELETE_CONFIRMATION) {
            return Ok(DeleteOutcome::Cancelled);
        }

        if let Err(err) = store.delete_template(id).await {
            tracing::error!(error = %err, template_id = %id, "Error deleting template");
            self.error = Some("Failed to delete template.".to_string());
            return Err(err);
        }
        self.refresh(store).await;
        Ok(DeleteOutcome::Deleted)
    }

    // Re-fetch after a committed mutation; `load` already logs and records
    // the failure.
    async fn refresh(&mut self, store: &dyn TemplateStore) {
        let _ = self.load(store).await;
    }

    /// Renders the filtered templates as HTML cards.
    pub fn render_cards(&self) -> String {
        if self.loading {
            return r#"<div class="spinner" role="status">Loading...</div>"#.to_string();
        }

        let filtered = self.filtered();
        if filtered.is_empty() {
            return r#"<div class="empty">No templates found.</div>"#.to_string();
        }

        let mut html = String::from(r#"<div class="template-grid">"#);
        for template in filtered {
            html.push_str(&render_card(template));
        }
        html.push_str("</div>");
        html
    }
}

fn matches_search(template: &Template, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let term = term.to_lowercase();
    template.name.to_lowercase().contains(&term)
        || template
            .description
            .as_ref()
            .is_some_and(|d| d.to_lowercase().contains(&term))
}

fn matches_tags(template: &Template, selected: &[String]) -> bool {
    selected.iter().all(|tag| template.tags.contains(tag))
}

fn render_card(template: &Template) -> String {
    let class = if template.is_archived {
        "template-card archived"
    } else {
        "template-card"
    };

    let mut html = format!(
        r#"<div class="{class}" data-id="{id}"><h3>{name}</h3>"#,
        id = escape_html(&template.id),
        name = escape_html(&template.name),
    );

    if let Some(description) = template.description.as_deref().filter(|d| !d.is_empty()) {
        html.push_str(&format!("<p>{}</p>", escape_html(description)));
    }

    html.push_str(&format!(
        r#"<div class="meta"><span>{} fields</span><span>Used {} times</span></div>"#,
        template.fields.len(),
        template.usage_count
    ));

    if template.shared {
        html.push_str(&format!(
            r#"<div class="shared">Shared as /{}</div>"#,
            escape_html(template.shared_slug.as_deref().unwrap_or_default())
        ));
    }

    if !template.tags.is_empty() {
        html.push_str(r#"<div class="tags">"#);
        for tag in &template.tags {
            html.push_str(&format!(r#"<span class="tag">{}</span>"#, escape_html(tag)));
        }
        html.push_str("</div>");
    }

    html.push_str("</div>");
    html
}
