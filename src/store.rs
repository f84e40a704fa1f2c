//! Template store client
//!
//! [`TemplateStore`] is the only way the rest of the application touches
//! persisted templates. Each call is a single request against the `template`
//! table: no caching, no retries, no transactions spanning several calls.
//!
//! [`RedbTemplateStore`] is the embedded implementation, scoped to the
//! templates of one owner.

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{TABLE_OWNER_INDEX, TABLE_TEMPLATES};
use crate::error::StoreError;
use crate::model::{NewTemplate, Template, TemplatePatch};

/// CRUD verbs over the templates visible to the caller
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// All templates, newest `updated_at` first. Archived ones are left out
    /// unless `include_archived` is set.
    async fn fetch_templates(&self, include_archived: bool) -> Result<Vec<Template>, StoreError>;

    async fn get_template_by_id(&self, id: &str) -> Result<Template, StoreError>;

    /// Inserts a template and returns the materialized row with its id,
    /// timestamps and a zero usage count.
    async fn create_template(&self, template: NewTemplate) -> Result<Template, StoreError>;

    /// Merges `patch` into the stored row and stamps `updated_at`.
    async fn update_template(&self, id: &str, patch: TemplatePatch)
        -> Result<Template, StoreError>;

    /// Sets `is_archived` and stamps `updated_at`. The row is kept.
    async fn archive_template(&self, id: &str) -> Result<(), StoreError>;

    /// Removes the row. Irreversible.
    async fn delete_template(&self, id: &str) -> Result<(), StoreError>;

    /// Adds one to `usage_count` atomically.
    async fn increment_usage_count(&self, id: &str) -> Result<(), StoreError>;
}

/// Checks the two invariants a template must satisfy before it is persisted.
pub fn validate_template(name: &str, field_count: usize) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("Template name is required".into()));
    }
    if field_count == 0 {
        return Err(StoreError::Validation(
            "At least one field is required".into(),
        ));
    }
    Ok(())
}

/// Template store backed by the embedded database
#[derive(Clone)]
pub struct RedbTemplateStore {
    db: Arc<Database>,
    owner: String,
}

impl RedbTemplateStore {
    pub fn new(db: Arc<Database>, owner: impl Into<String>) -> Self {
        Self {
            db,
            owner: owner.into(),
        }
    }

    fn index_key(&self, id: &str) -> String {
        format!("{}:{}", self.owner, id)
    }

    /// Runs `mutate` against the owner's row inside one write transaction and
    /// returns the row as written.
    fn modify<F>(&self, id: &str, mutate: F) -> Result<Template, StoreError>
    where
        F: FnOnce(&mut Template) -> Result<(), StoreError>,
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(TABLE_TEMPLATES)?;

            // Copy the row out so the table can be written below
            let existing = table.get(id)?.map(|guard| guard.value().to_string());
            let mut template = match existing {
                Some(json) => serde_json::from_str::<Template>(&json)?,
                None => return Err(StoreError::NotFound(id.to_string())),
            };
            if template.user_id != self.owner {
                return Err(StoreError::NotFound(id.to_string()));
            }

            mutate(&mut template)?;

            let json = serde_json::to_string(&template)?;
            table.insert(id, json.as_str())?;
            template
        };
        write_txn.commit()?;

        Ok(updated)
    }
}

#[async_trait]
impl TemplateStore for RedbTemplateStore {
    async fn fetch_templates(&self, include_archived: bool) -> Result<Vec<Template>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TABLE_OWNER_INDEX)?;
        let table = read_txn.open_table(TABLE_TEMPLATES)?;

        // "owner:" .. "owner:{" covers every key of this owner; '{' sorts
        // after every character a UUID can contain.
        let start_key = format!("{}:", self.owner);
        let end_key = format!("{}:{{", self.owner);

        let mut templates = Vec::new();
        for entry in index.range(start_key.as_str()..end_key.as_str())? {
            let (_, id) = entry?;
            let Some(row) = table.get(id.value())? else {
                continue;
            };
            let template: Template = serde_json::from_str(row.value())?;
            if include_archived || !template.is_archived {
                templates.push(template);
            }
        }

        templates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(templates)
    }

    async fn get_template_by_id(&self, id: &str) -> Result<Template, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_TEMPLATES)?;

        let row = table
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let template: Template = serde_json::from_str(row.value())?;

        // Rows of other owners are indistinguishable from missing ones
        if template.user_id != self.owner {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(template)
    }

    async fn create_template(&self, new: NewTemplate) -> Result<Template, StoreError> {
        validate_template(&new.name, new.fields.len())?;

        let now = Utc::now();
        let template = Template {
            id: Uuid::new_v4().to_string(),
            user_id: self.owner.clone(),
            name: new.name,
            description: new.description.filter(|d| !d.is_empty()),
            fields: new.fields,
            theme: new.theme,
            tags: new.tags,
            is_archived: new.is_archived,
            shared: new.shared,
            shared_slug: new.shared_slug.filter(|s| !s.is_empty()),
            usage_count: 0,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&template)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_TEMPLATES)?;
            table.insert(template.id.as_str(), json.as_str())?;

            let mut index = write_txn.open_table(TABLE_OWNER_INDEX)?;
            index.insert(self.index_key(&template.id).as_str(), template.id.as_str())?;
        }
        write_txn.commit()?;

        tracing::debug!(template_id = %template.id, owner = %self.owner, "Template created");
        Ok(template)
    }

    async fn update_template(
        &self,
        id: &str,
        patch: TemplatePatch,
    ) -> Result<Template, StoreError> {
        let updated = self.modify(id, |template| {
            patch.apply_to(template);
            validate_template(&template.name, template.fields.len())?;
            template.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::debug!(template_id = %id, "Template updated");
        Ok(updated)
    }

    async fn archive_template(&self, id: &str) -> Result<(), StoreError> {
        self.modify(id, |template| {
            template.is_archived = true;
            template.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::debug!(template_id = %id, "Template archived");
        Ok(())
    }

    async fn delete_template(&self, id: &str) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_TEMPLATES)?;

            let owner = match table.get(id)? {
                Some(guard) => serde_json::from_str::<Template>(guard.value())?.user_id,
                None => return Err(StoreError::NotFound(id.to_string())),
            };
            if owner != self.owner {
                return Err(StoreError::NotFound(id.to_string()));
            }

            table.remove(id)?;

            let mut index = write_txn.open_table(TABLE_OWNER_INDEX)?;
            index.remove(self.index_key(id).as_str())?;
        }
        write_txn.commit()?;

        tracing::debug!(template_id = %id, "Template deleted");
        Ok(())
    }

    async fn increment_usage_count(&self, id: &str) -> Result<(), StoreError> {
        // redb admits one write transaction at a time, so the read and the
        // write below cannot interleave with another increment.
        self.modify(id, |template| {
            template.usage_count += 1;
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_db;
    use crate::model::{Field, FieldType};
    use tempfile::NamedTempFile;

    fn setup_store(owner: &str) -> (RedbTemplateStore, NamedTempFile) {
        let temp_db = NamedTempFile::new().expect("Failed to create temp file");
        let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to init db");
        (RedbTemplateStore::new(Arc::new(db), owner), temp_db)
    }

    fn new_template(name: &str) -> NewTemplate {
        NewTemplate {
            name: name.to_string(),
            fields: vec![Field {
                id: Uuid::new_v4().to_string(),
                label: "Amount".into(),
                field_type: FieldType::Number,
                required: true,
                placeholder: None,
                options: None,
                default_value: None,
                validation: None,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_server_fields() {
        let (store, _temp_db) = setup_store("user_1");

        let created = store.create_template(new_template("Invoice")).await.unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.user_id, "user_1");
        assert_eq!(created.usage_count, 0);
        assert_eq!(created.created_at, created.updated_at);
    }

    #[tokio::test]
    async fn create_rejects_blank_name_and_empty_fields() {
        let (store, _temp_db) = setup_store("user_1");

        let blank = store.create_template(new_template("   ")).await;
        assert!(matches!(blank, Err(StoreError::Validation(_))));

        let no_fields = NewTemplate {
            name: "Empty".into(),
            ..Default::default()
        };
        let result = store.create_template(no_fields).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn fetch_excludes_archived_unless_requested() {
        let (store, _temp_db) = setup_store("user_1");
        let kept = store.create_template(new_template("Kept")).await.unwrap();
        let archived = store.create_template(new_template("Old")).await.unwrap();

        store.archive_template(&archived.id).await.unwrap();

        let active = store.fetch_templates(false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, kept.id);

        let all = store.fetch_templates(true).await.unwrap();
        assert_eq!(all.len(), 2);
        // Archiving stamps updated_at, so the archived row sorts first
        assert_eq!(all[0].id, archived.id);
        assert!(all[0].is_archived);
    }

    #[tokio::test]
    async fn fetch_is_scoped_to_owner() {
        let temp_db = NamedTempFile::new().unwrap();
        let db = Arc::new(init_db(temp_db.path().to_str().unwrap()).unwrap());
        let alice = RedbTemplateStore::new(db.clone(), "alice");
        let bob = RedbTemplateStore::new(db, "bob");

        let created = alice.create_template(new_template("Mine")).await.unwrap();

        assert!(bob.fetch_templates(true).await.unwrap().is_empty());
        assert!(matches!(
            bob.get_template_by_id(&created.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            bob.delete_template(&created.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(alice.fetch_templates(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_merges_and_stamps() {
        let (store, _temp_db) = setup_store("user_1");
        let created = store.create_template(new_template("Invoice")).await.unwrap();

        let updated = store
            .update_template(
                &created.id,
                TemplatePatch {
                    description: Some("Monthly".into()),
                    tags: Some(vec!["billing".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Invoice");
        assert_eq!(updated.description.as_deref(), Some("Monthly"));
        assert_eq!(updated.tags, vec!["billing".to_string()]);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn increment_usage_counts_each_call() {
        let (store, _temp_db) = setup_store("user_1");
        let created = store.create_template(new_template("Invoice")).await.unwrap();

        store.increment_usage_count(&created.id).await.unwrap();
        store.increment_usage_count(&created.id).await.unwrap();

        let fetched = store.get_template_by_id(&created.id).await.unwrap();
        assert_eq!(fetched.usage_count, 2);
    }

    #[tokio::test]
    async fn delete_removes_row_and_index() {
        let (store, _temp_db) = setup_store("user_1");
        let created = store.create_template(new_template("Invoice")).await.unwrap();

        store.delete_template(&created.id).await.unwrap();

        assert!(store.fetch_templates(true).await.unwrap().is_empty());
        assert!(matches!(
            store.get_template_by_id(&created.id).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
