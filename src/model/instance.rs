//! Model instances and the save (upsert) path.

use serde_json::Value;
use tracing::{debug, warn};

use super::context::DatabaseContext;
use crate::error::{OdmError, OdmResult};
use crate::schema::{validate_instance, Schema};
use crate::store::{Document, WriteResult};

/// A mutable bag of field values bound to a registered model.
///
/// Each instance owns a copy of the model's schema, which the caller may
/// change between saves. The schema is validated on every save.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    name: String,
    schema: Option<Schema>,
    values: Document,
    context: DatabaseContext,
}

impl ModelInstance {
    pub(crate) fn new(name: String, schema: Option<Schema>, context: DatabaseContext) -> Self {
        Self {
            name,
            schema,
            values: Document::new(),
            context,
        }
    }

    /// An instance holding values read back from the store.
    pub(crate) fn hydrate(name: String, schema: Schema, values: Document, context: DatabaseContext) -> Self {
        Self {
            name,
            schema: Some(schema),
            values,
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set a field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Remove a field value, returning it.
    pub fn unset(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }

    pub fn values(&self) -> &Document {
        &self.values
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn schema_mut(&mut self) -> Option<&mut Schema> {
        self.schema.as_mut()
    }

    /// Replace the schema; `None` leaves the instance without one.
    pub fn set_schema(&mut self, schema: Option<Schema>) {
        self.schema = schema;
    }

    /// Validate the instance and upsert it by primary key.
    ///
    /// Reads the record at the primary key once: absent means insert,
    /// present means merge the validated fields into it. The read and the
    /// write are separate store calls, so concurrent saves of one key race
    /// and the last writer wins.
    pub async fn save(&self) -> OdmResult<WriteResult> {
        self.context.scoped(self.upsert()).await
    }

    async fn upsert(&self) -> OdmResult<WriteResult> {
        self.context.ensure_live()?;

        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| OdmError::schema(format!("Schema for '{}' must be an object", self.name)))?;

        let validated = validate_instance(schema, &self.values).inspect_err(|e| {
            warn!(model = %self.name, error = %e, "save rejected");
        })?;

        let store = self.context.store();
        let db = self.context.database();

        let existing = store.get_record(db, &self.name, &validated.key).await?;
        let result = match existing {
            None => store.insert_record(db, &self.name, validated.document).await?,
            Some(_) => {
                store
                    .update_record(db, &self.name, &validated.key, validated.document)
                    .await?
            }
        };

        debug!(
            model = %self.name,
            key = %validated.key,
            inserted = result.inserted,
            replaced = result.replaced,
            "saved"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::{DocumentStore, MemoryStore, TableOptions};
    use crate::validation;
    use serde_json::json;
    use std::sync::Arc;

    fn person_schema() -> Schema {
        Schema::new()
            .field("id", validation::primary_string())
            .field("name", validation::string())
    }

    async fn instance() -> (MemoryStore, ModelInstance) {
        let store = MemoryStore::new();
        store.create_database("app").await.unwrap();
        store
            .create_table("app", "person", TableOptions::new("id"))
            .await
            .unwrap();

        let context = DatabaseContext::new(Arc::new(store.clone()), "app");
        let instance = ModelInstance::new("person".to_string(), Some(person_schema()), context);
        (store, instance)
    }

    #[tokio::test]
    async fn test_save_inserts_then_replaces() {
        let (store, mut person) = instance().await;
        person.set("id", "p1").set("name", "Ada");

        let result = person.save().await.unwrap();
        assert_eq!(result.inserted, 1);
        assert_eq!(result.replaced, 0);

        person.set("name", "Ada L.");
        let result = person.save().await.unwrap();
        assert_eq!(result.inserted, 0);
        assert_eq!(result.replaced, 1);

        let stored = store.get_record("app", "person", &json!("p1")).await.unwrap().unwrap();
        assert_eq!(stored.get("name"), Some(&json!("Ada L.")));
    }

    #[tokio::test]
    async fn test_save_drops_undeclared_fields() {
        let (store, mut person) = instance().await;
        person.set("id", "p1").set("nickname", "countess");
        person.save().await.unwrap();

        let stored = store.get_record("app", "person", &json!("p1")).await.unwrap().unwrap();
        assert_eq!(stored.get("nickname"), None);
        assert_eq!(person.get("nickname"), Some(&json!("countess")));
    }

    #[tokio::test]
    async fn test_save_without_schema() {
        let (_store, mut person) = instance().await;
        person.set_schema(None);
        person.set("id", "p1");

        let err = person.save().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.message(), "Schema for 'person' must be an object");
    }

    #[tokio::test]
    async fn test_save_reads_schema_live() {
        let (_store, mut person) = instance().await;
        person.set("id", "p1");
        person.save().await.unwrap();

        person
            .schema_mut()
            .unwrap()
            .insert("code", crate::schema::Field::rule(validation::primary_number()));
        let err = person.save().await.unwrap_err();
        assert_eq!(err.message(), "Primary key already exists");

        person.schema_mut().unwrap().remove("code");
        person.schema_mut().unwrap().remove("id");
        let err = person.save().await.unwrap_err();
        assert_eq!(err.message(), "Primary key is not defined");
    }

    #[tokio::test]
    async fn test_save_validation_failure_writes_nothing() {
        let (store, mut person) = instance().await;
        person.set("id", "p1").set("name", 7);

        let err = person.save().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "\"name\" must be a string");
        assert!(store.get_record("app", "person", &json!("p1")).await.unwrap().is_none());

        person.unset("id");
        let err = person.save().await.unwrap_err();
        assert_eq!(err.message(), "Property 'id' is required");
    }

    #[tokio::test]
    async fn test_save_after_destroy() {
        let (_store, mut person) = instance().await;
        person.set("id", "p1");
        person.context.mark_destroyed(true);

        let err = person.save().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Repository);
        assert_eq!(err.message(), "The Repository has been destroyed");
    }
}
