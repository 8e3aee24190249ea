//! A model bound to its repository's database.

use tracing::{debug, info};

use super::context::DatabaseContext;
use super::instance::ModelInstance;
use crate::error::OdmResult;
use crate::schema::{validate_schema, Schema};
use crate::store::TableOptions;

/// A named schema plus the shared database context, produced by register.
#[derive(Debug, Clone)]
pub struct RegisteredModel {
    name: String,
    schema: Schema,
    context: DatabaseContext,
}

impl RegisteredModel {
    pub(crate) fn new(name: impl Into<String>, schema: Schema, context: DatabaseContext) -> Self {
        Self {
            name: name.into(),
            schema,
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn context(&self) -> &DatabaseContext {
        &self.context
    }

    pub(crate) fn set_context(&mut self, context: DatabaseContext) {
        self.context = context;
    }

    /// A fresh, empty instance with its own copy of the schema.
    pub fn instantiate(&self) -> ModelInstance {
        ModelInstance::new(self.name.clone(), Some(self.schema.clone()), self.context.clone())
    }

    /// Check the schema, then create the model's table if it is missing.
    pub(crate) async fn init(&self) -> OdmResult<()> {
        let primary_key = validate_schema(&self.schema)?;

        let store = self.context.store();
        let db = self.context.database();

        let tables = store.list_tables(db).await?;
        if tables.iter().any(|t| t == &self.name) {
            debug!(model = %self.name, "table already exists");
            return Ok(());
        }

        store
            .create_table(db, &self.name, TableOptions::new(primary_key))
            .await?;
        info!("Table '{}' created successfully.", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::{DocumentStore, MemoryStore};
    use crate::validation;
    use std::sync::Arc;

    async fn context() -> (MemoryStore, DatabaseContext) {
        let store = MemoryStore::new();
        store.create_database("app").await.unwrap();
        let context = DatabaseContext::new(Arc::new(store.clone()), "app");
        (store, context)
    }

    #[tokio::test]
    async fn test_init_creates_table_once() {
        let (store, context) = context().await;
        let schema = Schema::new().field("id", validation::primary_string());
        let model = RegisteredModel::new("person", schema, context);

        model.init().await.unwrap();
        model.init().await.unwrap();

        assert_eq!(store.list_tables("app").await.unwrap(), vec!["person"]);
    }

    #[tokio::test]
    async fn test_init_rejects_bad_schema_before_table_work() {
        let (store, context) = context().await;
        let schema = Schema::new()
            .field("a", validation::primary_string())
            .field("b", validation::primary_string());
        let model = RegisteredModel::new("person", schema, context);

        let err = model.init().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.message(), "Primary key already exists");
        assert!(store.list_tables("app").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_passes_store_errors_through() {
        let store = MemoryStore::new();
        let context = DatabaseContext::new(Arc::new(store), "missing");
        let schema = Schema::new().field("id", validation::primary_string());
        let model = RegisteredModel::new("person", schema, context);

        let err = model.init().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[tokio::test]
    async fn test_instantiate_clones_schema() {
        let (_store, context) = context().await;
        let schema = Schema::new().field("id", validation::primary_string());
        let model = RegisteredModel::new("person", schema, context);

        let mut instance = model.instantiate();
        instance.schema_mut().unwrap().remove("id");

        assert!(model.schema().contains("id"));
        assert_eq!(instance.name(), "person");
    }
}
