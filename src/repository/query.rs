//! Read path: `repository.query(name)?.get(key).run()`.
//!
//! A [`Query`] has no `run` and a [`GetQuery`] has no `get`, so a query can
//! only ever be run once a key is bound.

use serde_json::Value;

use crate::error::OdmResult;
use crate::model::{ModelInstance, RegisteredModel};
use crate::store::Document;

/// A query scoped to one model.
#[derive(Debug, Clone)]
pub struct Query {
    model: RegisteredModel,
}

impl Query {
    pub(crate) fn new(model: RegisteredModel) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Bind the primary key to fetch.
    pub fn get(self, key: impl Into<Value>) -> GetQuery {
        GetQuery {
            model: self.model,
            key: key.into(),
        }
    }
}

/// A query for one record by primary key.
#[derive(Debug, Clone)]
pub struct GetQuery {
    model: RegisteredModel,
    key: Value,
}

impl GetQuery {
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Fetch the stored document as-is.
    pub async fn run_object(&self) -> OdmResult<Option<Document>> {
        let context = self.model.context();
        context.scoped(self.fetch()).await
    }

    /// Fetch the record as an instance, ready to change and save again.
    pub async fn run(&self) -> OdmResult<Option<ModelInstance>> {
        let document = self.run_object().await?;
        Ok(document.map(|values| {
            ModelInstance::hydrate(
                self.model.name().to_string(),
                self.model.schema().clone(),
                values,
                self.model.context().clone(),
            )
        }))
    }

    async fn fetch(&self) -> OdmResult<Option<Document>> {
        let context = self.model.context();
        context.ensure_live()?;

        let document = context
            .store()
            .get_record(context.database(), self.model.name(), &self.key)
            .await?;
        tracing::debug!(model = %self.model.name(), key = %self.key, found = document.is_some(), "get");
        Ok(document)
    }
}
