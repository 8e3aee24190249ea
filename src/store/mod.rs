//! Document store client.
//!
//! The core talks to the database only through [`DocumentStore`]. Two
//! backends ship with the crate:
//!
//! - [`MemoryStore`]: process-local maps, for tests and embedding.
//! - [`GitStore`]: one git repository per database, one directory per table,
//!   one JSON blob per record and one commit per write.
//!
//! Records are addressed by their primary key value, a string or a number
//! (see [`PrimaryKey`]).

mod error;
pub mod git;
mod key;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use error::{StoreError, StoreResult};
pub use git::{GitStore, GitStoreConfig};
pub use key::PrimaryKey;
pub use memory::MemoryStore;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Options for table creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Field holding each record's primary key.
    pub primary_key: String,
}

impl TableOptions {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
        }
    }
}

/// Counters reported by a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub inserted: u64,
    pub replaced: u64,
    pub unchanged: u64,
    pub deleted: u64,
}

impl WriteResult {
    /// One record inserted.
    pub fn inserted() -> Self {
        Self {
            inserted: 1,
            ..Self::default()
        }
    }

    /// One record replaced.
    pub fn replaced() -> Self {
        Self {
            replaced: 1,
            ..Self::default()
        }
    }
}

/// Database-level operations the core needs from a backend.
///
/// All operations are async. Implementations must reject a duplicate insert
/// with [`StoreError::RecordAlreadyExists`] and an update of a missing record
/// with [`StoreError::RecordNotFound`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of every database.
    async fn list_databases(&self) -> StoreResult<Vec<String>>;

    async fn create_database(&self, db: &str) -> StoreResult<()>;

    async fn drop_database(&self, db: &str) -> StoreResult<()>;

    /// Names of every table in `db`.
    async fn list_tables(&self, db: &str) -> StoreResult<Vec<String>>;

    async fn create_table(&self, db: &str, table: &str, options: TableOptions) -> StoreResult<()>;

    /// Fetch the record stored under `key`, if any.
    async fn get_record(&self, db: &str, table: &str, key: &Value) -> StoreResult<Option<Document>>;

    /// Insert a new record. The key is read from the table's primary key field.
    async fn insert_record(&self, db: &str, table: &str, doc: Document) -> StoreResult<WriteResult>;

    /// Merge `doc` into the record stored under `key`.
    async fn update_record(
        &self,
        db: &str,
        table: &str,
        key: &Value,
        doc: Document,
    ) -> StoreResult<WriteResult>;
}

/// Read the primary key value out of a document.
pub(crate) fn document_key<'a>(table: &str, options: &TableOptions, doc: &'a Document) -> StoreResult<&'a Value> {
    doc.get(&options.primary_key)
        .ok_or_else(|| StoreError::MissingPrimaryKey {
            table: table.to_string(),
            primary_key: options.primary_key.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_result_helpers() {
        assert_eq!(WriteResult::inserted().inserted, 1);
        assert_eq!(WriteResult::inserted().replaced, 0);
        assert_eq!(WriteResult::replaced().replaced, 1);
        assert_eq!(WriteResult::default(), WriteResult {
            inserted: 0,
            replaced: 0,
            unchanged: 0,
            deleted: 0,
        });
    }

    #[test]
    fn test_document_key() {
        let options = TableOptions::new("id");
        let doc = json!({"id": "p1"}).as_object().cloned().unwrap();
        assert_eq!(document_key("person", &options, &doc).unwrap(), &json!("p1"));

        let empty = Document::new();
        assert!(matches!(
            document_key("person", &options, &empty),
            Err(StoreError::MissingPrimaryKey { .. })
        ));
    }
}
