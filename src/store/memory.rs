//! MemoryStore - map-backed document store for tests and embedding.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::{document_key, Document, DocumentStore, StoreError, StoreResult, PrimaryKey, TableOptions, WriteResult};

#[derive(Debug)]
struct MemoryTable {
    options: TableOptions,
    records: HashMap<PrimaryKey, Document>,
}

type Databases = BTreeMap<String, BTreeMap<String, MemoryTable>>;

/// In-memory document store.
///
/// Clone-friendly via Arc: clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    databases: Arc<RwLock<Databases>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table_not_found(db: &str, table: &str) -> StoreError {
        StoreError::TableNotFound {
            db: db.to_string(),
            table: table.to_string(),
        }
    }

    fn with_table<T>(
        &self,
        db: &str,
        table: &str,
        f: impl FnOnce(&mut MemoryTable) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut databases = self.databases.write();
        let tables = databases
            .get_mut(db)
            .ok_or_else(|| StoreError::DatabaseNotFound(db.to_string()))?;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| Self::table_not_found(db, table))?;
        f(entry)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_databases(&self) -> StoreResult<Vec<String>> {
        Ok(self.databases.read().keys().cloned().collect())
    }

    async fn create_database(&self, db: &str) -> StoreResult<()> {
        let mut databases = self.databases.write();
        if databases.contains_key(db) {
            return Err(StoreError::DatabaseAlreadyExists(db.to_string()));
        }
        databases.insert(db.to_string(), BTreeMap::new());
        debug!(db, "memory database created");
        Ok(())
    }

    async fn drop_database(&self, db: &str) -> StoreResult<()> {
        self.databases
            .write()
            .remove(db)
            .map(|_| ())
            .ok_or_else(|| StoreError::DatabaseNotFound(db.to_string()))
    }

    async fn list_tables(&self, db: &str) -> StoreResult<Vec<String>> {
        self.databases
            .read()
            .get(db)
            .map(|tables| tables.keys().cloned().collect())
            .ok_or_else(|| StoreError::DatabaseNotFound(db.to_string()))
    }

    async fn create_table(&self, db: &str, table: &str, options: TableOptions) -> StoreResult<()> {
        let mut databases = self.databases.write();
        let tables = databases
            .get_mut(db)
            .ok_or_else(|| StoreError::DatabaseNotFound(db.to_string()))?;

        if tables.contains_key(table) {
            return Err(StoreError::TableAlreadyExists {
                db: db.to_string(),
                table: table.to_string(),
            });
        }

        tables.insert(
            table.to_string(),
            MemoryTable {
                options,
                records: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn get_record(&self, db: &str, table: &str, key: &Value) -> StoreResult<Option<Document>> {
        let key = PrimaryKey::from_value(key)?;
        let databases = self.databases.read();
        let entry = databases
            .get(db)
            .ok_or_else(|| StoreError::DatabaseNotFound(db.to_string()))?
            .get(table)
            .ok_or_else(|| Self::table_not_found(db, table))?;

        Ok(entry.records.get(&key).cloned())
    }

    async fn insert_record(&self, db: &str, table: &str, doc: Document) -> StoreResult<WriteResult> {
        self.with_table(db, table, |entry| {
            let key = PrimaryKey::from_value(document_key(table, &entry.options, &doc)?)?;
            if entry.records.contains_key(&key) {
                return Err(StoreError::RecordAlreadyExists {
                    table: table.to_string(),
                    key: key.to_string(),
                });
            }
            entry.records.insert(key, doc);
            Ok(WriteResult::inserted())
        })
    }

    async fn update_record(
        &self,
        db: &str,
        table: &str,
        key: &Value,
        doc: Document,
    ) -> StoreResult<WriteResult> {
        let key = PrimaryKey::from_value(key)?;
        self.with_table(db, table, |entry| {
            let record = entry
                .records
                .get_mut(&key)
                .ok_or_else(|| StoreError::RecordNotFound {
                    table: table.to_string(),
                    key: key.to_string(),
                })?;
            record.extend(doc);
            Ok(WriteResult::replaced())
        })
    }
}
