//! Git-backed document store.
//!
//! ```text
//!  <root>/
//!    <database>/            one git repository per database
//!      main ─► commit ─► tree
//!                         ├── _tables/<table>.json   table options
//!                         └── <table>/<key>.json     one blob per record
//! ```
//!
//! Every write is a commit on `main`. Git calls block, so each operation
//! runs on the tokio blocking pool.
//!
//! # Usage
//!
//! ```ignore
//! use gitodm::store::{DocumentStore, GitStore, TableOptions};
//!
//! let store = GitStore::open("./data")?;
//! store.create_database("app").await?;
//! store.create_table("app", "person", TableOptions::new("id")).await?;
//! ```

mod blob;
mod commit;
mod refs;
mod repository;
mod tree;
mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{document_key, Document, DocumentStore, PrimaryKey, StoreError, StoreResult, TableOptions, WriteResult};

pub use blob::Record;
pub use commit::CommitInfo;
pub use repository::GitRepository;
pub use types::{CommitId, DatabaseName, GitSignature, InvalidNameError, RecordKey, TableName};

/// Construction parameters for [`GitStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStoreConfig {
    /// Directory holding one repository per database.
    pub root: PathBuf,
    /// Author and committer of store commits.
    #[serde(default)]
    pub signature: GitSignature,
}

impl GitStoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            signature: GitSignature::default(),
        }
    }

    pub fn with_signature(mut self, signature: GitSignature) -> Self {
        self.signature = signature;
        self
    }
}

/// Document store keeping each database in its own git repository.
///
/// Clone-friendly; clones share the open repository handles.
#[derive(Clone)]
pub struct GitStore {
    inner: Arc<GitStoreInner>,
}

struct GitStoreInner {
    config: GitStoreConfig,
    /// open repositories by database name
    repos: Mutex<HashMap<String, GitRepository>>,
}

impl GitStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::with_config(GitStoreConfig::new(root))
    }

    pub fn with_config(config: GitStoreConfig) -> StoreResult<Self> {
        std::fs::create_dir_all(&config.root)?;
        Ok(Self {
            inner: Arc::new(GitStoreInner {
                config,
                repos: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.config.root
    }

    /// Handle to a database's repository, opening it on first use.
    pub fn database(&self, db: &str) -> StoreResult<GitRepository> {
        self.inner.database(db)
    }

    /// Run blocking git work off the async worker threads.
    async fn blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&GitStoreInner) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl GitStoreInner {
    fn database_path(&self, db: &DatabaseName) -> PathBuf {
        self.config.root.join(db.as_str())
    }

    fn database(&self, db: &str) -> StoreResult<GitRepository> {
        let name = DatabaseName::new(db)?;
        let mut repos = self.repos.lock();
        if let Some(repo) = repos.get(db) {
            return Ok(repo.clone());
        }

        let path = self.database_path(&name);
        if !path.join(".git").exists() {
            return Err(StoreError::DatabaseNotFound(db.to_string()));
        }

        let repo = GitRepository::open(&path, name, self.config.signature.clone())?;
        repos.insert(db.to_string(), repo.clone());
        Ok(repo)
    }

    fn table(&self, db: &str, table: &str) -> StoreResult<(GitRepository, TableName)> {
        Ok((self.database(db)?, TableName::new(table)?))
    }
}

fn record_key(key: &Value) -> StoreResult<RecordKey> {
    Ok(RecordKey::new(PrimaryKey::from_value(key)?)?)
}

#[async_trait]
impl DocumentStore for GitStore {
    async fn list_databases(&self) -> StoreResult<Vec<String>> {
        self.blocking(|inner| {
            let mut names = Vec::new();
            for entry in std::fs::read_dir(&inner.config.root)? {
                let entry = entry?;
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if DatabaseName::new(&name).is_ok() && entry.path().join(".git").exists() {
                    names.push(name);
                }
            }
            names.sort();
            Ok(names)
        })
        .await
    }

    async fn create_database(&self, db: &str) -> StoreResult<()> {
        let db = db.to_string();
        self.blocking(move |inner| {
            let name = DatabaseName::new(&db)?;
            let path = inner.database_path(&name);
            if path.exists() {
                return Err(StoreError::DatabaseAlreadyExists(db));
            }

            let repo = GitRepository::init(&path, name, inner.config.signature.clone())?;
            inner.repos.lock().insert(db.clone(), repo);
            debug!(db = %db, path = %path.display(), "git database created");
            Ok(())
        })
        .await
    }

    async fn drop_database(&self, db: &str) -> StoreResult<()> {
        let db = db.to_string();
        self.blocking(move |inner| {
            let name = DatabaseName::new(&db)?;
            let path = inner.database_path(&name);
            inner.repos.lock().remove(&db);

            if !path.join(".git").exists() {
                return Err(StoreError::DatabaseNotFound(db));
            }
            std::fs::remove_dir_all(&path)?;
            debug!(db = %db, "git database removed");
            Ok(())
        })
        .await
    }

    async fn list_tables(&self, db: &str) -> StoreResult<Vec<String>> {
        let db = db.to_string();
        self.blocking(move |inner| {
            let tables = inner.database(&db)?.list_tables()?;
            Ok(tables.into_iter().map(|t| t.as_str().to_string()).collect())
        })
        .await
    }

    async fn create_table(&self, db: &str, table: &str, options: TableOptions) -> StoreResult<()> {
        let (db, table) = (db.to_string(), table.to_string());
        self.blocking(move |inner| {
            let (repo, table) = inner.table(&db, &table)?;
            repo.create_table(&table, &options)?;
            Ok(())
        })
        .await
    }

    async fn get_record(&self, db: &str, table: &str, key: &Value) -> StoreResult<Option<Document>> {
        let (db, table, key) = (db.to_string(), table.to_string(), key.clone());
        self.blocking(move |inner| {
            let (repo, table) = inner.table(&db, &table)?;
            let record = repo.read_record(&table, &record_key(&key)?)?;
            Ok(record.map(|r| r.data))
        })
        .await
    }

    async fn insert_record(&self, db: &str, table: &str, doc: Document) -> StoreResult<WriteResult> {
        let (db, table) = (db.to_string(), table.to_string());
        self.blocking(move |inner| {
            let (repo, table) = inner.table(&db, &table)?;
            let options = repo.table_options(&table)?;
            let key = record_key(document_key(table.as_str(), &options, &doc)?)?;

            repo.insert_record(&table, &key, doc)?;
            Ok(WriteResult::inserted())
        })
        .await
    }

    async fn update_record(
        &self,
        db: &str,
        table: &str,
        key: &Value,
        doc: Document,
    ) -> StoreResult<WriteResult> {
        let (db, table, key) = (db.to_string(), table.to_string(), key.clone());
        self.blocking(move |inner| {
            let (repo, table) = inner.table(&db, &table)?;
            repo.update_record(&table, &record_key(&key)?, doc)?;
            Ok(WriteResult::replaced())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn store_with_table() -> (TempDir, GitStore) {
        let dir = TempDir::new().unwrap();
        let store = GitStore::open(dir.path()).unwrap();
        store.create_database("app").await.unwrap();
        store
            .create_table("app", "person", TableOptions::new("id"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_database_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = GitStore::open(dir.path()).unwrap();
        assert!(store.list_databases().await.unwrap().is_empty());

        store.create_database("app").await.unwrap();
        assert_eq!(store.list_databases().await.unwrap(), vec!["app"]);
        assert!(dir.path().join("app").join(".git").exists());

        let err = store.create_database("app").await.unwrap_err();
        assert!(matches!(err, StoreError::DatabaseAlreadyExists(_)));

        store.drop_database("app").await.unwrap();
        assert!(store.list_databases().await.unwrap().is_empty());
        assert!(!dir.path().join("app").exists());

        let err = store.drop_database("app").await.unwrap_err();
        assert!(matches!(err, StoreError::DatabaseNotFound(_)));
    }

    #[tokio::test]
    async fn test_configured_signature() {
        let dir = TempDir::new().unwrap();
        let config = GitStoreConfig::new(dir.path()).with_signature(GitSignature::new("svc", "svc@example.com"));
        let store = GitStore::with_config(config).unwrap();
        store.create_database("app").await.unwrap();

        let history = store.database("app").unwrap().history(None).unwrap();
        assert_eq!(history[0].author_name, "svc");
        assert_eq!(store.root(), dir.path());
    }

    #[tokio::test]
    async fn test_invalid_names() {
        let dir = TempDir::new().unwrap();
        let store = GitStore::open(dir.path()).unwrap();

        let err = store.create_database("../escape").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));

        store.create_database("app").await.unwrap();
        let err = store
            .create_table("app", "_tables", TableOptions::new("id"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_upsert_path() {
        let (_dir, store) = store_with_table().await;
        assert_eq!(store.list_tables("app").await.unwrap(), vec!["person"]);

        let result = store
            .insert_record("app", "person", doc(json!({"id": "p1", "name": "Ada"})))
            .await
            .unwrap();
        assert_eq!(result, WriteResult::inserted());

        let result = store
            .update_record("app", "person", &json!("p1"), doc(json!({"id": "p1", "name": "Ada L."})))
            .await
            .unwrap();
        assert_eq!(result, WriteResult::replaced());

        let stored = store.get_record("app", "person", &json!("p1")).await.unwrap();
        assert_eq!(stored, Some(doc(json!({"id": "p1", "name": "Ada L."}))));
    }

    #[tokio::test]
    async fn test_free_form_string_keys() {
        let (_dir, store) = store_with_table().await;
        let keys = ["Ada Lovelace", "ada@example.com", "p/1", "élan", "../escape"];

        for key in keys {
            store
                .insert_record("app", "person", doc(json!({"id": key})))
                .await
                .unwrap();
        }
        for key in keys {
            let stored = store.get_record("app", "person", &json!(key)).await.unwrap().unwrap();
            assert_eq!(stored.get("id"), Some(&json!(key)));
        }

        let table = TableName::new("person").unwrap();
        let listed = store.database("app").unwrap().list_records(&table).unwrap();
        assert_eq!(listed.len(), keys.len());

        let history = store.database("app").unwrap().history(Some(1)).unwrap();
        assert_eq!(history[0].summary(), "[INSERT] person/../escape");
    }

    #[tokio::test]
    async fn test_numeric_keys_are_canonical() {
        let (_dir, store) = store_with_table().await;
        store
            .insert_record("app", "person", doc(json!({"id": 1, "v": "first"})))
            .await
            .unwrap();

        let err = store
            .insert_record("app", "person", doc(json!({"id": 1.0})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RecordAlreadyExists { .. }));
        assert!(store.get_record("app", "person", &json!(1.0)).await.unwrap().is_some());
        assert!(store.get_record("app", "person", &json!("1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let (dir, store) = store_with_table().await;
        store
            .insert_record("app", "person", doc(json!({"id": 42, "name": "Grace"})))
            .await
            .unwrap();
        drop(store);

        let store = GitStore::open(dir.path()).unwrap();
        assert_eq!(store.list_tables("app").await.unwrap(), vec!["person"]);

        let stored = store.get_record("app", "person", &json!(42)).await.unwrap().unwrap();
        assert_eq!(stored.get("name"), Some(&json!("Grace")));

        let history = store.database("app").unwrap().history(None).unwrap();
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_insert_errors() {
        let (_dir, store) = store_with_table().await;

        let err = store
            .insert_record("app", "person", doc(json!({"name": "no key"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingPrimaryKey { .. }));

        let err = store
            .insert_record("app", "person", doc(json!({"id": true})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));

        let err = store
            .get_record("missing", "person", &json!("p1"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
