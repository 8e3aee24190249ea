//! git repository wrapper for one database.
//!
//! Wraps `git2::Repository` with thread-safe access. Reads resolve `main`
//! and look at its tree; writes build a new tree on top of `main`, commit
//! it and advance `main` with compare-and-swap. The repository mutex doubles
//! as the commit lock, so writes through one handle never race each other.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::Repository;
use parking_lot::Mutex;
use tracing::debug;

use super::blob::{self, Record};
use super::commit::{self, CommitBuilder, CommitInfo, CommitMessage, HistoryIterator};
use super::refs::RefManager;
use super::tree::{TreeHandle, TreeMutator};
use super::types::{BranchName, CommitId, DatabaseName, GitSignature, RecordKey, TableName, TreeId};
use crate::store::{Document, StoreError, StoreResult, TableOptions};

/// Handle to one database's git repository.
///
/// Clone to share across threads; it uses Arc internally.
#[derive(Clone)]
pub struct GitRepository {
    inner: Arc<GitRepositoryInner>,
}

struct GitRepositoryInner {
    repo: Mutex<Repository>,
    path: PathBuf,
    db: DatabaseName,
    signature: GitSignature,
}

impl GitRepository {
    /// Open an existing database repository.
    pub fn open(path: impl AsRef<Path>, db: DatabaseName, signature: GitSignature) -> StoreResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|_| StoreError::DatabaseNotFound(db.to_string()))?;
        // a database always has its root commit
        RefManager::head_commit(&repo)?;
        Ok(Self::from_parts(repo, path, db, signature))
    }

    /// Initialize a new database repository with its root commit on `main`.
    pub fn init(path: impl AsRef<Path>, db: DatabaseName, signature: GitSignature) -> StoreResult<Self> {
        let path = path.as_ref();
        let repo = Repository::init(path)?;
        let storage = Self::from_parts(repo, path, db, signature);

        storage.with_repo(|repo| {
            let initial = commit::create_initial_commit(repo, storage.inner.db.as_str(), &storage.inner.signature)?;
            RefManager::init_main_branch(repo, initial)
        })?;

        Ok(storage)
    }

    fn from_parts(repo: Repository, path: &Path, db: DatabaseName, signature: GitSignature) -> Self {
        Self {
            inner: Arc::new(GitRepositoryInner {
                repo: Mutex::new(repo),
                path: path.to_path_buf(),
                db,
                signature,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn database(&self) -> &DatabaseName {
        &self.inner.db
    }

    /// Run `f` with exclusive access to the repository.
    fn with_repo<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Repository) -> StoreResult<T>,
    {
        let repo = self.inner.repo.lock();
        f(&repo).map_err(|e| self.scoped(e))
    }

    /// fill in the database name on table errors raised by the tree layer
    fn scoped(&self, err: StoreError) -> StoreError {
        let db = self.inner.db.to_string();
        match err {
            StoreError::TableNotFound { table, .. } => StoreError::TableNotFound { db, table },
            StoreError::TableAlreadyExists { table, .. } => StoreError::TableAlreadyExists { db, table },
            other => other,
        }
    }

    /// Build a new tree on top of `main`, commit it and advance `main`.
    fn write<F>(&self, f: F) -> StoreResult<CommitId>
    where
        F: for<'r> FnOnce(&'r Repository, &TreeHandle<'r>) -> StoreResult<(TreeId, String)>,
    {
        self.with_repo(|repo| {
            let main = BranchName::main();
            let head = RefManager::resolve_branch(repo, &main)?;
            let tree = commit::get_tree_at_commit(repo, head)?;

            let (tree_id, message) = f(repo, &tree)?;

            let new_commit = CommitBuilder::new(repo)
                .tree(tree_id)
                .parent(head)
                .message(message)
                .signature(self.inner.signature.clone())
                .commit()?;

            RefManager::update_branch_if_unchanged(repo, &main, head, new_commit)?;
            debug!(db = %self.inner.db, commit = %new_commit.short(), "advanced main");
            Ok(new_commit)
        })
    }

    /// Current tip of `main`.
    pub fn head(&self) -> StoreResult<CommitId> {
        self.with_repo(|repo| RefManager::resolve_branch(repo, &BranchName::main()))
    }

    pub fn list_tables(&self) -> StoreResult<Vec<TableName>> {
        self.with_repo(|repo| {
            let head = RefManager::resolve_branch(repo, &BranchName::main())?;
            Ok(commit::get_tree_at_commit(repo, head)?.list_tables())
        })
    }

    pub fn create_table(&self, table: &TableName, options: &TableOptions) -> StoreResult<CommitId> {
        self.write(|repo, tree| {
            let options_blob = blob::write_table_options(repo, options)?;
            let mut mutator = TreeMutator::from_tree(repo, tree)?;
            mutator.create_table(table, options_blob)?;

            let message = CommitMessage::create_table(table.as_str(), &options.primary_key);
            Ok((mutator.write()?, message))
        })
    }

    pub fn table_options(&self, table: &TableName) -> StoreResult<TableOptions> {
        self.with_repo(|repo| {
            let head = RefManager::resolve_branch(repo, &BranchName::main())?;
            commit::get_tree_at_commit(repo, head)?.table_options(repo, table)
        })
    }

    /// Read a record at the tip of `main`.
    pub fn read_record(&self, table: &TableName, key: &RecordKey) -> StoreResult<Option<Record>> {
        self.with_repo(|repo| {
            let head = RefManager::resolve_branch(repo, &BranchName::main())?;
            let tree = commit::get_tree_at_commit(repo, head)?;

            match tree.record_blob_id(repo, table, key)? {
                Some(blob_id) => Ok(Some(blob::read_record(repo, blob_id, key)?)),
                None => Ok(None),
            }
        })
    }

    /// Insert a new record, failing if the key is taken.
    pub fn insert_record(&self, table: &TableName, key: &RecordKey, data: Document) -> StoreResult<CommitId> {
        self.write(|repo, tree| {
            if tree.record_blob_id(repo, table, key)?.is_some() {
                return Err(StoreError::RecordAlreadyExists {
                    table: table.to_string(),
                    key: key.to_string(),
                });
            }

            let record = Record::new(key.clone(), data);
            let blob_id = blob::write_record(repo, &record)?;

            let mut mutator = TreeMutator::from_tree(repo, tree)?;
            mutator.upsert_record(table, key, blob_id)?;
            Ok((mutator.write()?, CommitMessage::insert(table.as_str(), &key.to_string())))
        })
    }

    /// Merge fields into an existing record.
    pub fn update_record(&self, table: &TableName, key: &RecordKey, data: Document) -> StoreResult<CommitId> {
        self.write(|repo, tree| {
            let blob_id = tree
                .record_blob_id(repo, table, key)?
                .ok_or_else(|| StoreError::RecordNotFound {
                    table: table.to_string(),
                    key: key.to_string(),
                })?;

            let mut record = blob::read_record(repo, blob_id, key)?;
            record.merge(data);
            let blob_id = blob::write_record(repo, &record)?;

            let mut mutator = TreeMutator::from_tree(repo, tree)?;
            mutator.upsert_record(table, key, blob_id)?;
            Ok((mutator.write()?, CommitMessage::update(table.as_str(), &key.to_string())))
        })
    }

    /// Record keys in a table, in tree order.
    pub fn list_records(&self, table: &TableName) -> StoreResult<Vec<RecordKey>> {
        self.with_repo(|repo| {
            let head = RefManager::resolve_branch(repo, &BranchName::main())?;
            commit::get_tree_at_commit(repo, head)?.list_records(repo, table)
        })
    }

    /// Look up a single commit.
    pub fn commit(&self, id: CommitId) -> StoreResult<CommitInfo> {
        self.with_repo(|repo| commit::get_commit(repo, id))
    }

    /// Commits on `main`, newest first.
    pub fn history(&self, limit: Option<usize>) -> StoreResult<Vec<CommitInfo>> {
        self.with_repo(|repo| {
            let head = RefManager::resolve_branch(repo, &BranchName::main())?;
            let iter = HistoryIterator::new(repo, head)?;
            match limit {
                Some(n) => iter.take(n).collect(),
                None => iter.collect(),
            }
        })
    }
}
