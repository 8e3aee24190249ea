//! tree operations for table management.
//!
//! layout of a database's root tree:
//! - one directory per table, holding `{key}.json` record blobs
//! - `_tables/{table}.json` holding each table's options
//!
//! tables exist as directories even when empty, so the `_tables` entry is
//! the source of truth for a table's primary key.

use std::collections::HashMap;

use git2::{FileMode, ObjectType, Repository, Tree, TreeBuilder};

use super::blob;
use super::types::{BlobId, RecordKey, RecordPath, TableName, TreeId};
use crate::store::{StoreError, StoreResult, TableOptions};

/// read-only snapshot of a database tree at one commit
pub struct TreeHandle<'repo> {
    tree: Tree<'repo>,
}

impl<'repo> TreeHandle<'repo> {
    pub(crate) fn new(tree: Tree<'repo>) -> Self {
        Self { tree }
    }

    pub(crate) fn inner(&self) -> &Tree<'repo> {
        &self.tree
    }

    /// list every table, skipping metadata directories
    pub fn list_tables(&self) -> Vec<TableName> {
        self.tree
            .iter()
            .filter(|entry| entry.kind() == Some(ObjectType::Tree))
            .filter_map(|entry| {
                let name = entry.name()?;
                if name.starts_with('_') {
                    return None;
                }
                TableName::new(name).ok()
            })
            .collect()
    }

    pub fn table_exists(&self, table: &TableName) -> bool {
        self.tree
            .get_name(table.as_str())
            .map(|entry| entry.kind() == Some(ObjectType::Tree))
            .unwrap_or(false)
    }

    fn subtree(&self, repo: &'repo Repository, name: &str) -> StoreResult<Option<Tree<'repo>>> {
        match self.tree.get_name(name) {
            Some(entry) if entry.kind() == Some(ObjectType::Tree) => Ok(Some(repo.find_tree(entry.id())?)),
            Some(entry) => Err(StoreError::UnexpectedEntryType {
                path: name.into(),
                expected: "tree (directory)".to_string(),
                found: format!("{:?}", entry.kind()),
            }),
            None => Ok(None),
        }
    }

    /// read a table's stored options
    pub fn table_options(&self, repo: &'repo Repository, table: &TableName) -> StoreResult<TableOptions> {
        let not_found = || StoreError::CorruptedData {
            path: format!("{}/{}.json", TableName::META_DIR, table).into(),
            reason: "table options are missing".to_string(),
        };

        if !self.table_exists(table) {
            return Err(StoreError::TableNotFound {
                db: String::new(),
                table: table.to_string(),
            });
        }

        let meta = self.subtree(repo, TableName::META_DIR)?.ok_or_else(not_found)?;
        let entry = meta.get_name(&format!("{}.json", table)).ok_or_else(not_found)?;
        blob::read_table_options(repo, BlobId::new(entry.id()))
    }

    /// blob ID of a record, or `None` if the table has no such key
    pub fn record_blob_id(
        &self,
        repo: &'repo Repository,
        table: &TableName,
        key: &RecordKey,
    ) -> StoreResult<Option<BlobId>> {
        let table_tree = self.subtree(repo, table.as_str())?.ok_or_else(|| StoreError::TableNotFound {
            db: String::new(),
            table: table.to_string(),
        })?;

        let result = match table_tree.get_name(&key.file_name()) {
            Some(entry) if entry.kind() == Some(ObjectType::Blob) => Ok(Some(BlobId::new(entry.id()))),
            Some(entry) => Err(StoreError::UnexpectedEntryType {
                path: RecordPath::new(table.clone(), key.clone()).to_path_buf(),
                expected: "blob (file)".to_string(),
                found: format!("{:?}", entry.kind()),
            }),
            None => Ok(None),
        };
        result
    }

    /// list every record key in a table
    pub fn list_records(&self, repo: &'repo Repository, table: &TableName) -> StoreResult<Vec<RecordKey>> {
        let table_tree = self.subtree(repo, table.as_str())?.ok_or_else(|| StoreError::TableNotFound {
            db: String::new(),
            table: table.to_string(),
        })?;

        Ok(table_tree
            .iter()
            .filter(|entry| entry.kind() == Some(ObjectType::Blob))
            .filter_map(|entry| RecordKey::from_file_name(entry.name()?))
            .collect())
    }
}

/// accumulates changes on top of a tree and writes a new root tree
///
/// the original tree is never modified
pub struct TreeMutator<'repo> {
    repo: &'repo Repository,
    root_builder: TreeBuilder<'repo>,
    /// subtrees touched so far (directory name -> builder)
    modified: HashMap<String, TreeBuilder<'repo>>,
    /// subtree IDs as found in the original tree
    original: HashMap<String, git2::Oid>,
}

impl<'repo> TreeMutator<'repo> {
    pub fn from_tree(repo: &'repo Repository, tree: &TreeHandle<'_>) -> StoreResult<Self> {
        let root_builder = repo.treebuilder(Some(tree.inner()))?;

        let original = tree
            .inner()
            .iter()
            .filter(|entry| entry.kind() == Some(ObjectType::Tree))
            .filter_map(|entry| Some((entry.name()?.to_string(), entry.id())))
            .collect();

        Ok(Self {
            repo,
            root_builder,
            modified: HashMap::new(),
            original,
        })
    }

    pub fn empty(repo: &'repo Repository) -> StoreResult<Self> {
        Ok(Self {
            repo,
            root_builder: repo.treebuilder(None)?,
            modified: HashMap::new(),
            original: HashMap::new(),
        })
    }

    fn has_dir(&self, name: &str) -> bool {
        self.modified.contains_key(name) || self.original.contains_key(name)
    }

    fn dir_builder(&mut self, name: &str) -> StoreResult<&mut TreeBuilder<'repo>> {
        if !self.modified.contains_key(name) {
            let builder = match self.original.get(name) {
                Some(id) => {
                    let tree = self.repo.find_tree(*id)?;
                    self.repo.treebuilder(Some(&tree))?
                }
                None => self.repo.treebuilder(None)?,
            };
            self.modified.insert(name.to_string(), builder);
        }

        self.modified
            .get_mut(name)
            .ok_or_else(|| StoreError::Internal(format!("missing tree builder for '{}'", name)))
    }

    /// create an empty table directory and record its options
    pub fn create_table(&mut self, table: &TableName, options_blob: BlobId) -> StoreResult<()> {
        if self.has_dir(table.as_str()) {
            return Err(StoreError::TableAlreadyExists {
                db: String::new(),
                table: table.to_string(),
            });
        }

        self.dir_builder(table.as_str())?;
        self.dir_builder(TableName::META_DIR)?.insert(
            format!("{}.json", table),
            options_blob.raw(),
            FileMode::Blob.into(),
        )?;

        Ok(())
    }

    /// insert or replace a record blob in a table
    pub fn upsert_record(&mut self, table: &TableName, key: &RecordKey, blob_id: BlobId) -> StoreResult<()> {
        if !self.has_dir(table.as_str()) {
            return Err(StoreError::TableNotFound {
                db: String::new(),
                table: table.to_string(),
            });
        }

        self.dir_builder(table.as_str())?
            .insert(key.file_name(), blob_id.raw(), FileMode::Blob.into())?;
        Ok(())
    }

    /// write touched subtrees, then the root, returning the new root ID
    pub fn write(mut self) -> StoreResult<TreeId> {
        for (name, builder) in self.modified {
            let subtree_id = builder.write()?;
            self.root_builder.insert(&name, subtree_id, FileMode::Tree.into())?;
        }

        Ok(TreeId::new(self.root_builder.write()?))
    }
}

/// root tree of a fresh database: just the empty `_tables` directory
pub fn create_initial_tree(repo: &Repository) -> StoreResult<TreeId> {
    let mut mutator = TreeMutator::empty(repo)?;
    mutator.dir_builder(TableName::META_DIR)?;
    mutator.write()
}
