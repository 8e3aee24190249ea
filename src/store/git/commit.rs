//! commit creation and history traversal
//!
//! every store write becomes one commit on the database's main branch.

use chrono::{DateTime, TimeZone, Utc};
use git2::{Repository, Revwalk, Sort};

use super::tree::{self, TreeHandle};
use super::types::{CommitId, GitSignature, TreeId};
use crate::store::{StoreError, StoreResult};

/// information about a commit
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: CommitId,
    pub parent_ids: Vec<CommitId>,
    pub message: String,
    pub author_name: String,
    pub timestamp: DateTime<Utc>,
}

impl CommitInfo {
    pub(crate) fn from_git2(commit: &git2::Commit<'_>) -> Self {
        let timestamp = Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_else(Utc::now);

        Self {
            id: CommitId::new(commit.id()),
            parent_ids: commit.parent_ids().map(CommitId::new).collect(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: commit.author().name().unwrap_or("unknown").to_string(),
            timestamp,
        }
    }

    /// first line of the message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// fluent builder for commits
pub struct CommitBuilder<'a> {
    repo: &'a Repository,
    tree_id: Option<TreeId>,
    parents: Vec<CommitId>,
    message: String,
    signature: GitSignature,
    update_ref: Option<String>,
}

impl<'a> CommitBuilder<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            repo,
            tree_id: None,
            parents: Vec::new(),
            message: String::new(),
            signature: GitSignature::default(),
            update_ref: None,
        }
    }

    pub fn tree(mut self, tree_id: TreeId) -> Self {
        self.tree_id = Some(tree_id);
        self
    }

    pub fn parent(mut self, parent: CommitId) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn signature(mut self, signature: GitSignature) -> Self {
        self.signature = signature;
        self
    }

    /// move a ref to the new commit as part of creating it
    pub fn update_ref(mut self, refname: impl Into<String>) -> Self {
        self.update_ref = Some(refname.into());
        self
    }

    pub fn commit(self) -> StoreResult<CommitId> {
        let tree_id = self
            .tree_id
            .ok_or_else(|| StoreError::Internal("commit requires a tree".to_string()))?;

        let tree = self.repo.find_tree(tree_id.raw())?;
        let sig = self.signature.to_git2_signature()?;

        let parent_commits: Vec<git2::Commit<'_>> = self
            .parents
            .iter()
            .map(|id| self.repo.find_commit(id.raw()))
            .collect::<Result<_, _>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parent_commits.iter().collect();

        let oid = self.repo.commit(
            self.update_ref.as_deref(),
            &sig,
            &sig,
            &self.message,
            &tree,
            &parent_refs,
        )?;

        Ok(CommitId::new(oid))
    }
}

pub fn get_commit(repo: &Repository, id: CommitId) -> StoreResult<CommitInfo> {
    let commit = repo
        .find_commit(id.raw())
        .map_err(|_| StoreError::CommitNotFound(id.to_string()))?;

    Ok(CommitInfo::from_git2(&commit))
}

/// the tree snapshot at a commit
pub fn get_tree_at_commit(repo: &Repository, commit_id: CommitId) -> StoreResult<TreeHandle<'_>> {
    let commit = repo
        .find_commit(commit_id.raw())
        .map_err(|_| StoreError::CommitNotFound(commit_id.to_string()))?;

    Ok(TreeHandle::new(commit.tree()?))
}

/// root commit of a new database, pointed to by HEAD
pub fn create_initial_commit(repo: &Repository, db: &str, signature: &GitSignature) -> StoreResult<CommitId> {
    let tree_id = tree::create_initial_tree(repo)?;

    CommitBuilder::new(repo)
        .tree(tree_id)
        .message(CommitMessage::create_database(db))
        .signature(signature.clone())
        .update_ref("HEAD")
        .commit()
}

/// commits reachable from `start`, newest first
pub struct HistoryIterator<'repo> {
    repo: &'repo Repository,
    revwalk: Revwalk<'repo>,
}

impl<'repo> HistoryIterator<'repo> {
    pub fn new(repo: &'repo Repository, start: CommitId) -> StoreResult<Self> {
        let mut revwalk = repo.revwalk()?;
        revwalk.push(start.raw())?;
        revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;

        Ok(Self { repo, revwalk })
    }
}

impl Iterator for HistoryIterator<'_> {
    type Item = StoreResult<CommitInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self
            .revwalk
            .next()?
            .and_then(|oid| self.repo.find_commit(oid))
            .map(|commit| CommitInfo::from_git2(&commit))
            .map_err(StoreError::Git);
        Some(item)
    }
}

/// message formatting for store writes
pub struct CommitMessage;

impl CommitMessage {
    pub fn create_database(db: &str) -> String {
        format!("[CREATE DATABASE] {}", db)
    }

    pub fn create_table(table: &str, primary_key: &str) -> String {
        format!("[CREATE TABLE] {} pk:{}", table, primary_key)
    }

    pub fn insert(table: &str, key: &str) -> String {
        format!("[INSERT] {}/{}", table, key)
    }

    pub fn update(table: &str, key: &str) -> String {
        format!("[UPDATE] {}/{}", table, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_initial_commit() {
        let (_dir, repo) = setup_repo();
        let commit_id = create_initial_commit(&repo, "app", &GitSignature::default()).unwrap();
        let info = get_commit(&repo, commit_id).unwrap();

        assert_eq!(info.summary(), "[CREATE DATABASE] app");
        assert_eq!(info.author_name, "gitodm");
        assert!(info.parent_ids.is_empty());

        let tree = get_tree_at_commit(&repo, commit_id).unwrap();
        assert!(tree.list_tables().is_empty());
    }

    #[test]
    fn test_commit_builder_and_history() {
        let (_dir, repo) = setup_repo();
        let sig = GitSignature::new("tester", "tester@localhost");
        let c1 = create_initial_commit(&repo, "app", &sig).unwrap();

        let tree_id = tree::create_initial_tree(&repo).unwrap();
        let c2 = CommitBuilder::new(&repo)
            .tree(tree_id)
            .parent(c1)
            .message(CommitMessage::insert("person", "p1"))
            .signature(sig)
            .commit()
            .unwrap();

        let info = get_commit(&repo, c2).unwrap();
        assert_eq!(info.parent_ids, vec![c1]);
        assert_eq!(info.author_name, "tester");

        let commits: Vec<_> = HistoryIterator::new(&repo, c2)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].id, c2);
        assert_eq!(commits[1].id, c1);
    }

    #[test]
    fn test_commit_requires_tree() {
        let (_dir, repo) = setup_repo();
        let result = CommitBuilder::new(&repo).message("no tree").commit();
        assert!(matches!(result, Err(StoreError::Internal(_))));
    }

    #[test]
    fn test_commit_messages() {
        assert_eq!(CommitMessage::insert("person", "p1"), "[INSERT] person/p1");
        assert_eq!(CommitMessage::update("person", "p1"), "[UPDATE] person/p1");
        assert_eq!(CommitMessage::create_table("person", "id"), "[CREATE TABLE] person pk:id");
    }
}
