//! branch and reference management.
//!
//! a database only ever writes to `main`. Advancing it goes through
//! [`RefManager::update_branch_if_unchanged`] so a writer that lost a race
//! fails instead of discarding the other writer's commit.

use git2::Repository;

use super::types::{BranchName, CommitId};
use crate::store::{StoreError, StoreResult};

pub struct RefManager;

impl RefManager {
    pub fn resolve_branch(repo: &Repository, branch: &BranchName) -> StoreResult<CommitId> {
        let reference = repo
            .find_reference(&branch.as_ref_path())
            .map_err(|_| StoreError::RefNotFound(branch.to_string()))?;

        let commit = reference
            .peel_to_commit()
            .map_err(|_| StoreError::RefNotFound(branch.to_string()))?;

        Ok(CommitId::new(commit.id()))
    }

    /// the commit HEAD points at
    pub fn head_commit(repo: &Repository) -> StoreResult<CommitId> {
        let head = repo.head().map_err(|e| {
            if e.code() == git2::ErrorCode::UnbornBranch {
                StoreError::EmptyRepository
            } else {
                StoreError::Git(e)
            }
        })?;

        Ok(CommitId::new(head.peel_to_commit()?.id()))
    }

    pub fn branch_exists(repo: &Repository, branch: &BranchName) -> bool {
        repo.find_reference(&branch.as_ref_path()).is_ok()
    }

    /// force-move a branch
    pub fn update_branch(repo: &Repository, branch: &BranchName, target: CommitId) -> StoreResult<()> {
        let mut reference = repo
            .find_reference(&branch.as_ref_path())
            .map_err(|_| StoreError::RefNotFound(branch.to_string()))?;

        reference.set_target(target.raw(), &format!("advance {} to {}", branch, target.short()))?;
        Ok(())
    }

    /// compare-and-swap: move `branch` only if it still points at `expected`
    pub fn update_branch_if_unchanged(
        repo: &Repository,
        branch: &BranchName,
        expected: CommitId,
        new_target: CommitId,
    ) -> StoreResult<()> {
        if Self::resolve_branch(repo, branch)? != expected {
            return Err(StoreError::ConcurrentModification {
                branch: branch.to_string(),
            });
        }

        Self::update_branch(repo, branch, new_target)
    }

    /// create `main` at the initial commit and point HEAD at it
    pub fn init_main_branch(repo: &Repository, initial_commit: CommitId) -> StoreResult<()> {
        let main = BranchName::main();

        if !Self::branch_exists(repo, &main) {
            let commit = repo.find_commit(initial_commit.raw())?;
            repo.branch(main.as_str(), &commit, false)?;
        }

        repo.set_head(&main.as_ref_path())?;
        Ok(())
    }
}
