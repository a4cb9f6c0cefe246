//! The process-wide repository handle
//!
//! Every repository operation goes through one mutex so commits, resets,
//! branch switches, pushes, exports and status queries never interleave on
//! the working tree or the index. The git work itself runs on a blocking
//! thread while the lock is held.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::info;

use super::credentials::CredentialIdentity;
use super::utils::*;
use super::{branches, commit, operations, status};

/// An opened working tree. Only reachable through [`RepositoryHandle`].
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Cheaply clonable handle to the single open repository
#[derive(Clone)]
pub struct RepositoryHandle {
    repo: Arc<Mutex<Repository>>,
    root: PathBuf,
    credentials: Arc<CredentialIdentity>,
    intended_branch: Arc<RwLock<String>>,
}

impl RepositoryHandle {
    /// Open an existing, already checked-out working tree.
    ///
    /// `branch` is recorded as the intended branch without checking it out.
    pub fn open(
        path: &Path,
        branch: &str,
        credentials: CredentialIdentity,
    ) -> Result<Self, GitError> {
        info!("Opening git repo at {} branch is {}", path.display(), branch);

        if !path.is_dir() {
            return Err(GitError::NotARepository(path.to_path_buf()));
        }
        let root = get_git_repo_root(path)
            .map(PathBuf::from)
            .ok_or_else(|| GitError::NotARepository(path.to_path_buf()))?;

        Ok(Self {
            repo: Arc::new(Mutex::new(Repository { root: root.clone() })),
            root,
            credentials: Arc::new(credentials),
            intended_branch: Arc::new(RwLock::new(branch.to_string())),
        })
    }

    /// Top-level directory of the working tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn credentials(&self) -> &CredentialIdentity {
        &self.credentials
    }

    pub async fn intended_branch(&self) -> String {
        self.intended_branch.read().await.clone()
    }

    pub async fn set_intended_branch(&self, branch: &str) {
        *self.intended_branch.write().await = branch.to_string();
    }

    /// Take the repository lock and keep it until the guard is dropped
    pub async fn lock_owned(&self) -> OwnedMutexGuard<Repository> {
        self.repo.clone().lock_owned().await
    }

    /// Run `f` on a blocking thread while holding the repository lock
    pub async fn with_repo<T, F>(&self, f: F) -> Result<T, GitError>
    where
        F: FnOnce(&Repository) -> Result<T, GitError> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.lock_owned().await;
        tokio::task::spawn_blocking(move || f(&guard)).await?
    }

    pub async fn status(&self, include_files: bool) -> Result<RepositoryStatusSnapshot, GitError> {
        self.with_repo(move |repo| status::repository_status(repo.root(), include_files))
            .await
    }

    pub async fn branches(&self) -> Result<Vec<String>, GitError> {
        self.with_repo(|repo| status::list_branches(repo.root())).await
    }

    /// Check out `branch`, creating it if needed; returns `refs/heads/<branch>`
    pub async fn switch_branch(&self, branch: &str) -> Result<String, GitError> {
        let name = branch.to_string();
        let full_ref = self
            .with_repo(move |repo| branches::switch_branch(repo.root(), &name))
            .await?;
        self.set_intended_branch(branch).await;
        Ok(full_ref)
    }

    pub async fn commit_all(&self) -> Result<CommitOutcome, GitError> {
        self.with_repo(|repo| commit::commit_all(repo.root())).await
    }

    pub async fn reset_all(&self) -> Result<ResetReport, GitError> {
        self.with_repo(|repo| operations::reset_all(repo.root())).await
    }

    pub async fn push(&self) -> Result<(), GitError> {
        let credentials = self.credentials.clone();
        self.with_repo(move |repo| commit::push(repo.root(), &credentials))
            .await
    }
}
