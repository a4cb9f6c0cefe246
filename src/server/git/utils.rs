//! Git utilities - type definitions and helper functions
//!
//! Provides common types, constants, and the `git` invocation helpers used
//! across the repository operations.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde::Serialize;
use thiserror::Error;

/// Namespace prefix of local branch refs
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Message of every commit produced by the service
pub const AUTO_COMMIT_MESSAGE: &str = "Auto-commit";

/// Synthetic identity used for author and committer
pub const AUTOSAVE_USER_NAME: &str = "Autosave User";
pub const AUTOSAVE_USER_EMAIL: &str = "autosave@forgerock.org";

/// Remote used when the current branch has none configured
pub const DEFAULT_REMOTE: &str = "origin";

/// Single-character change kind, as reported by porcelain v1 (`XY`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Unmodified,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    UpdatedButUnmerged,
    Untracked,
    Ignored,
    TypeChanged,
}

impl StatusCode {
    pub fn from_char(c: char) -> Option<Self> {
        let code = match c {
            ' ' => StatusCode::Unmodified,
            'M' => StatusCode::Modified,
            'A' => StatusCode::Added,
            'D' => StatusCode::Deleted,
            'R' => StatusCode::Renamed,
            'C' => StatusCode::Copied,
            'U' => StatusCode::UpdatedButUnmerged,
            '?' => StatusCode::Untracked,
            '!' => StatusCode::Ignored,
            'T' => StatusCode::TypeChanged,
            _ => return None,
        };
        Some(code)
    }

    pub fn as_char(&self) -> char {
        match self {
            StatusCode::Unmodified => ' ',
            StatusCode::Modified => 'M',
            StatusCode::Added => 'A',
            StatusCode::Deleted => 'D',
            StatusCode::Renamed => 'R',
            StatusCode::Copied => 'C',
            StatusCode::UpdatedButUnmerged => 'U',
            StatusCode::Untracked => '?',
            StatusCode::Ignored => '!',
            StatusCode::TypeChanged => 'T',
        }
    }
}

/// One changed path, with its index (X) and worktree (Y) state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    /// Source path of a rename or copy
    pub orig_path: Option<String>,
    pub staging: StatusCode,
    pub worktree: StatusCode,
}

impl FileChange {
    /// Character shown in file listings. The worktree side wins; staged-only
    /// changes fall back to the index side so they stay visible.
    pub fn display_code(&self) -> char {
        if self.worktree == StatusCode::Unmodified {
            self.staging.as_char()
        } else {
            self.worktree.as_char()
        }
    }

    /// `"<path> <code>"`, the wire format of the status file list
    pub fn listing(&self) -> String {
        format!("{} {}", self.path, self.display_code())
    }
}

/// Configured remote (no network access involved)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub name: String,
    pub url: String,
}

/// Aggregate repository state returned by `GET /git/status`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStatusSnapshot {
    pub branches: Vec<String>,
    #[serde(rename = "head")]
    pub head_hash: String,
    pub head_branch: String,
    pub is_dirty: bool,
    pub change_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remote_list: Vec<String>,
    pub need_push: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ahead_by: Option<u32>,
}

/// Result of the commit-all orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    NothingToCommit,
    Committed { sha: String },
}

/// Result of the reset orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetReport {
    NothingToReset,
    Reset {
        removed: Vec<String>,
        unstaged: Vec<String>,
        /// (path, error) pairs that were logged and skipped
        failures: Vec<(String, String)>,
    },
}

/// Error type for git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git working tree: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("Working directory is not clean. Can't switch branches")]
    DirtyWorktree,

    #[error("Invalid branch name '{0}'")]
    InvalidBranch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    CommandFailed(String),

    #[error("Git task failed: {0}")]
    Task(String),
}

impl GitError {
    /// Whether the caller, not the repository, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, GitError::DirtyWorktree | GitError::InvalidBranch(_))
    }
}

impl From<tokio::task::JoinError> for GitError {
    fn from(e: tokio::task::JoinError) -> Self {
        GitError::Task(e.to_string())
    }
}

/// Build a `git` command rooted at the working tree.
///
/// Prompts are disabled so a missing credential fails instead of hanging.
pub fn git_command(repo_root: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(repo_root)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C");
    cmd
}

/// Run `git <args>` and return its raw output
pub fn run_git_raw(repo_root: &Path, args: &[&str]) -> Result<Output, GitError> {
    git_command(repo_root)
        .args(args)
        .output()
        .map_err(GitError::Io)
}

/// Run `git <args>` and return stdout, or the trimmed stderr as an error
pub fn run_git(repo_root: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = run_git_raw(repo_root, args)?;
    output_to_result(&output, args)
}

/// Convert a finished git process into stdout or a `CommandFailed` error
pub fn output_to_result(output: &Output, args: &[&str]) -> Result<String, GitError> {
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(GitError::CommandFailed(if stderr.is_empty() {
        format!(
            "git {} failed ({})",
            args.first().copied().unwrap_or_default(),
            output.status
        )
    } else {
        stderr
    }))
}

/// Resolve the top-level directory of a non-bare working tree
pub fn get_git_repo_root(workspace_root: &Path) -> Option<String> {
    let output = run_git_raw(workspace_root, &["rev-parse", "--show-toplevel"]).ok()?;

    if output.status.success() {
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if root.is_empty() {
            None
        } else {
            Some(root)
        }
    } else {
        None
    }
}

/// Full SHA of HEAD, or `None` on an unborn branch
pub fn get_head_sha(repo_root: &Path) -> Option<String> {
    let output = run_git_raw(repo_root, &["rev-parse", "--verify", "-q", "HEAD"]).ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

/// Branch HEAD points at (prefix stripped), or `None` when detached
pub fn get_head_branch(repo_root: &Path) -> Option<String> {
    let output = run_git_raw(repo_root, &["symbolic-ref", "-q", "HEAD"]).ok()?;

    if !output.status.success() {
        return None;
    }
    let full = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Some(strip_branch_prefix(&full).to_string())
}

/// `refs/heads/foo` -> `foo`; anything else is returned unchanged
pub fn strip_branch_prefix(refname: &str) -> &str {
    refname.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(refname)
}
