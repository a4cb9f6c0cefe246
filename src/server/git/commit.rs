//! Git commit and push operations
//!
//! Stage-everything commits with the synthetic autosave identity, and pushes
//! of the current branch with the loaded SSH credential.

use std::path::Path;

use tracing::{info, warn};

use super::credentials::CredentialIdentity;
use super::status::{branch_remote, list_changes};
use super::utils::*;

/// Bring the index in line with the working tree for every changed path.
///
/// Deleted files are removed from the index, everything else is added.
/// Per-path failures are logged; the commit decides whether anything landed.
fn stage_all(repo_root: &Path, changes: &[FileChange]) {
    for change in changes {
        let result = if change.worktree == StatusCode::Deleted {
            info!("Removing {} from staging", change.path);
            run_git(repo_root, &["rm", "--cached", "-q", "--", &change.path])
        } else {
            info!("Adding {} to staging", change.path);
            run_git(repo_root, &["add", "--", &change.path])
        };

        if let Err(e) = result {
            warn!("Failed to stage {}: {}", change.path, e);
        }
    }
}

/// Stage every change and commit it as "Auto-commit".
///
/// A clean tree is not an error: it yields `CommitOutcome::NothingToCommit`.
pub fn commit_all(repo_root: &Path) -> Result<CommitOutcome, GitError> {
    let changes = list_changes(repo_root)?;
    if changes.is_empty() {
        return Ok(CommitOutcome::NothingToCommit);
    }

    stage_all(repo_root, &changes);

    let args = ["commit", "--no-verify", "-q", "-m", AUTO_COMMIT_MESSAGE];
    let output = git_command(repo_root)
        .args(args)
        .env("GIT_AUTHOR_NAME", AUTOSAVE_USER_NAME)
        .env("GIT_AUTHOR_EMAIL", AUTOSAVE_USER_EMAIL)
        .env("GIT_COMMITTER_NAME", AUTOSAVE_USER_NAME)
        .env("GIT_COMMITTER_EMAIL", AUTOSAVE_USER_EMAIL)
        .output()?;

    if !output.status.success() {
        // `git commit` reports "nothing to commit" on stdout
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = match (stderr.is_empty(), stdout.is_empty()) {
            (false, _) => stderr,
            (true, false) => stdout,
            (true, true) => format!("git commit failed ({})", output.status),
        };
        return Err(GitError::CommandFailed(detail));
    }

    let sha = get_head_sha(repo_root)
        .ok_or_else(|| GitError::CommandFailed("HEAD missing after commit".to_string()))?;
    info!("Committed {} ({} paths)", sha, changes.len());

    Ok(CommitOutcome::Committed { sha })
}

/// Push the current branch to its remote (default `origin`)
pub fn push(repo_root: &Path, credentials: &CredentialIdentity) -> Result<(), GitError> {
    let branch = get_head_branch(repo_root).unwrap_or_default();
    let remote = branch_remote(repo_root, &branch);

    info!("Pushing {} to {}", if branch.is_empty() { "HEAD" } else { &branch }, remote);

    let args = ["push", "--porcelain", remote.as_str(), "HEAD"];
    let output = git_command(repo_root)
        .args(args)
        .envs(credentials.push_env())
        .output()?;

    output_to_result(&output, &args).map(|_| ())
}
