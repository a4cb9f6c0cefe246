//! Git branch management
//!
//! Checkout-or-create of a named branch. Switching is refused outright while
//! the working tree has changes; there is no stash.

use std::path::Path;

use tracing::{info, warn};

use super::status::list_changes;
use super::utils::*;

/// Reject names git could read as an option
pub fn validate_branch_name(name: &str) -> Result<(), GitError> {
    if name.is_empty() || name.starts_with('-') || name.chars().any(char::is_whitespace) {
        return Err(GitError::InvalidBranch(name.to_string()));
    }
    Ok(())
}

/// Check out `refs/heads/<branch>`, creating it at HEAD when `create` is set.
///
/// Uses `git switch` (Git 2.23+), falls back to `git checkout` on older git.
fn checkout(repo_root: &Path, branch: &str, create: bool) -> Result<(), GitError> {
    let switch_args: Vec<&str> = if create {
        vec!["switch", "-c", branch]
    } else {
        vec!["switch", "--no-guess", branch]
    };

    let output = run_git_raw(repo_root, &switch_args)?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.contains("is not a git command") {
        return output_to_result(&output, &switch_args).map(|_| ());
    }

    // Fallback to git checkout; the trailing `--` keeps a same-named file
    // from being checked out instead of the branch
    let checkout_args: Vec<&str> = if create {
        vec!["checkout", "-b", branch, "--"]
    } else {
        vec!["checkout", "--no-guess", branch, "--"]
    };
    run_git(repo_root, &checkout_args).map(|_| ())
}

/// Switch to `branch`, creating it from HEAD if it cannot be checked out.
///
/// Returns the full ref name (`refs/heads/<branch>`).
pub fn switch_branch(repo_root: &Path, branch: &str) -> Result<String, GitError> {
    validate_branch_name(branch)?;

    if !list_changes(repo_root)?.is_empty() {
        return Err(GitError::DirtyWorktree);
    }

    let full_ref = format!("{}{}", BRANCH_REF_PREFIX, branch);
    info!("Checkout branch {}", full_ref);

    // Any failure here, not just a missing branch, takes the create path
    if let Err(e) = checkout(repo_root, branch, false) {
        warn!("Checkout of {} failed ({}), will try creating branch", full_ref, e);
        checkout(repo_root, branch, true)?;
        info!("Created branch {}", full_ref);
    }

    Ok(full_ref)
}
