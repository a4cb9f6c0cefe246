//! Git discard operations
//!
//! Drops changes the caller does not want committed. Each path is handled on
//! its own; a failure is logged and the remaining paths are still processed.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::status::list_changes;
use super::utils::*;

/// Remove an untracked path from disk.
///
/// Porcelain reports a nested repository as one `dir/` entry, so
/// directories go recursively.
fn remove_untracked(repo_root: &Path, path: &str) -> std::io::Result<()> {
    let full = repo_root.join(path.trim_end_matches('/'));
    let is_dir = path.ends_with('/') || fs::symlink_metadata(&full)?.is_dir();
    if is_dir {
        fs::remove_dir_all(&full)
    } else {
        fs::remove_file(&full)
    }
}

/// Delete untracked files and unstage modified ones.
///
/// Untracked files are dropped from the index (a no-op unless `git add`
/// raced us) and removed from disk. Modified tracked files are only
/// unstaged; their working-tree content is left as is.
pub fn reset_all(repo_root: &Path) -> Result<ResetReport, GitError> {
    let changes = list_changes(repo_root)?;
    if changes.is_empty() {
        return Ok(ResetReport::NothingToReset);
    }

    let mut removed = Vec::new();
    let mut unstaged = Vec::new();
    let mut failures = Vec::new();

    for change in &changes {
        match change.worktree {
            StatusCode::Untracked => {
                if let Err(e) = run_git(
                    repo_root,
                    &["rm", "--cached", "--ignore-unmatch", "-q", "--", &change.path],
                ) {
                    warn!("Failed to drop {} from the index: {}", change.path, e);
                }

                match remove_untracked(repo_root, &change.path) {
                    Ok(()) => {
                        info!("Removed untracked {}", change.path);
                        removed.push(change.path.clone());
                    }
                    Err(e) => {
                        warn!("Failed to remove {}: {}", change.path, e);
                        failures.push((change.path.clone(), e.to_string()));
                    }
                }
            }
            StatusCode::Modified => {
                // TODO: restore the committed content as well
                // (`git restore --source=HEAD --staged --worktree`) once
                // discarding local edits to tracked files is signed off.
                match run_git(repo_root, &["reset", "-q", "--", &change.path]) {
                    Ok(_) => {
                        info!("Unstaged {}", change.path);
                        unstaged.push(change.path.clone());
                    }
                    Err(e) => {
                        warn!("Failed to unstage {}: {}", change.path, e);
                        failures.push((change.path.clone(), e.to_string()));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(ResetReport::Reset {
        removed,
        unstaged,
        failures,
    })
}
