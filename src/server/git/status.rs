//! Git status queries
//!
//! Builds the repository status snapshot: changed paths, local branches,
//! HEAD, configured remotes and whether the current branch needs a push.
//! Nothing here contacts a remote.

use std::path::Path;

use tracing::debug;

use super::utils::*;

/// Parse `git status --porcelain=v1 -z` output
///
/// Format: `XY PATH\0`, or `XY NEW_PATH\0ORIG_PATH\0` for renames and copies.
/// X = index, Y = work tree. One entry per path.
pub(super) fn parse_porcelain_status(output: &str) -> Vec<FileChange> {
    let mut items = Vec::new();
    let parts: Vec<&str> = output.split('\0').collect();

    let mut i = 0;
    while i < parts.len() {
        let part = parts[i];
        i += 1;

        if part.len() < 4 {
            continue;
        }

        let mut chars = part.chars();
        let x = chars.next().unwrap_or(' ');
        let y = chars.next().unwrap_or(' ');
        let (Some(staging), Some(worktree)) = (StatusCode::from_char(x), StatusCode::from_char(y))
        else {
            debug!("skipping unrecognised status record {:?}", part);
            continue;
        };
        let path = part[3..].to_string();

        let orig_path = if matches!(x, 'R' | 'C') || matches!(y, 'R' | 'C') {
            let orig = parts.get(i).filter(|p| !p.is_empty()).map(|p| p.to_string());
            if orig.is_some() {
                i += 1;
            }
            orig
        } else {
            None
        };

        items.push(FileChange {
            path,
            orig_path,
            staging,
            worktree,
        });
    }

    items
}

/// Every changed path (untracked files listed individually, ignored files omitted)
pub fn list_changes(repo_root: &Path) -> Result<Vec<FileChange>, GitError> {
    let stdout = run_git(
        repo_root,
        &["status", "--porcelain=v1", "-z", "--untracked-files=all"],
    )?;
    Ok(parse_porcelain_status(&stdout))
}

/// Local branch names, `refs/heads/` stripped, in refname order
pub fn list_branches(repo_root: &Path) -> Result<Vec<String>, GitError> {
    let stdout = run_git(
        repo_root,
        &["for-each-ref", "--format=%(refname)", "refs/heads"],
    )?;

    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| strip_branch_prefix(l).to_string())
        .collect())
}

/// Parse `git remote -v`, keeping the fetch URL of each remote
pub(super) fn parse_remotes(output: &str) -> Vec<RemoteInfo> {
    let mut remotes: Vec<RemoteInfo> = Vec::new();

    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let (Some(name), Some(url)) = (fields.next(), fields.next()) else {
            continue;
        };
        if fields.next() == Some("(push)") {
            continue;
        }
        if remotes.iter().any(|r| r.name == name) {
            continue;
        }
        remotes.push(RemoteInfo {
            name: name.to_string(),
            url: url.to_string(),
        });
    }

    remotes
}

/// Configured remotes, without fetching
pub fn list_remotes(repo_root: &Path) -> Result<Vec<RemoteInfo>, GitError> {
    let stdout = run_git(repo_root, &["remote", "-v"])?;
    Ok(parse_remotes(&stdout))
}

/// Remote the branch pushes to: `branch.<name>.remote`, else `origin`
pub fn branch_remote(repo_root: &Path, branch: &str) -> String {
    let key = format!("branch.{}.remote", branch);
    run_git(repo_root, &["config", "--get", &key])
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_REMOTE.to_string())
}

/// Count of commits on HEAD not yet on the remote tracking ref.
///
/// Returns `Ok(None)` when a remote exists but the branch has no tracking
/// ref yet (never pushed).
pub fn ahead_of_upstream(
    repo_root: &Path,
    head_branch: &str,
) -> Result<Option<u32>, GitError> {
    let upstream = match run_git(
        repo_root,
        &[
            "rev-parse",
            "--abbrev-ref",
            "--symbolic-full-name",
            "@{upstream}",
        ],
    ) {
        Ok(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
        _ => {
            let remote = branch_remote(repo_root, head_branch);
            let tracking = format!("refs/remotes/{}/{}", remote, head_branch);
            let exists = run_git_raw(repo_root, &["show-ref", "--verify", "--quiet", &tracking])?;
            exists.status.success().then_some(tracking)
        }
    };

    let Some(upstream) = upstream else {
        return Ok(None);
    };

    let range = format!("{}..HEAD", upstream);
    let count = run_git(repo_root, &["rev-list", "--count", &range])?;
    let ahead = count.trim().parse::<u32>().map_err(|e| {
        GitError::CommandFailed(format!("Unexpected rev-list output '{}': {}", count.trim(), e))
    })?;
    Ok(Some(ahead))
}

/// Compute a fresh status snapshot of the working tree
pub fn repository_status(
    repo_root: &Path,
    include_files: bool,
) -> Result<RepositoryStatusSnapshot, GitError> {
    let remotes = list_remotes(repo_root)?;
    let branches = list_branches(repo_root)?;
    let changes = list_changes(repo_root)?;

    let head_hash = get_head_sha(repo_root);
    let head_branch = get_head_branch(repo_root).unwrap_or_default();

    let is_dirty = !changes.is_empty();
    let file_list = (include_files && is_dirty)
        .then(|| changes.iter().map(FileChange::listing).collect::<Vec<_>>());

    let (need_push, ahead_by) = if remotes.is_empty() || head_hash.is_none() || head_branch.is_empty()
    {
        (false, None)
    } else {
        match ahead_of_upstream(repo_root, &head_branch)? {
            Some(ahead) => (ahead > 0, Some(ahead)),
            None => (true, None),
        }
    };

    Ok(RepositoryStatusSnapshot {
        branches,
        head_hash: head_hash.unwrap_or_default(),
        head_branch,
        is_dirty,
        change_count: changes.len(),
        file_list,
        remote_list: remotes
            .iter()
            .map(|r| format!("{} {}", r.url, r.name))
            .collect(),
        need_push,
        ahead_by,
    })
}
