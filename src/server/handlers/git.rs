//! `/git/*` handlers
//!
//! Thin wrappers over [`RepositoryHandle`](crate::server::git::RepositoryHandle);
//! all locking and git work happens there.

use axum::extract::{Query, State};
use axum::{Form, Json};
use serde::Deserialize;
use tracing::info;

use crate::server::context::{AppError, AppState};
use crate::server::git::{CommitOutcome, RepositoryStatusSnapshot, ResetReport};

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub files: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BranchForm {
    #[serde(default)]
    pub branch: Option<String>,
}

/// GET /git/status?files=true
pub async fn git_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<RepositoryStatusSnapshot>, AppError> {
    let include_files = query.files.as_deref() == Some("true");
    let snapshot = state.repo.status(include_files).await?;
    Ok(Json(snapshot))
}

/// GET /git/branch
pub async fn git_list_branches(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.repo.branches().await?))
}

/// POST /git/branch, form field `branch` (the query string is accepted too)
pub async fn git_switch_branch(
    State(state): State<AppState>,
    Query(query): Query<BranchForm>,
    form: Option<Form<BranchForm>>,
) -> Result<String, AppError> {
    let branch = form
        .and_then(|Form(f)| f.branch)
        .or(query.branch)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::BadRequest("Branch parameter missing".to_string()))?;

    Ok(state.repo.switch_branch(&branch).await?)
}

/// GET /git/commit
pub async fn git_commit(State(state): State<AppState>) -> Result<String, AppError> {
    match state.repo.commit_all().await? {
        CommitOutcome::NothingToCommit => Ok("Nothing to commit".to_string()),
        CommitOutcome::Committed { sha } => Ok(format!("Commit {}\n", sha)),
    }
}

/// GET /git/push
pub async fn git_push(State(state): State<AppState>) -> Result<String, AppError> {
    state.repo.push().await?;
    Ok("Pushed OK\n".to_string())
}

/// POST /git/reset
pub async fn git_reset(State(state): State<AppState>) -> Result<String, AppError> {
    match state.repo.reset_all().await? {
        ResetReport::NothingToReset => Ok("Nothing to reset".to_string()),
        ResetReport::Reset {
            removed,
            unstaged,
            failures,
        } => {
            info!(
                "Reset removed {} untracked, unstaged {} modified, {} failures",
                removed.len(),
                unstaged.len(),
                failures.len()
            );
            Ok("ok".to_string())
        }
    }
}
