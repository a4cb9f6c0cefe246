//! `/config` handlers
//!
//! The intended branch lives on the repository handle; the rest of the
//! settings live in [`AppState::settings`].

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::config::{RuntimeSettings, SettingsUpdate};
use crate::server::context::{AppError, AppState};

async fn current_settings(state: &AppState) -> RuntimeSettings {
    let mut settings = state.settings.read().await.clone();
    settings.git_branch = state.repo.intended_branch().await;
    settings
}

/// GET /config
pub async fn get_config(State(state): State<AppState>) -> Json<RuntimeSettings> {
    Json(current_settings(&state).await)
}

/// POST /config with a JSON body; the content type is not checked
pub async fn set_config(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RuntimeSettings>, AppError> {
    let update: SettingsUpdate = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid config: {}", e)))?;

    let updated = {
        let mut settings = state.settings.write().await;
        settings.git_branch = state.repo.intended_branch().await;
        if let Some(branch) = settings.apply(update) {
            // Only the intent changes; checkout stays with POST /git/branch
            state.repo.set_intended_branch(&branch).await;
        }
        settings.clone()
    };

    info!(
        "Config is now exportPath={} gitBranch={}",
        updated.export_path, updated.git_branch
    );
    Ok(Json(updated))
}
