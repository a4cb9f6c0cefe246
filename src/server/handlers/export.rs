//! `GET /export`: run the configuration export tool and stream its output
//!
//! The tool writes into the working tree, so the run holds the repository
//! lock until the tool exits.

use std::io::Write;
use std::path::{Component, Path};

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::info;

use crate::server::context::{AppError, AppState};
use crate::server::exec;

pub const AUTO_EXPORT_MESSAGE: &str =
    "Configuration is auto exported. Manual export not supported\n";

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub path: Option<String>,
}

/// Export targets must stay inside the repository
fn validate_export_path(path: &str) -> Result<(), AppError> {
    let escapes = Path::new(path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(AppError::BadRequest(format!("Invalid export path '{}'", path)));
    }
    Ok(())
}

/// Write the per-call tool script to a temporary file
fn write_script(contents: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("export-")
        .suffix(".amster")
        .tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// GET /export?path=<relative path>
pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let settings = state.settings.read().await.clone();
    if settings.is_auto_export {
        return Ok(AUTO_EXPORT_MESSAGE.into_response());
    }

    let path = query
        .path
        .filter(|p| !p.is_empty())
        .unwrap_or(settings.export_path);
    validate_export_path(&path)?;

    let root = settings.git_path.display().to_string();
    let target = format!("{}/{}", root.trim_end_matches('/'), path);

    let script = write_script(&state.export_tool.script(&target))
        .map_err(|e| AppError::Internal(format!("Failed to write export script: {}", e)))?;

    info!("Executing export to {}", target);
    let mut cmd = Command::new(&state.export_tool.binary);
    cmd.arg(script.path()).current_dir(&settings.git_path);

    let repo = state.repo.clone();
    let rx = exec::run_streaming(cmd, async move {
        let guard = repo.lock_owned().await;
        (guard, script)
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        exec::into_body(rx),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_export_path() {
        assert!(validate_export_path("default/am/autosave-am").is_ok());
        assert!(validate_export_path("./am").is_ok());
        assert!(validate_export_path("../outside").is_err());
        assert!(validate_export_path("am/../../x").is_err());
        assert!(validate_export_path("/etc").is_err());
    }

    #[test]
    fn test_write_script() {
        let file = write_script("export-config --path /x\n").unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "export-config --path /x\n");
    }
}
