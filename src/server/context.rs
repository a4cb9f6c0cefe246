//! Shared state and error types
//!
//! Every handler receives [`AppState`]; every handler error is an
//! [`AppError`] that axum turns into a plain-text response.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, warn};

use crate::config::{ExportToolConfig, RuntimeSettings};
use crate::server::git::{GitError, RepositoryHandle};

/// Settings that `/config` reads and updates
pub type SharedSettings = Arc<RwLock<RuntimeSettings>>;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryHandle,
    pub settings: SharedSettings,
    pub export_tool: Arc<ExportToolConfig>,
}

impl AppState {
    pub fn new(
        repo: RepositoryHandle,
        settings: RuntimeSettings,
        export_tool: ExportToolConfig,
    ) -> Self {
        Self {
            repo,
            settings: Arc::new(RwLock::new(settings)),
            export_tool: Arc::new(export_tool),
        }
    }
}

/// Application error, rendered as a plain-text body
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Git(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Git(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
