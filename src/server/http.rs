//! HTTP router and server startup

use std::path::Path;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::server::context::AppState;
use crate::server::git::{CredentialIdentity, RepositoryHandle};
use crate::server::handlers;

/// Build the HTTP router. The UI directory is served under /ui when present.
pub fn build_router(state: AppState, ui_dir: Option<&Path>) -> Router {
    // The UI may be hosted outside the cluster
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(300));

    let git_routes = Router::new()
        .route("/status", get(handlers::git::git_status))
        .route("/commit", get(handlers::git::git_commit))
        .route("/push", get(handlers::git::git_push))
        .route(
            "/branch",
            get(handlers::git::git_list_branches).post(handlers::git::git_switch_branch),
        )
        .route("/reset", post(handlers::git::git_reset));

    let mut app = Router::new()
        .route("/", get(handlers::index))
        .route("/export", get(handlers::export::export))
        .route(
            "/config",
            get(handlers::settings::get_config).post(handlers::settings::set_config),
        )
        .nest("/git", git_routes);

    match ui_dir {
        Some(dir) if dir.is_dir() => {
            info!("Serving UI from {}", dir.display());
            app = app.nest_service("/ui", ServeDir::new(dir));
        }
        Some(dir) => warn!("UI directory {} not found, /ui disabled", dir.display()),
        None => {}
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Open the repository, load the push credential and serve until shutdown.
///
/// Any failure before the listener is bound is a startup error.
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    use anyhow::Context;

    let candidates = CredentialIdentity::default_candidates(config.ssh_key.as_deref());
    let credentials = CredentialIdentity::load(&candidates)
        .context("git push credential")?
        .with_known_hosts(config.known_hosts.clone());

    let repo = RepositoryHandle::open(&config.git_path, &config.branch, credentials)
        .with_context(|| format!("opening git repo at {}", config.git_path.display()))?;

    if config.is_auto_export {
        info!(
            "Export tool {} not found, configuration is auto exported",
            config.export_tool.binary.display()
        );
    }

    let state = AppState::new(
        repo,
        config.initial_settings(),
        config.export_tool.clone(),
    );
    let app = build_router(state, Some(&config.ui_dir));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;

    info!("Listening on http://{}", config.listen);

    axum::serve(listener, app).await?;

    Ok(())
}
