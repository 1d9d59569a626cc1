//! Axum server setup and router construction.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::api::{self, AppState};

/// Build the full axum router.
///
/// Request bodies are capped by [`AppState::body_limit`], which leaves room
/// for base64 image attachments at the per-image ceiling.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.body_limit();

    // Browser frontends are served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/projects",
            get(api::list_projects).post(api::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(api::get_project).delete(api::delete_project),
        )
        .route("/api/projects/{id}/iterate", post(api::iterate_project))
        .route("/api/projects/{id}/files/{*path}", get(api::get_file))
        .route("/api/admin/stats", get(api::admin_stats))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind `bind_addr`, start serving on a background task and return the
/// bound address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Server on {addr} stopped: {e}");
        }
    });

    Ok(addr)
}
