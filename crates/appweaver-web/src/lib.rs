//! HTTP service for appweaver.
//!
//! `appweaver-web` exposes project CRUD over a REST API. Creating or
//! iterating on a project returns immediately with the record in the
//! `generating` state; the generation itself runs on a detached Tokio task
//! and writes its result back to the repository. Clients poll
//! `GET /api/projects/{id}` until the status turns `ready` or `failed`.
//!
//! # Quick start
//!
//! ```ignore
//! use appweaver::generator::TemplateGenerator;
//! use appweaver::project::FileProjectRepository;
//! use appweaver_web::{AppState, WebConfig, spawn_web};
//! use std::sync::Arc;
//!
//! let state = AppState::new(
//!     Arc::new(FileProjectRepository::open("./data/projects")?),
//!     Arc::new(TemplateGenerator),
//! );
//! let addr = spawn_web(state, WebConfig::default()).await?;
//! println!("Listening on http://{addr}");
//! ```
//!
//! # Architecture
//!
//! ```text
//! POST /api/projects ──▶ placeholder (generating) ──put──▶ ProjectRepository
//!         │                                                     ▲
//!         └──tokio::spawn──▶ Generator::generate ──reconcile────┘
//!
//! GET /api/projects/{id} ◀── poll ── client
//! ```
//!
//! Callers are identified by the `x-user-id` header, set by an
//! authenticating proxy in front of the service.

mod api;
mod error;
mod jobs;
mod server;
pub mod views;

pub use api::{AppState, JsonBody, MAX_ATTACHMENTS_PER_REQUEST, USER_HEADER};
pub use error::ServiceError;
pub use jobs::{INTERRUPTED, recover_interrupted, spawn_generation};
pub use server::{build_router, start_server};
pub use views::{ProjectSummary, Stats};

use std::net::SocketAddr;

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down. Bind to port 0 to
/// get a free port (tests do this).
pub async fn spawn_web(state: AppState, config: WebConfig) -> std::io::Result<SocketAddr> {
    let router = build_router(state);
    start_server(router, config.bind_addr).await
}
