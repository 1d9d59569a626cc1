//! REST API endpoint handlers.
//!
//! Every `/api` route needs the caller's id in [`USER_HEADER`]. Projects
//! owned by someone else answer 404, the same as unknown ids.

use std::sync::Arc;

use appweaver::generator::{GenerationRequest, Generator};
use appweaver::project::{Project, ProjectRepository};
use appweaver::vision::{Attachment, DEFAULT_MAX_IMAGE_BYTES, prepare_attachment};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::ServiceError;
use crate::jobs::spawn_generation;
use crate::views::{ProjectSummary, Stats};

/// Header carrying the authenticated caller's id.
pub const USER_HEADER: &str = "x-user-id";

/// Full-size images one request body is sized for.
pub const MAX_ATTACHMENTS_PER_REQUEST: usize = 4;

/// Room for the prompt and JSON framing on top of the attachments.
const BODY_OVERHEAD: usize = 1024 * 1024;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ProjectRepository>,
    pub generator: Arc<dyn Generator>,
    /// Per-image ceiling used to reject uploads up front.
    pub max_image_bytes: usize,
}

impl AppState {
    pub fn new(repo: Arc<dyn ProjectRepository>, generator: Arc<dyn Generator>) -> Self {
        Self {
            repo,
            generator,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }

    /// Fetch `id` if it exists and belongs to `owner`.
    fn owned_project(&self, id: &str, owner: &Owner) -> Result<Project, ServiceError> {
        self.repo
            .get(id)?
            .filter(|p| p.is_owned_by(&owner.0))
            .ok_or(ServiceError::NotFound)
    }

    /// Request body ceiling: [`MAX_ATTACHMENTS_PER_REQUEST`] images at the
    /// per-image ceiling, base64-encoded.
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes.div_ceil(3) * 4 * MAX_ATTACHMENTS_PER_REQUEST + BODY_OVERHEAD
    }

    /// Validate uploads and shrink oversized images on a blocking thread.
    async fn prepare_attachments(
        &self,
        attachments: Vec<Attachment>,
    ) -> Result<Vec<Attachment>, ServiceError> {
        if attachments.is_empty() {
            return Ok(attachments);
        }
        let max_bytes = self.max_image_bytes;
        tokio::task::spawn_blocking(move || {
            attachments
                .into_iter()
                .map(|attachment| {
                    let name = attachment.name.clone();
                    prepare_attachment(attachment, max_bytes)
                        .map_err(|source| ServiceError::Attachment { name, source })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("attachment processing failed: {e}")))?
    }
}

/// The caller, from [`USER_HEADER`].
pub struct Owner(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Owner(v.to_string()))
            .ok_or(ServiceError::MissingUser)
    }
}

/// `Json<T>` whose rejections use the service's error body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ServiceError::Body {
                status: rejection.status(),
                message: rejection.body_text(),
            }),
        }
    }
}

fn require_prompt(prompt: &str) -> Result<(), ServiceError> {
    if prompt.trim().is_empty() {
        Err(ServiceError::BadRequest("prompt must not be empty".into()))
    } else {
        Ok(())
    }
}

/// GET /health
pub async fn health(State(app): State<AppState>) -> Json<Value> {
    Json(json!({"status": "ok", "generator": app.generator.name()}))
}

/// Request body for POST /api/projects.
#[derive(Deserialize)]
pub struct CreateProjectBody {
    #[serde(default)]
    pub name: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// POST /api/projects: Create a project and start generating it.
///
/// Returns 202 with the `generating` placeholder.
pub async fn create_project(
    State(app): State<AppState>,
    owner: Owner,
    JsonBody(body): JsonBody<CreateProjectBody>,
) -> Result<(StatusCode, Json<Project>), ServiceError> {
    require_prompt(&body.prompt)?;
    let attachments = app.prepare_attachments(body.attachments).await?;

    let project = Project::new(owner.0, body.name, body.prompt.clone());
    app.repo.put(&project)?;
    info!("Created project {} for {}", project.id, project.owner_user_id);

    let request = GenerationRequest::create(body.prompt).with_attachments(attachments);
    spawn_generation(app.clone(), project.id.clone(), request);

    Ok((StatusCode::ACCEPTED, Json(project)))
}

/// GET /api/projects: The caller's projects, newest first.
pub async fn list_projects(
    State(app): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<ProjectSummary>>, ServiceError> {
    let projects = app.repo.list(Some(&owner.0))?;
    Ok(Json(projects.iter().map(ProjectSummary::from).collect()))
}

/// GET /api/projects/{id}: Full record; clients poll this.
pub async fn get_project(
    State(app): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<Project>, ServiceError> {
    Ok(Json(app.owned_project(&id, &owner)?))
}

/// Request body for POST /api/projects/{id}/iterate.
#[derive(Deserialize)]
pub struct IterateBody {
    pub prompt: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// POST /api/projects/{id}/iterate: Ask for a change to an existing project.
///
/// 409 while a previous generation is still running.
pub async fn iterate_project(
    State(app): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<IterateBody>,
) -> Result<(StatusCode, Json<Project>), ServiceError> {
    require_prompt(&body.prompt)?;
    let mut project = app.owned_project(&id, &owner)?;
    if project.is_generating() {
        return Err(ServiceError::Conflict(format!(
            "project {id} is already generating"
        )));
    }
    let attachments = app.prepare_attachments(body.attachments).await?;

    project.mark_generating();
    app.repo.put(&project)?;

    let request = GenerationRequest::iterate(body.prompt, project.files.clone())
        .with_attachments(attachments);
    spawn_generation(app.clone(), project.id.clone(), request);

    Ok((StatusCode::ACCEPTED, Json(project)))
}

/// DELETE /api/projects/{id}
pub async fn delete_project(
    State(app): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let project = app.owned_project(&id, &owner)?;
    app.repo.delete(&project.id)?;
    info!("Deleted project {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/projects/{id}/files/{*path}: One generated file, served raw.
pub async fn get_file(
    State(app): State<AppState>,
    owner: Owner,
    Path((id, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = app.owned_project(&id, &owner)?;
    let content = project
        .files
        .get(&path)
        .ok_or_else(|| ServiceError::FileNotFound(path.clone()))?
        .to_string();
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], content))
}

/// GET /api/admin/stats: Totals across every owner.
pub async fn admin_stats(
    State(app): State<AppState>,
    _owner: Owner,
) -> Result<Json<Stats>, ServiceError> {
    let projects = app.repo.list(None)?;
    Ok(Json(Stats::collect(&projects)))
}

/// Content type for a generated file, by extension.
fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "md" => "text/markdown; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}
