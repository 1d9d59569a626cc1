//! Background generation.
//!
//! Handlers persist the project in the `generating` state first and then
//! hand the request to [`spawn_generation`]. The task re-reads the record
//! when the generator returns, so edits made in between (a delete, say) are
//! respected.

use appweaver::RepositoryError;
use appweaver::generator::{GenerationOutput, GenerationRequest};
use appweaver::project::{ProjectRepository, mark_failed, reconcile};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::AppState;

/// Failure recorded for runs the previous process never finished.
pub const INTERRUPTED: &str = "generation interrupted by a server restart";

/// Run `request` on a detached task and fold the outcome into project
/// `project_id`. The handle is only useful to tests; dropping it does not
/// cancel the run.
///
/// The generator runs on its own inner task so a panic inside it still
/// marks the project failed.
pub fn spawn_generation(
    state: AppState,
    project_id: String,
    request: GenerationRequest,
) -> JoinHandle<()> {
    let prompt = request.prompt.clone();
    let mode = if request.is_update() { "update" } else { "create" };
    info!(
        "Starting {mode} generation for project {project_id} with {} generator",
        state.generator.name()
    );
    tokio::spawn(async move {
        let generator = state.generator.clone();
        let run = tokio::spawn(async move { generator.generate(request).await });
        let outcome = match run.await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => {
                error!("Generation task for project {project_id} died: {e}");
                Err(format!("generation aborted: {e}"))
            }
        };
        if let Err(e) = finish(&state, &project_id, &prompt, outcome) {
            error!("Could not record generation result for project {project_id}: {e}");
        }
    })
}

fn finish(
    state: &AppState,
    project_id: &str,
    prompt: &str,
    outcome: Result<GenerationOutput, String>,
) -> Result<(), RepositoryError> {
    let repo = state.repo.as_ref();
    let Some(mut project) = repo.get(project_id)? else {
        warn!("Project {project_id} was deleted during generation; discarding result");
        return Ok(());
    };
    match outcome {
        Ok(output) => reconcile(repo, &mut project, output, prompt),
        Err(e) => {
            warn!("Generation for project {project_id} failed: {e}");
            mark_failed(repo, &mut project, &e)
        }
    }
}

/// Mark every project still `generating` as failed. Run once at startup,
/// before any handler can start a new generation. Returns how many were
/// recovered.
pub fn recover_interrupted(repo: &dyn ProjectRepository) -> Result<usize, RepositoryError> {
    let mut recovered = 0;
    for mut project in repo.list(None)? {
        if project.is_generating() {
            mark_failed(repo, &mut project, INTERRUPTED)?;
            recovered += 1;
        }
    }
    if recovered > 0 {
        warn!("Marked {recovered} interrupted generation(s) as failed");
    }
    Ok(recovered)
}
