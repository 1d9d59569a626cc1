//! Fold a finished generation back into its project.

use super::{Project, ProjectRepository, ProjectStatus};
use crate::RepositoryError;
use crate::generator::GenerationOutput;
use chrono::Utc;
use tracing::info;

/// Apply a successful generation: replace the file set wholesale, append
/// `prompt` to the history, add the run's usage, mark the project ready and
/// persist it.
pub fn reconcile(
    repo: &dyn ProjectRepository,
    project: &mut Project,
    output: GenerationOutput,
    prompt: &str,
) -> Result<(), RepositoryError> {
    project.files = output.files;
    project.prompt_history.push(prompt.to_string());
    project.usage.add(&output.usage);
    project.status = ProjectStatus::Ready;
    project.updated_at = Utc::now();
    repo.put(project)?;
    info!(
        "Project {} ready: {} file(s), {} prompt(s) in history",
        project.id,
        project.files.len(),
        project.prompt_history.len()
    );
    Ok(())
}

/// Record a failed generation. Files and history are left as they were.
pub fn mark_failed(
    repo: &dyn ProjectRepository,
    project: &mut Project,
    error: &str,
) -> Result<(), RepositoryError> {
    project.status = ProjectStatus::Failed {
        error: error.to_string(),
    };
    project.updated_at = Utc::now();
    repo.put(project)?;
    info!("Project {} failed: {error}", project.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileSet;
    use crate::api::tracing::CostTracker;
    use crate::project::FileProjectRepository;

    fn output(files: &[(&str, &str)], tokens: u64) -> GenerationOutput {
        GenerationOutput {
            files: files.iter().copied().collect(),
            usage: CostTracker {
                prompt_tokens: tokens,
                completion_tokens: tokens,
                estimated_cost_usd: 0.01,
            },
        }
    }

    #[test]
    fn success_replaces_files_and_appends_history() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileProjectRepository::open(dir.path()).unwrap();
        let mut project = Project::new("alice", None, "a timer");
        project.files.insert("old.html", "gone soon");
        let before = project.updated_at;

        reconcile(&repo, &mut project, output(&[("index.html", "v1")], 10), "a timer").unwrap();
        reconcile(&repo, &mut project, output(&[("index.html", "v2")], 5), "make it red").unwrap();

        let stored = repo.get(&project.id).unwrap().unwrap();
        assert_eq!(stored.status, ProjectStatus::Ready);
        assert_eq!(stored.prompt_history, vec!["a timer", "make it red"]);
        let expected: FileSet = [("index.html", "v2")].into_iter().collect();
        assert_eq!(stored.files, expected);
        assert_eq!(stored.usage.prompt_tokens, 15);
        assert_eq!(stored.usage.generations, 2);
        assert!(stored.updated_at >= before);
    }

    #[test]
    fn failure_keeps_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileProjectRepository::open(dir.path()).unwrap();
        let mut project = Project::new("alice", None, "a timer");
        project.files.insert("index.html", "v1");

        mark_failed(&repo, &mut project, "no files produced").unwrap();

        let stored = repo.get(&project.id).unwrap().unwrap();
        assert_eq!(
            stored.status,
            ProjectStatus::Failed {
                error: "no files produced".into()
            }
        );
        assert_eq!(stored.files.get("index.html"), Some("v1"));
        assert!(stored.prompt_history.is_empty());
    }
}
