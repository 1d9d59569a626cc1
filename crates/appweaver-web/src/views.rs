//! Response shapes that are not a bare [`Project`].

use std::collections::HashSet;

use appweaver::project::{Project, ProjectStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of `GET /api/projects`: the record without file contents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub status: ProjectStatus,
    pub file_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            prompt: project.prompt.clone(),
            status: project.status.clone(),
            file_count: project.files.len(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// Service-wide totals for `GET /api/admin/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub projects: usize,
    pub generating: usize,
    pub ready: usize,
    pub failed: usize,
    pub files: usize,
    pub owners: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub estimated_cost_usd: f64,
}

impl Stats {
    pub fn collect(projects: &[Project]) -> Self {
        let mut stats = Stats {
            projects: projects.len(),
            ..Default::default()
        };
        let mut owners = HashSet::new();
        for project in projects {
            match project.status {
                ProjectStatus::Generating => stats.generating += 1,
                ProjectStatus::Ready => stats.ready += 1,
                ProjectStatus::Failed { .. } => stats.failed += 1,
            }
            stats.files += project.files.len();
            stats.prompt_tokens += project.usage.prompt_tokens;
            stats.completion_tokens += project.usage.completion_tokens;
            stats.estimated_cost_usd += project.usage.estimated_cost_usd;
            owners.insert(project.owner_user_id.as_str());
        }
        stats.owners = owners.len();
        stats
    }
}
