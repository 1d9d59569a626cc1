//! Persisted projects.
//!
//! A [`Project`] is the durable record of one generated application: its
//! files, the prompts that shaped it, who owns it, and whether a generation
//! is in flight. [`repository`] stores projects; [`reconcile`] folds a
//! finished generation back into its project.

pub mod reconcile;
pub mod repository;

pub use reconcile::{mark_failed, reconcile};
pub use repository::{FileProjectRepository, ProjectRepository};

use crate::FileSet;
use crate::api::tracing::CostTracker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest name derived from a prompt.
const DERIVED_NAME_CHARS: usize = 48;

/// Where a project is in its generation lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ProjectStatus {
    /// A background generation is running; files are from the previous run.
    Generating,
    #[default]
    Ready,
    /// The last generation failed; files are untouched.
    Failed { error: String },
}

impl ProjectStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Generating => "generating",
            ProjectStatus::Ready => "ready",
            ProjectStatus::Failed { .. } => "failed",
        }
    }
}

/// Cumulative token usage across every generation of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub estimated_cost_usd: f64,
    pub generations: u32,
}

impl ProjectUsage {
    /// Add one generation's usage.
    pub fn add(&mut self, run: &CostTracker) {
        self.prompt_tokens += run.prompt_tokens;
        self.completion_tokens += run.completion_tokens;
        self.estimated_cost_usd += run.estimated_cost_usd;
        self.generations += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// The prompt the project was created from.
    pub prompt: String,
    /// Every prompt that produced a successful generation, oldest first.
    #[serde(default)]
    pub prompt_history: Vec<String>,
    #[serde(default)]
    pub files: FileSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_user_id: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub usage: ProjectUsage,
}

impl Project {
    /// A fresh placeholder in [`ProjectStatus::Generating`], with no files.
    /// `name` falls back to the start of the prompt.
    pub fn new(owner_user_id: impl Into<String>, name: Option<String>, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| derive_name(&prompt));
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            prompt,
            prompt_history: Vec::new(),
            files: FileSet::new(),
            created_at: now,
            updated_at: now,
            owner_user_id: owner_user_id.into(),
            status: ProjectStatus::Generating,
            usage: ProjectUsage::default(),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.status == ProjectStatus::Generating
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_user_id == user_id
    }

    /// Flag a new generation as in flight.
    pub fn mark_generating(&mut self) {
        self.status = ProjectStatus::Generating;
        self.updated_at = Utc::now();
    }
}

/// First line of the prompt, cut at a word boundary.
fn derive_name(prompt: &str) -> String {
    let first_line = prompt.lines().map(str::trim).find(|l| !l.is_empty());
    let Some(line) = first_line else {
        return "Untitled app".to_string();
    };
    if line.chars().count() <= DERIVED_NAME_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(DERIVED_NAME_CHARS).collect();
    match cut.rsplit_once(' ') {
        Some((head, _)) if !head.is_empty() => format!("{head}..."),
        _ => format!("{cut}..."),
    }
}
