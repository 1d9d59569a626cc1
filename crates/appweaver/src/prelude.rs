//! Convenience re-exports for common `appweaver` types.
//!
//! ```ignore
//! use appweaver::prelude::*;
//! ```
//!
//! Covers the client, the harness, the generators, attachments and the
//! project store. Lower-level pieces (image normalization, retry policy,
//! pricing tables) stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{
    ChatBackend, ChatRequest, FileSet, GeneratedFile, Message, OpenRouterClient, ToolDef,
    json_schema_for,
};

// ── Conversation ────────────────────────────────────────────────────
pub use crate::conversation::{
    ContentBlock, Conversation, ConversationTurn, ImageSource, ToolInvocation, ToolResult,
};

// ── Agent runtime ───────────────────────────────────────────────────
pub use crate::agent::{
    CompositeEventHandler, EventHandler, Harness, HarnessConfig, HarnessEvent, HarnessResult,
    LoggingHandler, NoopHandler, SystemPromptBuilder,
};

// ── Tools ───────────────────────────────────────────────────────────
pub use crate::tools::{Tool, ToolFuture, ToolOutput, ToolSet, WriteFile};

// ── Generation ──────────────────────────────────────────────────────
pub use crate::generator::{
    GenerationConfig, GenerationOutput, GenerationRequest, Generator, LlmGenerator,
    TemplateGenerator,
};
pub use crate::vision::{Attachment, ContentBuilder};

// ── Projects ────────────────────────────────────────────────────────
pub use crate::project::{
    FileProjectRepository, Project, ProjectRepository, ProjectStatus, mark_failed, reconcile,
};

// ── Errors ──────────────────────────────────────────────────────────
pub use crate::{ApiError, GenerationError, ImageError, RepositoryError};
