//! Tool abstraction for the generation loop.
//!
//! The [`Tool`] trait pairs a static API definition (name, description, JSON
//! schema) with an async `execute` that operates on the run's [`FileSet`].
//! Tools are collected into a [`ToolSet`] which handles dispatch by name and
//! definition export.

use crate::{FileSet, ToolDef};
use indexmap::IndexMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, trace};

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = ToolOutput> + Send + 'a>>;

/// Result of one tool execution, fed back to the model as a tool message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
    /// Path committed to the [`FileSet`], if the call wrote a file.
    pub written: Option<String>,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            written: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            written: None,
        }
    }

    /// Mark this output as having written `path`.
    pub fn with_written(mut self, path: impl Into<String>) -> Self {
        self.written = Some(path.into());
        self
    }
}

/// A tool the model can invoke via function calling.
///
/// Failures are reported through [`ToolOutput::error`] rather than panics;
/// the loop passes them back to the model so it can correct itself.
pub trait Tool: Send + Sync {
    /// The definition sent to the LLM API.
    fn definition(&self) -> ToolDef;

    /// Execute with the raw JSON arguments string against the run's files.
    fn execute<'a>(&'a self, arguments: &'a str, files: &'a mut FileSet) -> ToolFuture<'a>;

    fn name(&self) -> String {
        self.definition().function.name
    }
}

/// Tools dispatched by name. Definitions are exported in registration order.
#[derive(Default)]
pub struct ToolSet {
    tools: IndexMap<String, Box<dyn Tool>>,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    /// Register a tool (builder pattern).
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// All tool definitions for the LLM API.
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call by name. Unknown names produce an error output.
    pub async fn execute(&self, name: &str, arguments: &str, files: &mut FileSet) -> ToolOutput {
        let Some(tool) = self.tools.get(name) else {
            info!("[tool] unknown tool requested: {name}");
            return ToolOutput::error(format!(
                "unknown tool '{name}'. Available tools: {}",
                self.names().collect::<Vec<_>>().join(", ")
            ));
        };

        log_tool_call(name, arguments);
        let start = std::time::Instant::now();
        let output = tool.execute(arguments, files).await;
        debug!(
            "Tool {name} completed in {:.0}ms (error: {})",
            start.elapsed().as_secs_f64() * 1000.0,
            output.is_error
        );
        trace!("Tool {name} result: {}", output.content);
        output
    }
}

/// Log a tool call: name plus a short argument preview at info, full size at
/// debug, full arguments at trace.
pub fn log_tool_call(name: &str, arguments: &str) {
    let args_preview: String = arguments.chars().take(120).collect();
    info!(
        "[tool] {}({args_preview}{})",
        name,
        if arguments.chars().count() > 120 { "..." } else { "" }
    );
    debug!("[tool] {name} full args ({} bytes)", arguments.len());
    trace!("[tool] {name} arguments: {arguments}");
}
