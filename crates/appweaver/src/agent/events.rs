//! Events, handlers, and run results for the [`Harness`](super::harness::Harness).
//!
//! The harness reports its lifecycle through [`HarnessEvent`] variants.
//! Callers implement [`EventHandler`] to observe them.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests and background jobs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use crate::FileSet;
use crate::api::tracing::CostTracker;
use crate::conversation::ConversationTurn;
use tracing::{debug, info, warn};

/// Events emitted by the harness during a run.
#[derive(Debug)]
pub enum HarnessEvent<'a> {
    /// A new round is starting.
    RoundStart {
        trace_id: &'a str,
        round: u32,
        max_rounds: u32,
        files_so_far: usize,
    },
    /// The model returned text (may be alongside tool calls).
    Text(&'a str),
    /// The model requested tool calls this round.
    ToolCallsReceived { round: u32, count: usize },
    /// One tool call finished.
    ToolResult {
        name: &'a str,
        call_id: &'a str,
        result: &'a str,
        is_error: bool,
    },
    /// A file was committed to the accumulator.
    FileWritten { path: &'a str, bytes: usize },
    /// Token usage reported by the API for this round.
    TokenUsage {
        prompt_tokens: u32,
        completion_tokens: u32,
    },
    /// The model stopped calling tools.
    Finished { rounds_used: u32 },
    /// The turn budget ran out while the model was still calling tools.
    RoundLimitReached { max_rounds: u32 },
}

/// Observer for [`HarnessEvent`]s.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &HarnessEvent<'_>) {
        let _ = event;
    }
}

/// Ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// Dispatches each event to every inner handler, in registration order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with(progress_reporter);
/// ```
#[derive(Default)]
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &HarnessEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Logs events via `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &HarnessEvent<'_>) {
        match event {
            HarnessEvent::RoundStart {
                trace_id,
                round,
                max_rounds,
                files_so_far,
            } => {
                info!("[{trace_id}] round {round}/{max_rounds} ({files_so_far} file(s) so far)");
            }
            HarnessEvent::Text(text) => {
                let preview: String = text.chars().take(200).collect();
                debug!(
                    "LLM text: {preview}{}",
                    if text.chars().count() > 200 { "..." } else { "" }
                );
            }
            HarnessEvent::ToolCallsReceived { round, count } => {
                debug!("{count} tool call(s) in round {round}");
            }
            HarnessEvent::ToolResult {
                name,
                call_id,
                result,
                is_error,
            } => {
                if *is_error {
                    warn!("Tool {name} ({call_id}) failed: {result}");
                } else {
                    debug!("Tool {name} ({call_id}): {result}");
                }
            }
            HarnessEvent::FileWritten { path, bytes } => {
                debug!("Wrote {path} ({bytes} bytes)");
            }
            HarnessEvent::TokenUsage {
                prompt_tokens,
                completion_tokens,
            } => {
                debug!("Tokens: prompt={prompt_tokens}, completion={completion_tokens}");
            }
            HarnessEvent::Finished { rounds_used } => {
                info!("Generation finished after {rounds_used} round(s)");
            }
            HarnessEvent::RoundLimitReached { max_rounds } => {
                info!("Generation hit round limit ({max_rounds})");
            }
        }
    }
}

/// The result of a complete [`Harness::run()`](super::harness::Harness::run).
#[derive(Debug)]
pub struct HarnessResult {
    /// Unique trace id for this run.
    pub trace_id: String,
    /// Every file written during the run, merged over the prior files.
    pub files: FileSet,
    /// The full conversation, excluding the system prompt.
    pub turns: Vec<ConversationTurn>,
    /// Text the model produced alongside its tool calls.
    pub text_output: Vec<String>,
    pub rounds_used: u32,
    /// Whether the model stopped on its own (vs. hitting the round limit).
    pub finished: bool,
    pub usage: CostTracker,
}

impl HarnessResult {
    /// Concatenated text output from all rounds.
    pub fn text(&self) -> String {
        self.text_output.join("\n\n")
    }
}
