//! The agentic tool-use loop that turns a prompt into files.
//!
//! The [`Harness`] sends the conversation plus tool definitions to the model,
//! executes any returned tool calls against a [`FileSet`] accumulator,
//! appends one combined result turn, and repeats until the model replies
//! without tool calls or the turn budget runs out. Callers observe the loop
//! via [`EventHandler`] events.

use super::config::HarnessConfig;
use super::events::{EventHandler, HarnessEvent, HarnessResult, NoopHandler};
use super::execution::{ensure_unique_ids, execute_tool_calls, send_round_request};
use crate::api::tracing::{CostTracker, generate_trace_id, pricing_for_model};
use crate::conversation::{ContentBlock, Conversation, ConversationTurn, ToolInvocation};
use crate::tools::core::ToolSet;
use crate::{ChatBackend, FileSet, GenerationError};
use tracing::{debug, info};

/// The generation loop.
///
/// ```ignore
/// let client = OpenRouterClient::new(api_key)?;
/// let tools = ToolSet::new().with(WriteFile);
/// let handler = LoggingHandler;
///
/// let result = Harness::new(&client, &tools, HarnessConfig::default())
///     .with_event_handler(&handler)
///     .run(&create_prompt(), vec![ContentBlock::Text("a countdown timer".into())], FileSet::new())
///     .await?;
///
/// for (path, content) in result.files.iter() {
///     println!("{path}: {} bytes", content.len());
/// }
/// ```
///
/// `Harness<'a>` borrows the client, tools and event handler; bind them to
/// `let`s before building the harness so they outlive `.run()`.
pub struct Harness<'a> {
    client: &'a dyn ChatBackend,
    tools: &'a ToolSet,
    config: HarnessConfig,
    event_handler: &'a dyn EventHandler,
}

impl<'a> Harness<'a> {
    pub fn new(client: &'a dyn ChatBackend, tools: &'a ToolSet, config: HarnessConfig) -> Self {
        Self {
            client,
            tools,
            config,
            event_handler: &NoopHandler,
        }
    }

    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.event_handler = handler;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run the loop.
    ///
    /// `prior_files` seeds the accumulator; the model's writes are merged
    /// over it. Hitting the turn budget is not an error: the files written so
    /// far are returned. Fails with [`GenerationError::NoFiles`] if the
    /// accumulator is empty at the end, and with
    /// [`GenerationError::Upstream`] if a model call fails for good.
    pub async fn run(
        self,
        system_prompt: &str,
        initial_content: Vec<ContentBlock>,
        prior_files: FileSet,
    ) -> Result<HarnessResult, GenerationError> {
        let trace_id = generate_trace_id();
        let max_rounds = self.config.max_rounds;
        let pricing = pricing_for_model(&self.config.model);
        let definitions = self.tools.definitions();

        let mut conversation = Conversation::new(system_prompt);
        conversation.push(ConversationTurn::User(initial_content));
        let mut files = prior_files;
        let mut usage = CostTracker::new();
        let mut text_output = Vec::new();
        let mut rounds_used = 0;
        let mut finished = false;

        info!(
            "[{trace_id}] generation started: model={}, max_rounds={max_rounds}, prior_files={}",
            self.config.model,
            files.len()
        );

        for round in 1..=max_rounds {
            rounds_used = round;
            self.event_handler.on_event(&HarnessEvent::RoundStart {
                trace_id: &trace_id,
                round,
                max_rounds,
                files_so_far: files.len(),
            });

            debug_assert!(conversation.unanswered_invocations().is_empty());
            let completion = send_round_request(
                &self.config,
                self.client,
                conversation.to_messages(),
                &definitions,
            )
            .await?;

            if let Some(u) = &completion.usage {
                usage.record_usage(u, &pricing);
                self.event_handler.on_event(&HarnessEvent::TokenUsage {
                    prompt_tokens: u.prompt_tokens.unwrap_or(0),
                    completion_tokens: u.completion_tokens.unwrap_or(0),
                });
            }

            let text = completion.content.filter(|t| !t.trim().is_empty());
            if let Some(t) = &text {
                self.event_handler.on_event(&HarnessEvent::Text(t));
                text_output.push(t.clone());
            }

            let mut invocations: Vec<ToolInvocation> =
                completion.tool_calls.iter().map(ToolInvocation::from).collect();
            ensure_unique_ids(&mut invocations, round);

            if invocations.is_empty() {
                conversation.push(ConversationTurn::Assistant {
                    text,
                    invocations,
                });
                finished = true;
                self.event_handler
                    .on_event(&HarnessEvent::Finished { rounds_used: round });
                break;
            }

            self.event_handler.on_event(&HarnessEvent::ToolCallsReceived {
                round,
                count: invocations.len(),
            });
            let results =
                execute_tool_calls(self.tools, &invocations, &mut files, self.event_handler).await;
            conversation.push(ConversationTurn::Assistant {
                text,
                invocations,
            });
            conversation.push(ConversationTurn::ToolResults(results));
        }

        if !finished {
            self.event_handler
                .on_event(&HarnessEvent::RoundLimitReached { max_rounds });
        }

        debug!("[{trace_id}] {}", usage.summary());

        if files.is_empty() {
            info!("[{trace_id}] generation produced no files after {rounds_used} round(s)");
            return Err(GenerationError::NoFiles);
        }

        info!(
            "[{trace_id}] generation complete: {} file(s), {} bytes, {rounds_used} round(s)",
            files.len(),
            files.total_bytes()
        );

        Ok(HarnessResult {
            trace_id,
            files,
            turns: conversation.into_turns(),
            text_output,
            rounds_used,
            finished,
            usage,
        })
    }
}
