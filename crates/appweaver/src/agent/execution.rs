//! Per-round mechanics for [`Harness::run()`](super::harness::Harness::run):
//! sending the request with retry, and executing the returned tool calls.

use super::config::HarnessConfig;
use super::events::{EventHandler, HarnessEvent};
use crate::api::retry::retry_api_call;
use crate::conversation::{ToolInvocation, ToolResult};
use crate::tools::core::ToolSet;
use crate::{ApiError, ChatBackend, ChatCompletion, ChatRequest, FileSet, Message, ToolDef};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Build the chat request for one round and send it, retrying transient
/// failures per `config.retry`.
pub(crate) async fn send_round_request(
    config: &HarnessConfig,
    client: &dyn ChatBackend,
    messages: Vec<Message>,
    tools: &[ToolDef],
) -> Result<ChatCompletion, ApiError> {
    let body = ChatRequest {
        model: Some(config.model.clone()),
        messages,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        tools: if tools.is_empty() {
            None
        } else {
            Some(tools.to_vec())
        },
    };
    trace!("Sending {} message(s)", body.messages.len());
    retry_api_call(&config.retry, || client.chat(&body)).await
}

/// Give every invocation a non-empty id that is unique within the turn, so
/// each one can be answered by exactly one result.
pub(crate) fn ensure_unique_ids(invocations: &mut [ToolInvocation], round: u32) {
    let mut seen = HashSet::new();
    for (i, inv) in invocations.iter_mut().enumerate() {
        if inv.id.is_empty() || !seen.insert(inv.id.clone()) {
            let replacement = format!("call_r{round}_{i}");
            debug!("Reassigning tool call id {:?} -> {replacement}", inv.id);
            inv.id = replacement;
            seen.insert(inv.id.clone());
        }
    }
}

/// Execute a turn's invocations in order against `files`, producing exactly
/// one result per invocation.
///
/// Sequential: two writes to the same path in one turn land in the order
/// the model emitted them.
pub(crate) async fn execute_tool_calls(
    tools: &ToolSet,
    invocations: &[ToolInvocation],
    files: &mut FileSet,
    event_handler: &dyn EventHandler,
) -> Vec<ToolResult> {
    let mut results = Vec::with_capacity(invocations.len());
    for inv in invocations {
        let output = tools.execute(&inv.name, &inv.arguments, files).await;
        event_handler.on_event(&HarnessEvent::ToolResult {
            name: &inv.name,
            call_id: &inv.id,
            result: &output.content,
            is_error: output.is_error,
        });
        if let Some(path) = &output.written {
            event_handler.on_event(&HarnessEvent::FileWritten {
                path,
                bytes: files.get(path).map(str::len).unwrap_or(0),
            });
        }
        results.push(if output.is_error {
            ToolResult::error(&inv.id, output.content)
        } else {
            ToolResult::success(&inv.id, output.content)
        });
    }
    results
}
