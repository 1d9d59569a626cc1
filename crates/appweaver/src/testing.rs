//! Scripted [`ChatBackend`] for loop and generator tests.

use crate::{ApiError, ChatBackend, ChatCompletion, ChatFuture, ChatRequest, ToolCall, UsageInfo};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned completions in order and records every request. Once the
/// script runs out it answers with a text-only completion.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    script: Mutex<VecDeque<Result<ChatCompletion, ApiError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub(crate) fn new(script: Vec<Result<ChatCompletion, ApiError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replies(replies: Vec<ChatCompletion>) -> Self {
        Self::new(replies.into_iter().map(Ok).collect())
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ChatBackend for ScriptedBackend {
    fn chat<'a>(&'a self, body: &'a ChatRequest) -> ChatFuture<'a> {
        self.requests.lock().unwrap().push(body.clone());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text_reply("done")));
        Box::pin(async move { next })
    }
}

pub(crate) fn text_reply(text: &str) -> ChatCompletion {
    ChatCompletion {
        content: Some(text.to_string()),
        finish_reason: Some("stop".into()),
        ..Default::default()
    }
}

pub(crate) fn write_call(id: &str, path: &str, content: &str) -> ToolCall {
    let args = serde_json::json!({ "path": path, "content": content }).to_string();
    ToolCall::function(id, "write_file", args)
}

pub(crate) fn tool_reply(calls: Vec<ToolCall>) -> ChatCompletion {
    ChatCompletion {
        tool_calls: calls,
        usage: Some(UsageInfo {
            prompt_tokens: Some(100),
            completion_tokens: Some(50),
            total_tokens: Some(150),
        }),
        finish_reason: Some("tool_calls".into()),
        ..Default::default()
    }
}
