//! Prompt-to-web-app generation engine.
//!
//! `appweaver` turns a natural-language prompt (plus optional image
//! attachments) into a small, self-contained web application by driving an
//! LLM through the [OpenRouter](https://openrouter.ai/) chat completions API.
//! The core abstraction is the [`Harness`](agent::harness::Harness): an
//! agentic loop that sends the conversation to the model, executes the
//! `write_file` tool calls it returns into an in-memory [`FileSet`], feeds the
//! results back, and repeats until the model stops calling tools or the turn
//! budget runs out.
//!
//! # Getting started
//!
//! ```ignore
//! use appweaver::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenRouterClient::new(std::env::var("OPENROUTER_KEY")?)?;
//!     let generator = LlmGenerator::new(Arc::new(client), GenerationConfig::default());
//!
//!     let output = generator
//!         .generate(GenerationRequest::create("a countdown timer"))
//!         .await?;
//!
//!     for file in output.files.to_generated() {
//!         println!("{} ({} bytes)", file.path, file.content.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **The tool-use loop:** [`agent::harness::Harness`], configured by
//!   [`agent::config::HarnessConfig`] and observed through
//!   [`agent::events::EventHandler`].
//! - **Conversation model:** [`conversation`] holds the closed
//!   [`ContentBlock`](conversation::ContentBlock) /
//!   [`ConversationTurn`](conversation::ConversationTurn) unions and their
//!   conversion to wire [`Message`]s.
//! - **Images:** [`vision::normalize`] shrinks oversized images,
//!   [`vision::content`] assembles the multi-part user message.
//! - **Tools:** [`tools::write_file::WriteFile`] is the only tool the model
//!   sees; [`tools::core::ToolSet`] dispatches by name.
//! - **Generators:** [`generator::LlmGenerator`] and
//!   [`generator::TemplateGenerator`] behind the [`generator::Generator`]
//!   trait.
//! - **Projects:** [`project`] holds the persisted record, the
//!   [`ProjectRepository`](project::ProjectRepository) trait with its
//!   flat-file implementation, and reconciliation of generation results.
//! - **Transport:** [`OpenRouterClient`] implements [`ChatBackend`]; retry,
//!   trace ids and cost estimation live in [`api`].
//! - **Binaries:** [`setup`] holds the flags, logging and generator selection
//!   shared by the `appweaver` CLI and the `appweaver-web` server.

pub mod agent;
pub mod api;
pub mod conversation;
pub mod error;
pub mod files;
pub mod generator;
pub mod prelude;
pub mod project;
pub mod setup;
pub mod tools;
pub mod vision;

#[cfg(test)]
mod testing;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub use error::{ApiError, GenerationError, ImageError, RepositoryError};
pub use files::{FileSet, GeneratedFile};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for generation calls.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// Default per-request timeout for LLM calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Bridges typed tool parameter structs and the
/// `serde_json::Value` the function-calling API expects.
///
/// ```
/// use appweaver::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct RenameArgs {
///     from: String,
///     to: String,
/// }
///
/// let schema = json_schema_for::<RenameArgs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"from".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted from
/// serialization.
#[derive(Serialize, Debug, Default, Clone)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Message content: plain text, or a list of typed parts for multimodal
/// user messages.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text of the content; for multi-part content, the text parts joined
    /// by blank lines.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// One part of a multimodal message (OpenAI content-part format).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrlData },
}

/// Image reference: an `https://` URL or a `data:` URL with inline base64.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageUrlData {
    pub url: String,
}

/// A message in the wire conversation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(MessageContent::Parts(parts)),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant message carrying optional text and tool calls. An empty
    /// call list is serialized as no `tool_calls` field at all.
    pub fn assistant(content: Option<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.map(MessageContent::Text),
            tool_calls: if calls.is_empty() { None } else { Some(calls) },
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Text content of this message, if any.
    pub fn text(&self) -> Option<String> {
        self.content.as_ref().map(MessageContent::as_text)
    }
}

// ── Tool types ─────────────────────────────────────────────────────

/// The type of a tool definition. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// Tool definition sent to the API (OpenAI function-calling format).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    /// Create a function-calling tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The type of a tool call. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CallType {
    #[serde(rename = "function")]
    Function,
}

/// A tool call returned by the model.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub function: FunctionCallData,
}

impl ToolCall {
    /// Build a function call with raw JSON arguments.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: CallType::Function,
            function: FunctionCallData {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`ChatBackend::chat`].
#[derive(Debug, Clone, Default)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<UsageInfo>,
    /// `"length"` means the model hit `max_tokens`; tool arguments in the
    /// same response are likely truncated.
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Backend seam ───────────────────────────────────────────────────

/// Boxed future returned by [`ChatBackend::chat`].
pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<ChatCompletion, ApiError>> + Send + 'a>>;

/// Anything that can answer a chat completion request.
///
/// [`OpenRouterClient`] is the production implementation. Tests plug in
/// scripted backends that replay canned completions, which is how the loop's
/// behavior is exercised without network access.
pub trait ChatBackend: Send + Sync {
    fn chat<'a>(&'a self, body: &'a ChatRequest) -> ChatFuture<'a>;
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) referer: String,
    pub(crate) title: String,
    pub(crate) timeout: Duration,
}

impl OpenRouterClient {
    /// Create a new client with the given API key, default headers, and the
    /// default request timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_options(
            api_key,
            "https://github.com/appweaver/appweaver",
            "appweaver",
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Create a new client with custom Referer/X-Title headers and timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent("appweaver/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
            timeout,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Transport(e.to_string())
        }
    }

    /// Send a chat completion request.
    pub async fn send_chat(&self, body: &ChatRequest) -> Result<ChatCompletion, ApiError> {
        let tool_count = body.tools.as_ref().map_or(0, |t| t.len());
        debug!(
            "LLM request: model={}, messages={}, tools={}, max_tokens={}",
            body.model.as_deref().unwrap_or("(none)"),
            body.messages.len(),
            tool_count,
            body.max_tokens,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.map_send_error(e))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_chat_response(&text)
    }
}

impl ChatBackend for OpenRouterClient {
    fn chat<'a>(&'a self, body: &'a ChatRequest) -> ChatFuture<'a> {
        Box::pin(self.send_chat(body))
    }
}

/// Decode a raw chat completions body into a [`ChatCompletion`].
fn parse_chat_response(text: &str) -> Result<ChatCompletion, ApiError> {
    let parsed: RawChatResponse =
        serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))?;

    if let Some(err) = parsed.error {
        return Err(ApiError::Provider(err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    match parsed.choices.and_then(|c| c.into_iter().next()) {
        Some(c) => {
            let tool_calls = c.message.tool_calls.unwrap_or_default();
            debug!(
                "LLM output: {} chars text, {} tool call(s), finish_reason={}",
                c.message.content.as_ref().map_or(0, |s| s.len()),
                tool_calls.len(),
                c.finish_reason.as_deref().unwrap_or("-"),
            );
            Ok(ChatCompletion {
                content: c.message.content,
                tool_calls,
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            })
        }
        None => {
            debug!("LLM output: empty (no choices)");
            Ok(ChatCompletion {
                usage: parsed.usage,
                ..Default::default()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let sys = Message::system("hello");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.text().as_deref(), Some("hello"));

        let assist = Message::assistant(Some("done".into()), vec![]);
        assert_eq!(assist.role, MessageRole::Assistant);
        assert!(assist.tool_calls.is_none());

        let tool = Message::tool_result("call-1", "ok");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn chat_request_default_skips_none_fields() {
        let req = ChatRequest {
            model: Some("test-model".into()),
            messages: vec![Message::user("hi")],
            max_tokens: 100,
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 100);
    }

    #[test]
    fn multipart_user_message_serializes_as_content_array() {
        let msg = Message::user_parts(vec![
            ContentPart::Text {
                text: "make it blue".into(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrlData {
                    url: "https://cdn.example.com/a.png".into(),
                },
            },
        ]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(
            json["content"][1]["image_url"]["url"],
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn plain_text_content_serializes_as_string() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn parse_response_with_tool_calls() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "write_file", "arguments": "{\"path\":\"index.html\",\"content\":\"<html></html>\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let completion = parse_chat_response(body).unwrap();
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].function.name, "write_file");
        assert_eq!(completion.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(completion.usage.unwrap().total_tokens, Some(15));
    }

    #[test]
    fn parse_response_error_object() {
        let err = parse_chat_response(r#"{"error": {"message": "no credits"}}"#).unwrap_err();
        assert!(matches!(err, ApiError::Provider(ref m) if m == "no credits"));
    }

    #[test]
    fn parse_response_garbage_is_decode_error() {
        let err = parse_chat_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn parse_response_without_choices_is_empty() {
        let completion = parse_chat_response(r#"{"choices": []}"#).unwrap();
        assert!(completion.content.is_none());
        assert!(completion.tool_calls.is_empty());
    }
}
