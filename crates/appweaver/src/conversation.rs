//! Typed conversation model for one generation request.
//!
//! The loop never inspects JSON shapes: user content is a list of
//! [`ContentBlock`]s, and the conversation is a list of
//! [`ConversationTurn`]s that the loop pattern-matches exhaustively. Only at
//! the transport boundary does [`Conversation::to_messages`] flatten turns
//! into OpenAI-format wire [`Message`]s.

use crate::{ContentPart, ImageUrlData, Message, ToolCall};

/// Where an image block's pixels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Publicly reachable URL; the model fetches it itself.
    Url(String),
    /// Inline base64 payload with its media type (`image/png`, ...).
    Base64 { media_type: String, data: String },
}

impl ImageSource {
    /// The URL form sent on the wire (`data:` URL for inline payloads).
    pub fn to_url(&self) -> String {
        match self {
            ImageSource::Url(url) => url.clone(),
            ImageSource::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        }
    }
}

/// One block of user content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    Image(ImageSource),
}

impl ContentBlock {
    fn to_part(&self) -> ContentPart {
        match self {
            ContentBlock::Text(text) => ContentPart::Text { text: text.clone() },
            ContentBlock::Image(source) => ContentPart::ImageUrl {
                image_url: ImageUrlData {
                    url: source.to_url(),
                },
            },
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Opaque id correlating the invocation with its result.
    pub id: String,
    pub name: String,
    /// Raw JSON arguments exactly as the model produced them.
    pub arguments: String,
}

impl From<&ToolCall> for ToolInvocation {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
        }
    }
}

impl ToolInvocation {
    fn to_call(&self) -> ToolCall {
        ToolCall::function(&self.id, &self.name, &self.arguments)
    }
}

/// The caller's reply to one [`ToolInvocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub invocation_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(invocation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(invocation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Wire text. Errors carry an `Error: ` prefix since the chat format has
    /// no error flag on tool messages.
    fn wire_content(&self) -> String {
        if self.is_error && !self.content.starts_with("Error:") {
            format!("Error: {}", self.content)
        } else {
            self.content.clone()
        }
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationTurn {
    User(Vec<ContentBlock>),
    Assistant {
        text: Option<String>,
        invocations: Vec<ToolInvocation>,
    },
    /// All results for the preceding assistant turn, in invocation order.
    ToolResults(Vec<ToolResult>),
}

impl ConversationTurn {
    /// Wire messages for this turn. A tool-result turn expands to one `tool`
    /// message per result.
    pub fn to_messages(&self) -> Vec<Message> {
        match self {
            ConversationTurn::User(blocks) => match blocks.as_slice() {
                [ContentBlock::Text(text)] => vec![Message::user(text.clone())],
                _ => vec![Message::user_parts(
                    blocks.iter().map(ContentBlock::to_part).collect(),
                )],
            },
            ConversationTurn::Assistant { text, invocations } => vec![Message::assistant(
                text.clone(),
                invocations.iter().map(ToolInvocation::to_call).collect(),
            )],
            ConversationTurn::ToolResults(results) => results
                .iter()
                .map(|r| Message::tool_result(&r.invocation_id, r.wire_content()))
                .collect(),
        }
    }
}

/// System prompt plus the append-only list of turns.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    system_prompt: String,
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            turns: Vec::new(),
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn into_turns(self) -> Vec<ConversationTurn> {
        self.turns
    }

    /// Flatten into wire messages, system prompt first.
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = vec![Message::system(self.system_prompt.clone())];
        for turn in &self.turns {
            messages.extend(turn.to_messages());
        }
        messages
    }

    /// Ids of invocations that have no matching result in the turn that
    /// immediately follows them. Empty for a conversation that may be sent
    /// to the model.
    pub fn unanswered_invocations(&self) -> Vec<&str> {
        let mut missing = Vec::new();
        for (i, turn) in self.turns.iter().enumerate() {
            let ConversationTurn::Assistant { invocations, .. } = turn else {
                continue;
            };
            let results: &[ToolResult] = match self.turns.get(i + 1) {
                Some(ConversationTurn::ToolResults(r)) => r,
                _ => &[],
            };
            for inv in invocations {
                let answers = results.iter().filter(|r| r.invocation_id == inv.id).count();
                if answers != 1 {
                    missing.push(inv.id.as_str());
                }
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;

    fn invocation(id: &str) -> ToolInvocation {
        ToolInvocation {
            id: id.into(),
            name: "write_file".into(),
            arguments: "{}".into(),
        }
    }

    #[test]
    fn text_only_user_turn_is_plain_string() {
        let msgs = ConversationTurn::User(vec![ContentBlock::Text("hi".into())]).to_messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text().as_deref(), Some("hi"));
        assert!(matches!(msgs[0].content, Some(crate::MessageContent::Text(_))));
    }

    #[test]
    fn image_blocks_become_data_urls() {
        let turn = ConversationTurn::User(vec![
            ContentBlock::Text("copy this".into()),
            ContentBlock::Image(ImageSource::Base64 {
                media_type: "image/png".into(),
                data: "AAAA".into(),
            }),
        ]);
        let json = serde_json::to_value(&turn.to_messages()[0]).unwrap();
        assert_eq!(json["content"][1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn tool_results_expand_to_one_message_each() {
        let turn = ConversationTurn::ToolResults(vec![
            ToolResult::success("a", "Wrote index.html"),
            ToolResult::error("b", "missing content"),
        ]);
        let msgs = turn.to_messages();
        assert_eq!(msgs.len(), 2);
        assert!(msgs.iter().all(|m| m.role == MessageRole::Tool));
        assert_eq!(msgs[1].tool_call_id.as_deref(), Some("b"));
        assert_eq!(msgs[1].text().as_deref(), Some("Error: missing content"));
    }

    #[test]
    fn conversation_starts_with_system_prompt() {
        let mut convo = Conversation::new("be brief");
        convo.push(ConversationTurn::User(vec![ContentBlock::Text("x".into())]));
        let msgs = convo.to_messages();
        assert_eq!(msgs[0].role, MessageRole::System);
        assert_eq!(msgs.len(), 2);
    }

    #[test]
    fn unanswered_invocations_detected() {
        let mut convo = Conversation::new("sys");
        convo.push(ConversationTurn::Assistant {
            text: None,
            invocations: vec![invocation("a"), invocation("b")],
        });
        convo.push(ConversationTurn::ToolResults(vec![ToolResult::success("a", "ok")]));
        assert_eq!(convo.unanswered_invocations(), vec!["b"]);

        let mut complete = Conversation::new("sys");
        complete.push(ConversationTurn::Assistant {
            text: None,
            invocations: vec![invocation("a")],
        });
        complete.push(ConversationTurn::ToolResults(vec![ToolResult::error("a", "bad")]));
        assert!(complete.unanswered_invocations().is_empty());
    }
}
