//! Core types for LLM interaction.
//!
//! These types are provider-agnostic: every adapter translates to and from
//! them, and the orchestrator only ever sees them.  The serde representation
//! mirrors the unified protocol (`type`-tagged content, camelCase fields).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The role of a participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions and orchestrator notices.
    System,
    /// Input from the human user.
    User,
    /// Output from the LLM.
    Assistant,
    /// Result of a tool invocation, fed back to the model.
    Tool,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }

    /// Parse a wire role name.  Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item of message content.  Exactly one variant is active; there is no
/// implicit conversion between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnifiedContent {
    /// Plain text.
    Text { text: String },

    /// Base64-encoded image data.
    #[serde(rename_all = "camelCase")]
    Image { data: String, media_type: String },

    /// A tool invocation requested by the assistant.
    ToolUse {
        id: String,
        name: String,
        input: Map<String, Value>,
    },

    /// The output of a tool, answering the `tool_use` with `tool_use_id`.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_use_id: String,
        content: Vec<ToolResultPart>,
    },
}

impl UnifiedContent {
    /// Create a text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image item.
    pub fn image(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::Image {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    /// Return the text if this is a text item.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A segment of tool output: text or image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResultPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        data: String,
        media_type: String,
    },
}

impl ToolResultPart {
    /// Return the text if this is a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Image { .. } => None,
        }
    }
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedMessage {
    /// Who produced this message.
    pub role: Role,

    /// Ordered content; order reflects generation order within the turn.
    #[serde(default)]
    pub content: Vec<UnifiedContent>,

    /// Flattened view of the `tool_use` items of a finalized assistant
    /// message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<UnifiedToolCall>>,
}

impl UnifiedMessage {
    /// Create a message with arbitrary content.
    pub fn new(role: Role, content: Vec<UnifiedContent>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![UnifiedContent::text(text)])
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![UnifiedContent::text(text)])
    }

    /// Create an assistant text message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![UnifiedContent::text(text)])
    }

    /// Create a tool result message answering `tool_use_id`.
    ///
    /// The role depends on the provider: OpenAI-style APIs use
    /// [`Role::Tool`], Anthropic-style APIs expect [`Role::User`].
    pub fn tool_result(
        role: Role,
        tool_use_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            role,
            vec![UnifiedContent::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: vec![ToolResultPart::Text { text: text.into() }],
            }],
        )
    }

    /// Concatenate all text items with `separator`.
    pub fn joined_text(&self, separator: &str) -> String {
        self.content
            .iter()
            .filter_map(UnifiedContent::as_text)
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// All tool invocations carried by this message, in order: `tool_use`
    /// content items first, then any `tool_calls` entries whose id is not
    /// already present as a content item.
    pub fn tool_invocations(&self) -> Vec<UnifiedToolCall> {
        let mut calls: Vec<UnifiedToolCall> = self
            .content
            .iter()
            .filter_map(|c| match c {
                UnifiedContent::ToolUse { id, name, input } => Some(UnifiedToolCall {
                    call_id: id.clone(),
                    tool_name: name.clone(),
                    parameters: input.clone(),
                }),
                _ => None,
            })
            .collect();

        for tc in self.tool_calls.iter().flatten() {
            if !calls.iter().any(|c| c.call_id == tc.call_id) {
                calls.push(tc.clone());
            }
        }

        calls
    }
}

// ---------------------------------------------------------------------------
// Tool calls
// ---------------------------------------------------------------------------

/// A tool invocation requested by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedToolCall {
    /// Provider-assigned identifier, unique within one assistant turn.
    pub call_id: String,

    /// The name of the tool to invoke.
    pub tool_name: String,

    /// Arguments; an empty object until they have finished streaming.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl UnifiedToolCall {
    /// Create a tool call with empty parameters.
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            parameters: Map::new(),
        }
    }

    /// The equivalent `tool_use` content item.
    pub fn to_content(&self) -> UnifiedContent {
        UnifiedContent::ToolUse {
            id: self.call_id.clone(),
            name: self.tool_name.clone(),
            input: self.parameters.clone(),
        }
    }
}

/// A tool definition exposed to the LLM so it knows what tools are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,

    /// Human-readable description of what the tool does.
    pub description: String,

    /// JSON Schema describing the tool's input parameters.
    pub input_schema: Value,
}

// ---------------------------------------------------------------------------
// Provider payloads
// ---------------------------------------------------------------------------

/// The provider-shaped projection of a conversation history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderPayload {
    /// Top-level system prompt (Anthropic-style providers only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Provider-format messages.
    pub messages: Vec<Value>,
}

/// Everything the transport needs to open one provider stream.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Serialized history.
    pub payload: ProviderPayload,

    /// Tools the model may invoke.
    pub tools: Vec<ToolDefinition>,
}

/// The result of finalizing one streamed assistant turn.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedTurn {
    /// The fully assembled message.
    pub completed_message: UnifiedMessage,

    /// Flattened tool-call view, identical to
    /// `completed_message.tool_calls`.
    pub tool_calls: Vec<UnifiedToolCall>,
}

// ---------------------------------------------------------------------------
// Streaming events
// ---------------------------------------------------------------------------

/// Kind of content block announced by [`StreamEvent::ContentStart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    ToolUse,
}

/// Outcome of one tool execution, as reported by
/// [`StreamEvent::ToolCallComplete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Result(Value),
    Error(String),
}

/// Provider-independent streaming event.
///
/// Serializes as `{"type": ..., "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The provider has started a message.
    MessageStart { id: String },

    /// A content block has opened at `index`.
    #[serde(rename_all = "camelCase")]
    ContentStart {
        index: u64,
        content_type: ContentKind,
    },

    /// One UTF-8 text fragment.
    TextDelta { text: String },

    /// A tool call has been announced.
    #[serde(rename_all = "camelCase")]
    ToolCallStart { call_id: String, tool_name: String },

    /// The best-known complete parameters of a tool call so far.
    #[serde(rename_all = "camelCase")]
    ToolCallDelta {
        call_id: String,
        parameters: Map<String, Value>,
    },

    /// A tool call has been executed by the orchestrator.
    #[serde(rename_all = "camelCase")]
    ToolCallComplete {
        call_id: String,
        #[serde(flatten)]
        outcome: ToolOutcome,
    },

    /// A content block has closed.
    ContentEnd { index: u64 },

    /// Unrecoverable stream failure.  Normal completion is signalled by the
    /// event sequence ending.
    MessageComplete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl StreamEvent {
    /// Build a text delta event.
    pub fn text_delta(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    /// Build a failure event carrying `reason`.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::MessageComplete {
            error: Some(reason.into()),
        }
    }

    /// The error text if this is a failed `message_complete`.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::MessageComplete { error } => error.as_deref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
