//! OpenAI Chat Completions adapter.
//!
//! The OpenAI format keeps system messages inline, flattens text content into
//! one string, carries tool calls under `assistant.tool_calls` with
//! JSON-stringified arguments, and answers them with `role: "tool"` messages.
//! Streams are bare `data:` lines with `choices[0].delta` payloads.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::error::{AgentError, Result};
use crate::llm::adapter::{ArgumentBuffer, Assembly, BlockState, ProviderAdapter, StreamProcessor};
use crate::llm::sse::Frame;
use crate::llm::types::{
    FinalizedTurn, ProviderPayload, Role, StreamEvent, ToolResultPart, UnifiedContent,
    UnifiedMessage, UnifiedToolCall,
};

/// Adapter for OpenAI-compatible chat completion APIs (OpenAI, DeepSeek,
/// Ollama, vLLM, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiAdapter;

impl ProviderAdapter for OpenAiAdapter {
    fn to_provider_format(&self, history: &[UnifiedMessage]) -> ProviderPayload {
        ProviderPayload {
            system: None,
            messages: messages_to_openai(history),
        }
    }

    fn from_provider_format(&self, response: &Value) -> Result<UnifiedMessage> {
        parse_openai_message(response)
    }

    fn create_stream_processor(&self) -> Box<dyn StreamProcessor> {
        Box::new(OpenAiStreamProcessor::new())
    }
}

// ---------------------------------------------------------------------------
// Request projection
// ---------------------------------------------------------------------------

/// Convert unified messages to the OpenAI Chat Completions wire format.
pub fn messages_to_openai(messages: &[UnifiedMessage]) -> Vec<Value> {
    let mut wire_messages: Vec<Value> = Vec::with_capacity(messages.len());

    for msg in messages {
        let mut answered = false;
        for item in &msg.content {
            if let UnifiedContent::ToolResult {
                tool_use_id,
                content,
            } = item
            {
                answered = true;
                wire_messages.push(json!({
                    "role": "tool",
                    "tool_call_id": tool_use_id,
                    "content": result_text(content),
                }));
            }
        }

        let text = msg.joined_text("\n");
        if answered && text.is_empty() {
            continue;
        }

        let mut m = json!({
            "role": msg.role.as_str(),
            "content": text,
        });

        let calls = msg.tool_invocations();
        if !calls.is_empty() {
            let tool_calls: Vec<Value> = calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.call_id,
                        "type": "function",
                        "function": {
                            "name": tc.tool_name,
                            "arguments": Value::Object(tc.parameters.clone()).to_string(),
                        }
                    })
                })
                .collect();
            m["tool_calls"] = json!(tool_calls);
        }

        wire_messages.push(m);
    }

    wire_messages
}

/// Text segments of a tool result, newline-joined.
fn result_text(parts: &[ToolResultPart]) -> String {
    parts
        .iter()
        .filter_map(ToolResultPart::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse a non-streaming OpenAI response.
///
/// Accepts either the full completion object (`choices[0].message` is used)
/// or a bare message object.
pub fn parse_openai_message(v: &Value) -> Result<UnifiedMessage> {
    let message = if v.get("choices").is_some() {
        &v["choices"][0]["message"]
    } else {
        v
    };

    if !message.is_object() {
        return Err(AgentError::LlmParseFailed {
            reason: "missing `choices[0].message` in response".into(),
        });
    }

    let role = message["role"]
        .as_str()
        .and_then(Role::parse)
        .unwrap_or(Role::Assistant);

    if role == Role::Tool {
        let tool_call_id = message["tool_call_id"].as_str().unwrap_or_default();
        let text = message["content"].as_str().unwrap_or_default();
        return Ok(UnifiedMessage::tool_result(Role::Tool, tool_call_id, text));
    }

    let mut content: Vec<UnifiedContent> = Vec::new();
    match &message["content"] {
        Value::String(text) if !text.is_empty() => content.push(UnifiedContent::text(text)),
        Value::Array(parts) => {
            for part in parts {
                if let Some(text) = part["text"].as_str() {
                    content.push(UnifiedContent::text(text));
                }
            }
        }
        _ => {}
    }

    let mut tool_calls: Vec<UnifiedToolCall> = Vec::new();
    for tc in message["tool_calls"].as_array().into_iter().flatten() {
        let function = &tc["function"];
        let name = function["name"].as_str().unwrap_or_default().to_owned();
        let args_str = function["arguments"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("{}");
        let parameters = match serde_json::from_str::<Value>(args_str) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(AgentError::LlmParseFailed {
                    reason: format!("tool call `{name}` arguments are not an object: {other}"),
                });
            }
            Err(e) => {
                return Err(AgentError::LlmParseFailed {
                    reason: format!("invalid JSON in OpenAI tool call `{name}` arguments: {e}"),
                });
            }
        };

        tool_calls.push(UnifiedToolCall {
            call_id: tc["id"].as_str().unwrap_or_default().to_owned(),
            tool_name: name,
            parameters,
        });
    }

    content.extend(tool_calls.iter().map(UnifiedToolCall::to_content));

    Ok(UnifiedMessage {
        role,
        content,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    })
}

// ---------------------------------------------------------------------------
// Stream processor
// ---------------------------------------------------------------------------

/// Assembles one streamed OpenAI assistant turn.
///
/// Text deltas are concatenated into the first text item.  A tool-call delta
/// carrying an `id` opens a new call; argument fragments without an id are
/// appended to the most recently opened call.
#[derive(Debug)]
pub struct OpenAiStreamProcessor {
    message: UnifiedMessage,
    tool_calls: Vec<UnifiedToolCall>,
    buffers: HashMap<String, ArgumentBuffer>,
    state: BlockState,
    started: bool,
}

impl Default for OpenAiStreamProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiStreamProcessor {
    /// Create a processor for a fresh assistant turn.
    pub fn new() -> Self {
        Self {
            message: UnifiedMessage::new(Role::Assistant, Vec::new()),
            tool_calls: Vec::new(),
            buffers: HashMap::new(),
            state: BlockState::Idle,
            started: false,
        }
    }

    /// Append a text fragment to the first text item, creating it if absent.
    fn append_text(&mut self, fragment: &str) {
        let position = match self.message.content.iter().position(|c| c.as_text().is_some()) {
            Some(position) => position,
            None => {
                self.message.content.insert(0, UnifiedContent::text(""));
                0
            }
        };

        if let Some(UnifiedContent::Text { text }) = self.message.content.get_mut(position) {
            text.push_str(fragment);
        }

        if self.state == BlockState::Idle {
            self.state = BlockState::InTextBlock { position };
        }
    }

    /// Handle one entry of `delta.tool_calls`.
    fn apply_tool_call_delta(&mut self, tc: &Value, events: &mut Vec<StreamEvent>) {
        let function = &tc["function"];

        if let Some(id) = tc["id"].as_str().filter(|id| !id.is_empty()) {
            if !self.tool_calls.iter().any(|c| c.call_id == id) {
                let name = function["name"].as_str().unwrap_or_default();
                self.tool_calls.push(UnifiedToolCall::new(id, name));
                self.buffers.insert(id.to_owned(), ArgumentBuffer::new());
                events.push(StreamEvent::ToolCallStart {
                    call_id: id.to_owned(),
                    tool_name: name.to_owned(),
                });
            }
            self.state = BlockState::InToolBlock {
                call_id: id.to_owned(),
            };
        }

        let Some(fragment) = function["arguments"].as_str().filter(|a| !a.is_empty()) else {
            return;
        };

        let Some(call_id) = self.state.current_call().map(str::to_owned) else {
            tracing::warn!(fragment, "tool call arguments arrived before any tool call id");
            return;
        };

        let buffer = self.buffers.entry(call_id.clone()).or_default();
        if let Assembly::Complete(parameters) = buffer.push(fragment) {
            if let Some(call) = self.tool_calls.iter_mut().find(|c| c.call_id == call_id) {
                call.parameters = parameters.clone();
            }
            events.push(StreamEvent::ToolCallDelta {
                call_id,
                parameters,
            });
        }
    }
}

impl StreamProcessor for OpenAiStreamProcessor {
    fn process_chunk(&mut self, frame: &Frame) -> Vec<StreamEvent> {
        let v = &frame.data;
        let mut events = Vec::new();

        if let Some(reason) = provider_error(v) {
            events.push(StreamEvent::failure(reason));
            return events;
        }

        if !self.started
            && let Some(id) = v["id"].as_str()
        {
            self.started = true;
            events.push(StreamEvent::MessageStart { id: id.to_owned() });
        }

        let delta = &v["choices"][0]["delta"];
        if !delta.is_object() {
            return events;
        }

        if let Some(role) = delta["role"].as_str().and_then(Role::parse) {
            self.message.role = role;
        }

        if let Some(text) = delta["content"].as_str().filter(|t| !t.is_empty()) {
            self.append_text(text);
            events.push(StreamEvent::text_delta(text));
        }

        if let Some(tool_calls) = delta["tool_calls"].as_array() {
            for tc in tool_calls {
                self.apply_tool_call_delta(tc, &mut events);
            }
        }

        events
    }

    fn finalize(self: Box<Self>) -> FinalizedTurn {
        let Self {
            mut message,
            mut tool_calls,
            buffers,
            ..
        } = *self;

        for call in &mut tool_calls {
            if let Some(buffer) = buffers.get(&call.call_id) {
                call.parameters = buffer.finish(&call.call_id);
            } else {
                call.parameters = Map::new();
            }
        }

        message
            .content
            .extend(tool_calls.iter().map(UnifiedToolCall::to_content));
        message.tool_calls = (!tool_calls.is_empty()).then(|| tool_calls.clone());

        FinalizedTurn {
            completed_message: message,
            tool_calls,
        }
    }
}

/// Extract the message of an in-stream `{"error": {...}}` payload.
fn provider_error(v: &Value) -> Option<String> {
    let error = v.get("error").filter(|e| !e.is_null())?;
    Some(
        error["message"]
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string()),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
