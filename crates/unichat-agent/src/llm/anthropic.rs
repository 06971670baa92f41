//! Anthropic Messages API adapter.
//!
//! Anthropic keeps content as ordered typed blocks, expects the system prompt
//! as a top-level field, and models tool results as `tool_result` blocks in a
//! user-authored message.  Streams are `event:` / `data:` pairs:
//! `message_start`, `content_block_start`, `content_block_delta`,
//! `content_block_stop`, `message_delta`, `message_stop`, `ping`, `error`.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::error::{AgentError, Result};
use crate::llm::adapter::{ArgumentBuffer, Assembly, BlockState, ProviderAdapter, StreamProcessor};
use crate::llm::sse::Frame;
use crate::llm::types::{
    ContentKind, FinalizedTurn, ProviderPayload, Role, StreamEvent, ToolResultPart,
    UnifiedContent, UnifiedMessage, UnifiedToolCall,
};

/// Adapter for the Anthropic Messages API.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicAdapter;

impl ProviderAdapter for AnthropicAdapter {
    fn to_provider_format(&self, history: &[UnifiedMessage]) -> ProviderPayload {
        let (system, messages) = messages_to_anthropic(history);
        ProviderPayload { system, messages }
    }

    fn from_provider_format(&self, response: &Value) -> Result<UnifiedMessage> {
        parse_anthropic_message(response)
    }

    fn create_stream_processor(&self) -> Box<dyn StreamProcessor> {
        Box::new(AnthropicStreamProcessor::new())
    }
}

// ---------------------------------------------------------------------------
// Request projection
// ---------------------------------------------------------------------------

/// Split system messages out (Anthropic expects them as a top-level field)
/// and convert the remaining messages to typed content blocks.
pub fn messages_to_anthropic(messages: &[UnifiedMessage]) -> (Option<String>, Vec<Value>) {
    let mut system: Option<String> = None;
    let mut wire_messages: Vec<Value> = Vec::with_capacity(messages.len());

    for msg in messages {
        if msg.role == Role::System {
            let text = msg.joined_text("\n");
            match &mut system {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(&text);
                }
                None => system = Some(text),
            }
            continue;
        }

        let mut blocks: Vec<Value> = msg.content.iter().filter_map(content_to_block).collect();

        // Tool calls that only exist in the side channel go last.
        for tc in msg.tool_calls.iter().flatten() {
            let present = msg.content.iter().any(
                |c| matches!(c, UnifiedContent::ToolUse { id, .. } if *id == tc.call_id),
            );
            if !present {
                blocks.push(json!({
                    "type": "tool_use",
                    "id": tc.call_id,
                    "name": tc.tool_name,
                    "input": tc.parameters,
                }));
            }
        }

        if blocks.is_empty() {
            tracing::debug!(role = %msg.role, "skipping message with no content blocks");
            continue;
        }

        let role = match msg.role {
            Role::Assistant => "assistant",
            _ => "user",
        };

        wire_messages.push(json!({
            "role": role,
            "content": blocks,
        }));
    }

    (system, wire_messages)
}

/// Convert one content item to an Anthropic block.  Empty text is dropped
/// because the API rejects empty text blocks.
fn content_to_block(content: &UnifiedContent) -> Option<Value> {
    match content {
        UnifiedContent::Text { text } if text.is_empty() => None,
        UnifiedContent::Text { text } => Some(json!({"type": "text", "text": text})),
        UnifiedContent::Image { data, media_type } => Some(image_block(data, media_type)),
        UnifiedContent::ToolUse { id, name, input } => Some(json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        })),
        UnifiedContent::ToolResult {
            tool_use_id,
            content,
        } => {
            let parts: Vec<Value> = content
                .iter()
                .map(|part| match part {
                    ToolResultPart::Text { text } => json!({"type": "text", "text": text}),
                    ToolResultPart::Image { data, media_type } => image_block(data, media_type),
                })
                .collect();
            Some(json!({
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": parts,
            }))
        }
    }
}

fn image_block(data: &str, media_type: &str) -> Value {
    json!({
        "type": "image",
        "source": {
            "type": "base64",
            "media_type": media_type,
            "data": data,
        }
    })
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse a non-streaming Anthropic Messages API response (or a wire message
/// produced by [`messages_to_anthropic`]).
pub fn parse_anthropic_message(v: &Value) -> Result<UnifiedMessage> {
    let role = v["role"]
        .as_str()
        .and_then(Role::parse)
        .unwrap_or(Role::Assistant);

    let blocks = match &v["content"] {
        Value::Array(blocks) => blocks.as_slice(),
        Value::String(text) => {
            return Ok(UnifiedMessage::new(role, vec![UnifiedContent::text(text)]));
        }
        _ => {
            return Err(AgentError::LlmParseFailed {
                reason: "missing `content` array in response".into(),
            });
        }
    };

    let mut content: Vec<UnifiedContent> = Vec::new();
    let mut tool_calls: Vec<UnifiedToolCall> = Vec::new();

    for block in blocks {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(t) = block["text"].as_str() {
                    content.push(UnifiedContent::text(t));
                }
            }
            Some("image") => {
                let source = &block["source"];
                content.push(UnifiedContent::image(
                    json_string(source, "data"),
                    json_string(source, "media_type"),
                ));
            }
            Some("tool_use") => {
                let call = UnifiedToolCall {
                    call_id: json_string(block, "id"),
                    tool_name: json_string(block, "name"),
                    parameters: block["input"].as_object().cloned().unwrap_or_default(),
                };
                content.push(call.to_content());
                tool_calls.push(call);
            }
            Some("tool_result") => {
                let parts = match &block["content"] {
                    Value::String(text) => vec![ToolResultPart::Text { text: text.clone() }],
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|item| match item["type"].as_str() {
                            Some("text") => Some(ToolResultPart::Text {
                                text: json_string(item, "text"),
                            }),
                            Some("image") => Some(ToolResultPart::Image {
                                data: json_string(&item["source"], "data"),
                                media_type: json_string(&item["source"], "media_type"),
                            }),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                content.push(UnifiedContent::ToolResult {
                    tool_use_id: json_string(block, "tool_use_id"),
                    content: parts,
                });
            }
            other => tracing::trace!(block_type = ?other, "ignoring unsupported content block"),
        }
    }

    Ok(UnifiedMessage {
        role,
        content,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    })
}

/// Extract a string field from a JSON value, returning an empty string if
/// missing.
fn json_string(v: &Value, field: &str) -> String {
    v[field].as_str().unwrap_or_default().to_owned()
}

// ---------------------------------------------------------------------------
// Stream processor
// ---------------------------------------------------------------------------

/// Assembles one streamed Anthropic assistant turn.
///
/// Only one content block is open at a time.  Tool-use input is accumulated
/// in a single buffer that is reset when its block stops, so consecutive
/// tool blocks never see each other's fragments.
#[derive(Debug)]
pub struct AnthropicStreamProcessor {
    message: UnifiedMessage,
    tool_calls: Vec<UnifiedToolCall>,
    /// Provider block index -> position in `message.content`.
    positions: HashMap<u64, usize>,
    state: BlockState,
    buffer: ArgumentBuffer,
}

impl Default for AnthropicStreamProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl AnthropicStreamProcessor {
    /// Create a processor for a fresh assistant turn.
    pub fn new() -> Self {
        Self {
            message: UnifiedMessage::new(Role::Assistant, Vec::new()),
            tool_calls: Vec::new(),
            positions: HashMap::new(),
            state: BlockState::Idle,
            buffer: ArgumentBuffer::new(),
        }
    }

    fn on_block_start(&mut self, data: &Value, events: &mut Vec<StreamEvent>) {
        let index = data["index"].as_u64().unwrap_or(0);
        let block = &data["content_block"];

        match block["type"].as_str() {
            Some("text") => {
                let position = self.message.content.len();
                self.message
                    .content
                    .push(UnifiedContent::text(json_string(block, "text")));
                self.positions.insert(index, position);
                self.state = BlockState::InTextBlock { position };
                events.push(StreamEvent::ContentStart {
                    index,
                    content_type: ContentKind::Text,
                });
            }
            Some("tool_use") => {
                let call =
                    UnifiedToolCall::new(json_string(block, "id"), json_string(block, "name"));
                let position = self.message.content.len();
                self.message.content.push(call.to_content());
                self.positions.insert(index, position);
                self.buffer = ArgumentBuffer::new();
                self.state = BlockState::InToolBlock {
                    call_id: call.call_id.clone(),
                };
                events.push(StreamEvent::ContentStart {
                    index,
                    content_type: ContentKind::ToolUse,
                });
                events.push(StreamEvent::ToolCallStart {
                    call_id: call.call_id.clone(),
                    tool_name: call.tool_name.clone(),
                });
                self.tool_calls.push(call);
            }
            other => {
                tracing::trace!(block_type = ?other, index, "ignoring unsupported content block");
            }
        }
    }

    fn on_block_delta(&mut self, data: &Value, events: &mut Vec<StreamEvent>) {
        let index = data["index"].as_u64().unwrap_or(0);
        let delta = &data["delta"];

        match delta["type"].as_str() {
            Some("text_delta") => {
                let text = json_string(delta, "text");
                let position = match self.state {
                    BlockState::InTextBlock { position } => position,
                    _ => match self.positions.get(&index) {
                        Some(&position) => position,
                        None => {
                            let position = self.message.content.len();
                            self.message.content.push(UnifiedContent::text(""));
                            self.positions.insert(index, position);
                            position
                        }
                    },
                };

                if let Some(UnifiedContent::Text { text: existing }) =
                    self.message.content.get_mut(position)
                {
                    existing.push_str(&text);
                }
                events.push(StreamEvent::text_delta(text));
            }
            Some("input_json_delta") => {
                let Some(call_id) = self.state.current_call().map(str::to_owned) else {
                    tracing::warn!(index, "input_json_delta outside of a tool_use block");
                    return;
                };

                let fragment = json_string(delta, "partial_json");
                if let Assembly::Complete(parameters) = self.buffer.push(&fragment) {
                    self.set_parameters(&call_id, parameters.clone());
                    events.push(StreamEvent::ToolCallDelta {
                        call_id,
                        parameters,
                    });
                }
            }
            other => tracing::warn!(delta_type = ?other, "unknown delta type"),
        }
    }

    fn on_block_stop(&mut self, data: &Value, events: &mut Vec<StreamEvent>) {
        let index = data["index"].as_u64().unwrap_or(0);
        self.buffer = ArgumentBuffer::new();
        self.state = BlockState::Idle;
        events.push(StreamEvent::ContentEnd { index });
    }

    /// Update both views of a tool call.
    fn set_parameters(&mut self, call_id: &str, parameters: Map<String, Value>) {
        for item in &mut self.message.content {
            if let UnifiedContent::ToolUse { id, input, .. } = item
                && id == call_id
            {
                *input = parameters.clone();
            }
        }
        if let Some(call) = self.tool_calls.iter_mut().find(|c| c.call_id == call_id) {
            call.parameters = parameters;
        }
    }
}

impl StreamProcessor for AnthropicStreamProcessor {
    fn process_chunk(&mut self, frame: &Frame) -> Vec<StreamEvent> {
        let data = &frame.data;
        let mut events = Vec::new();

        match frame.event_type() {
            Some("message_start") => {
                let message = &data["message"];
                if let Some(role) = message["role"].as_str().and_then(Role::parse) {
                    self.message.role = role;
                }
                events.push(StreamEvent::MessageStart {
                    id: json_string(message, "id"),
                });
            }
            Some("content_block_start") => self.on_block_start(data, &mut events),
            Some("content_block_delta") => self.on_block_delta(data, &mut events),
            Some("content_block_stop") => self.on_block_stop(data, &mut events),
            Some("error") => {
                let error = &data["error"];
                let reason = error["message"]
                    .as_str()
                    .map(str::to_owned)
                    .unwrap_or_else(|| error.to_string());
                events.push(StreamEvent::failure(reason));
            }
            Some(event_type) => tracing::trace!(event_type, "ignoring SSE event"),
            None => tracing::trace!("ignoring frame without event type"),
        }

        events
    }

    fn finalize(mut self: Box<Self>) -> FinalizedTurn {
        // A stream that ended inside a tool block gets one last parse.
        if let BlockState::InToolBlock { call_id } = std::mem::take(&mut self.state) {
            let parameters = self.buffer.finish(&call_id);
            self.set_parameters(&call_id, parameters);
        }

        let Self {
            mut message,
            tool_calls,
            ..
        } = *self;
        message.tool_calls = (!tool_calls.is_empty()).then(|| tool_calls.clone());

        FinalizedTurn {
            completed_message: message,
            tool_calls,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn run(frames: &[(&str, Value)]) -> (Vec<StreamEvent>, FinalizedTurn) {
        let mut processor = AnthropicAdapter.create_stream_processor();
        let mut events = Vec::new();
        for (event, data) in frames {
            events.extend(processor.process_chunk(&Frame::named(*event, data.clone())));
        }
        (events, processor.finalize())
    }

    fn tool_block(index: u64, id: &str, name: &str) -> (&'static str, Value) {
        (
            "content_block_start",
            json!({"type":"content_block_start","index":index,"content_block":{"type":"tool_use","id":id,"name":name,"input":{}}}),
        )
    }

    fn json_delta(index: u64, partial: &str) -> (&'static str, Value) {
        (
            "content_block_delta",
            json!({"type":"content_block_delta","index":index,"delta":{"type":"input_json_delta","partial_json":partial}}),
        )
    }

    fn stop(index: u64) -> (&'static str, Value) {
        (
            "content_block_stop",
            json!({"type":"content_block_stop","index":index}),
        )
    }

    #[test]
    fn message_start_and_text() {
        let (events, turn) = run(&[
            (
                "message_start",
                json!({"type":"message_start","message":{"id":"msg_01","role":"assistant","content":[]}}),
            ),
            (
                "content_block_start",
                json!({"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}),
            ),
            (
                "content_block_delta",
                json!({"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}),
            ),
            (
                "content_block_delta",
                json!({"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":", world"}}),
            ),
            stop(0),
            ("message_stop", json!({"type":"message_stop"})),
        ]);

        assert_eq!(
            events,
            vec![
                StreamEvent::MessageStart { id: "msg_01".into() },
                StreamEvent::ContentStart {
                    index: 0,
                    content_type: ContentKind::Text
                },
                StreamEvent::text_delta("Hello"),
                StreamEvent::text_delta(", world"),
                StreamEvent::ContentEnd { index: 0 },
            ]
        );
        assert_eq!(
            turn.completed_message.content,
            vec![UnifiedContent::text("Hello, world")]
        );
        assert!(turn.tool_calls.is_empty());
    }

    #[test]
    fn tool_use_block_assembles_arguments() {
        let (events, turn) = run(&[
            tool_block(1, "toolu_01", "get_weather"),
            json_delta(1, ""),
            json_delta(1, "{\"location\":"),
            json_delta(1, " \"Paris\"}"),
            stop(1),
        ]);

        let deltas: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::ToolCallDelta { .. }))
            .collect();
        assert_eq!(deltas.len(), 1);

        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].call_id, "toolu_01");
        assert_eq!(turn.tool_calls[0].parameters["location"], "Paris");
        assert_eq!(
            turn.completed_message.tool_invocations(),
            turn.tool_calls,
            "content and side-channel views must agree"
        );
    }

    const NESTED_ARGS: &str = r#"{"city":"Zürich","n":[1,2,{"x":"}"}],"s":"a\"b"}"#;

    /// Every two-way split of `args` at a char boundary, plus one split into
    /// single characters.
    fn fragmentations(args: &str) -> Vec<Vec<&str>> {
        let mut all: Vec<Vec<&str>> = args
            .char_indices()
            .map(|(i, _)| i)
            .chain([args.len()])
            .map(|i| {
                let (head, tail) = args.split_at(i);
                vec![head, tail]
            })
            .collect();
        all.push(
            args.char_indices()
                .map(|(i, c)| &args[i..i + c.len_utf8()])
                .collect(),
        );
        all
    }

    fn assert_assembled(
        events: &[StreamEvent],
        turn: &FinalizedTurn,
        call_id: &str,
        expected: &Map<String, Value>,
        fragments: &[&str],
    ) {
        let deltas: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ToolCallDelta { call_id: id, parameters } => Some((id, parameters)),
                _ => None,
            })
            .collect();
        assert!(!deltas.is_empty(), "no delta for {fragments:?}");
        for (id, parameters) in deltas {
            assert_eq!(id, call_id);
            assert_eq!(parameters, expected, "split {fragments:?}");
        }
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(&turn.tool_calls[0].parameters, expected, "split {fragments:?}");
    }

    #[test]
    fn input_json_independent_of_fragmentation() {
        let expected: Map<String, Value> = serde_json::from_str(NESTED_ARGS).unwrap();

        for fragments in fragmentations(NESTED_ARGS) {
            let mut frames = vec![tool_block(0, "toolu_01", "get_weather")];
            frames.extend(fragments.iter().map(|f| json_delta(0, f)));
            frames.push(stop(0));

            let (events, turn) = run(&frames);
            assert_assembled(&events, &turn, "toolu_01", &expected, &fragments);
        }
    }

    #[test]
    fn block_stop_clears_buffer_between_tool_blocks() {
        let (events, turn) = run(&[
            tool_block(0, "toolu_a", "get_weather"),
            json_delta(0, "{\"location\": \"Par"),
            stop(0),
            tool_block(1, "toolu_b", "write_content_to_file"),
            json_delta(1, "{\"file_path\": \"a.txt\"}"),
            stop(1),
        ]);

        // The unfinished first block must not leak into the second.
        assert_eq!(
            events
                .iter()
                .filter_map(|e| match e {
                    StreamEvent::ToolCallDelta { call_id, .. } => Some(call_id.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            vec!["toolu_b"]
        );
        assert!(turn.tool_calls[0].parameters.is_empty());
        assert_eq!(turn.tool_calls[1].parameters["file_path"], "a.txt");
    }

    #[test]
    fn input_json_without_open_block_is_ignored() {
        let (events, turn) = run(&[json_delta(0, "{\"x\":1}")]);
        assert!(events.is_empty());
        assert!(turn.tool_calls.is_empty());
    }

    #[test]
    fn stream_ending_inside_tool_block_still_finalizes() {
        let (_, turn) = run(&[
            tool_block(0, "toolu_a", "get_weather"),
            json_delta(0, "{\"location\": \"Oslo\"}"),
        ]);
        assert_eq!(turn.tool_calls[0].parameters["location"], "Oslo");
    }

    #[test]
    fn frames_identified_by_payload_type() {
        let mut processor = AnthropicStreamProcessor::new();
        let events = processor.process_chunk(&Frame::data(
            json!({"type":"message_start","message":{"id":"msg_x","role":"assistant"}}),
        ));
        assert_eq!(events, vec![StreamEvent::MessageStart { id: "msg_x".into() }]);
    }

    #[test]
    fn ping_and_message_delta_are_silent() {
        let (events, _) = run(&[
            ("ping", json!({"type":"ping"})),
            (
                "message_delta",
                json!({"type":"message_delta","delta":{"stop_reason":"tool_use"}}),
            ),
        ]);
        assert!(events.is_empty());
    }

    #[test]
    fn error_event_produces_failure() {
        let (events, _) = run(&[(
            "error",
            json!({"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}),
        )]);
        assert_eq!(events, vec![StreamEvent::failure("Overloaded")]);
    }

    // -- Request projection ---------------------------------------------------

    #[test]
    fn system_messages_are_lifted() {
        let (system, wire) = messages_to_anthropic(&[
            UnifiedMessage::system("You are helpful."),
            UnifiedMessage::user("Hello"),
            UnifiedMessage::system("Tool x failed."),
        ]);
        assert_eq!(system.as_deref(), Some("You are helpful.\nTool x failed."));
        assert_eq!(
            wire,
            vec![json!({"role": "user", "content": [{"type": "text", "text": "Hello"}]})]
        );
    }

    #[test]
    fn tool_exchange_projection() {
        let mut call = UnifiedToolCall::new("tc_01", "read_file");
        call.parameters.insert("path".into(), json!("test.txt"));
        let mut assistant = UnifiedMessage::new(Role::Assistant, vec![UnifiedContent::text("")]);
        assistant.tool_calls = Some(vec![call]);

        let (_, wire) = messages_to_anthropic(&[
            UnifiedMessage::user("Read test.txt"),
            assistant,
            UnifiedMessage::tool_result(Role::User, "tc_01", "file contents here"),
        ]);

        assert_eq!(wire[1]["role"], "assistant");
        let blocks = wire[1]["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 1, "empty text dropped, side-channel call appended");
        assert_eq!(blocks[0]["type"], "tool_use");
        assert_eq!(blocks[0]["id"], "tc_01");
        assert_eq!(blocks[0]["input"]["path"], "test.txt");

        assert_eq!(wire[2]["role"], "user");
        assert_eq!(wire[2]["content"][0]["type"], "tool_result");
        assert_eq!(wire[2]["content"][0]["tool_use_id"], "tc_01");
        assert_eq!(wire[2]["content"][0]["content"][0]["text"], "file contents here");
    }

    #[test]
    fn tool_use_blocks_not_duplicated() {
        let call = UnifiedToolCall::new("tc_01", "get_weather");
        let mut assistant = UnifiedMessage::new(Role::Assistant, vec![call.to_content()]);
        assistant.tool_calls = Some(vec![call]);

        let (_, wire) = messages_to_anthropic(&[assistant]);
        assert_eq!(wire[0]["content"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn image_projection_uses_base64_source() {
        let msg = UnifiedMessage::new(
            Role::User,
            vec![UnifiedContent::image("aGk=", "image/jpeg")],
        );
        let (_, wire) = messages_to_anthropic(&[msg]);
        assert_eq!(
            wire[0]["content"][0],
            json!({"type": "image", "source": {"type": "base64", "media_type": "image/jpeg", "data": "aGk="}})
        );
    }

    // -- Response parsing -----------------------------------------------------

    #[test]
    fn parse_non_streaming_text_response() {
        let response = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Hello, world!"}],
            "stop_reason": "end_turn"
        });
        let msg = AnthropicAdapter.from_provider_format(&response).unwrap();
        assert_eq!(msg, UnifiedMessage::assistant("Hello, world!"));
    }

    #[test]
    fn parse_non_streaming_tool_use_response() {
        let response = json!({
            "role": "assistant",
            "content": [{
                "type": "tool_use",
                "id": "toolu_01",
                "name": "read_file",
                "input": {"path": "/tmp/test.txt"}
            }],
            "stop_reason": "tool_use"
        });
        let msg = AnthropicAdapter.from_provider_format(&response).unwrap();
        let calls = msg.tool_calls.clone().unwrap();
        assert_eq!(calls[0].call_id, "toolu_01");
        assert_eq!(calls[0].parameters["path"], "/tmp/test.txt");
        assert_eq!(msg.tool_invocations(), calls);
    }

    #[test]
    fn parse_missing_content_is_error() {
        assert!(AnthropicAdapter.from_provider_format(&json!({"role": "assistant"})).is_err());
    }

    #[test]
    fn text_round_trip() {
        let original = UnifiedMessage::user("round trip me");
        let payload = AnthropicAdapter.to_provider_format(std::slice::from_ref(&original));
        let parsed = AnthropicAdapter.from_provider_format(&payload.messages[0]).unwrap();
        assert_eq!(parsed, original);
    }
}
