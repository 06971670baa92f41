//! Provider adapter capability interface.
//!
//! Each provider family implements [`ProviderAdapter`] once.  The adapter
//! projects unified history into the provider's request shape, parses a
//! complete (non-streaming) response back, and hands out a fresh
//! [`StreamProcessor`] per assistant turn.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::llm::sse::Frame;
use crate::llm::types::{FinalizedTurn, ProviderPayload, StreamEvent, UnifiedMessage};

/// Converts between the unified model and one provider's wire format.
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Project the history into the provider's request shape.  Lossy.
    fn to_provider_format(&self, history: &[UnifiedMessage]) -> ProviderPayload;

    /// Parse a complete, non-streaming provider response.
    fn from_provider_format(&self, response: &Value) -> Result<UnifiedMessage>;

    /// Create a stateful processor scoped to one assistant turn.
    fn create_stream_processor(&self) -> Box<dyn StreamProcessor>;
}

/// Turns the frames of one streamed assistant turn into unified events.
pub trait StreamProcessor: Send {
    /// Consume one frame, returning the events it produces (possibly none).
    fn process_chunk(&mut self, frame: &Frame) -> Vec<StreamEvent>;

    /// Assemble the final message.  Called once, after the last frame.
    fn finalize(self: Box<Self>) -> FinalizedTurn;
}

// ---------------------------------------------------------------------------
// Argument assembly
// ---------------------------------------------------------------------------

/// Accumulated, possibly incomplete JSON text of one tool call's arguments.
///
/// Providers stream arguments as arbitrary fragments.  The only reliable
/// signal that the text so far is complete is that it parses, so every push
/// re-attempts a full parse.  An unparseable buffer is the normal
/// "still assembling" state, not an error.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArgumentBuffer {
    raw: String,
}

/// Result of pushing a fragment into an [`ArgumentBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Assembly {
    /// The buffer does not yet hold a complete JSON object.
    Incomplete,
    /// The buffer parses as a JSON object.
    Complete(Map<String, Value>),
}

impl ArgumentBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and report whether the buffer is now a complete
    /// object.
    pub fn push(&mut self, fragment: &str) -> Assembly {
        self.raw.push_str(fragment);
        self.assemble()
    }

    /// Current state of the buffer without appending.
    pub fn assemble(&self) -> Assembly {
        match serde_json::from_str::<Value>(&self.raw) {
            Ok(Value::Object(map)) => Assembly::Complete(map),
            _ => Assembly::Incomplete,
        }
    }

    /// Final parameters: the parsed object, or an empty object when the
    /// buffer never became one.
    pub fn finish(&self, call_id: &str) -> Map<String, Value> {
        match self.assemble() {
            Assembly::Complete(map) => map,
            Assembly::Incomplete => {
                if !self.raw.trim().is_empty() {
                    tracing::warn!(
                        call_id,
                        raw = %self.raw,
                        "tool call arguments never became a JSON object, using {{}}"
                    );
                }
                Map::new()
            }
        }
    }
}

/// Which kind of block a stream processor is currently inside.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BlockState {
    /// No block open.
    #[default]
    Idle,
    /// Inside a text block; `position` indexes the message content.
    InTextBlock { position: usize },
    /// Inside a tool-use block whose arguments are being assembled.
    InToolBlock { call_id: String },
}

impl BlockState {
    /// The id of the open tool call, if any.
    pub fn current_call(&self) -> Option<&str> {
        match self {
            Self::InToolBlock { call_id } => Some(call_id),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn buffer_completes_only_on_valid_object() {
        let mut buf = ArgumentBuffer::new();
        assert_eq!(buf.push("{\"lat"), Assembly::Incomplete);
        assert_eq!(buf.push("\":1"), Assembly::Incomplete);
        match buf.push("}") {
            Assembly::Complete(map) => assert_eq!(Value::Object(map), json!({"lat": 1})),
            Assembly::Incomplete => panic!("expected complete object"),
        }
    }

    #[test]
    fn non_object_json_is_not_complete() {
        let mut buf = ArgumentBuffer::new();
        assert_eq!(buf.push("42"), Assembly::Incomplete);
        assert!(buf.finish("c1").is_empty());
    }

    #[test]
    fn finish_defaults_to_empty_object() {
        let mut buf = ArgumentBuffer::new();
        buf.push("{\"path\": \"a.t");
        assert!(buf.finish("c1").is_empty());
        assert!(ArgumentBuffer::new().finish("c2").is_empty());
    }

    #[test]
    fn block_state_current_call() {
        assert_eq!(BlockState::Idle.current_call(), None);
        assert_eq!(BlockState::InTextBlock { position: 0 }.current_call(), None);
        let state = BlockState::InToolBlock {
            call_id: "toolu_1".into(),
        };
        assert_eq!(state.current_call(), Some("toolu_1"));
    }
}
