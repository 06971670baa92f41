//! SSE frame reader.
//!
//! Turns a raw provider byte stream into discrete JSON [`Frame`]s.  Two line
//! grammars are understood: a bare `data: <json>` line (OpenAI style) and an
//! `event: <name>` line followed by its `data: <json>` line (Anthropic style).
//!
//! Bytes arrive with arbitrary chunk boundaries, so [`SseDecoder`] keeps the
//! trailing partial line between calls.  Lines are split on raw bytes, which
//! keeps multi-byte UTF-8 sequences intact when a chunk boundary falls inside
//! one.

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::{AgentError, Result};

/// A fallible stream of raw bytes, as returned by a transport.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Sentinel line that terminates OpenAI-style streams.
const DONE_SENTINEL: &str = "data: [DONE]";

/// One decoded unit of an SSE stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The `event:` name preceding the data line, if any.
    pub event: Option<String>,

    /// The parsed `data:` payload.
    pub data: Value,
}

impl Frame {
    /// A frame without an event name.
    pub fn data(data: Value) -> Self {
        Self { event: None, data }
    }

    /// A frame with an event name.
    pub fn named(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: Some(event.into()),
            data,
        }
    }

    /// The event name, falling back to the payload's `type` field.
    pub fn event_type(&self) -> Option<&str> {
        self.event.as_deref().or_else(|| self.data["type"].as_str())
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Incremental, transport-agnostic SSE line decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the current, not yet newline-terminated line.
    buffer: Vec<u8>,

    /// The most recently seen `event:` name, waiting for its `data:` line.
    pending_event: Option<String>,
}

impl SseDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every frame completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            if let Some(frame) = self.parse_line(&line) {
                frames.push(frame);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);

        frames
    }

    /// Number of buffered bytes belonging to an unterminated line.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Parse one complete line.
    fn parse_line(&mut self, line: &str) -> Option<Frame> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed == DONE_SENTINEL || line.starts_with(':') {
            return None;
        }

        if let Some(name) = line.strip_prefix("event:") {
            self.pending_event = Some(name.trim().to_owned());
            return None;
        }

        let Some(data) = line.strip_prefix("data:") else {
            tracing::trace!(line, "ignoring unrecognised SSE line");
            return None;
        };

        let event = self.pending_event.take();
        match serde_json::from_str::<Value>(data.trim_start()) {
            Ok(data) => Some(Frame { event, data }),
            Err(e) => {
                tracing::warn!(error = %e, line, "dropping SSE line with invalid JSON");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Lazy, single-pass frame reader over a [`ByteStream`].
///
/// The reader owns the byte stream; dropping the reader (normally or early)
/// releases it.
pub struct SseFrameReader {
    bytes: Option<ByteStream>,
    decoder: SseDecoder,
    ready: std::collections::VecDeque<Frame>,
}

impl SseFrameReader {
    /// Wrap a byte stream.
    pub fn new(bytes: ByteStream) -> Self {
        Self {
            bytes: Some(bytes),
            decoder: SseDecoder::new(),
            ready: std::collections::VecDeque::new(),
        }
    }

    /// Return the next frame, `Ok(None)` once the byte stream is exhausted.
    ///
    /// A read error ends the sequence: the byte stream is released and the
    /// error is returned.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(Some(frame));
            }

            let Some(bytes) = self.bytes.as_mut() else {
                return Ok(None);
            };

            match bytes.next().await {
                Some(Ok(chunk)) => self.ready.extend(self.decoder.push(&chunk)),
                Some(Err(e)) => {
                    self.bytes = None;
                    return Err(AgentError::LlmStreamError {
                        reason: format!("stream read error: {e}"),
                    });
                }
                None => {
                    self.bytes = None;
                    let leftover = self.decoder.pending_bytes();
                    if leftover > 0 {
                        tracing::debug!(leftover, "discarding unterminated trailing SSE line");
                    }
                    return Ok(None);
                }
            }
        }
    }
}

impl std::fmt::Debug for SseFrameReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseFrameReader")
            .field("open", &self.bytes.is_some())
            .field("decoder", &self.decoder)
            .field("ready", &self.ready.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
