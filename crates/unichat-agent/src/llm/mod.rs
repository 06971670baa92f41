//! LLM integration layer.
//!
//! This module provides the interface between the orchestrator and large
//! language model providers.  It is organized into:
//!
//! - [`types`] -- Unified data model (messages, tool calls, streaming events).
//! - [`sse`] -- SSE frame reader over a raw byte stream.
//! - [`adapter`] -- Provider adapter and stream processor traits.
//! - [`openai`] -- OpenAI Chat Completions adapter.
//! - [`anthropic`] -- Anthropic Messages adapter.
//! - [`client`] -- Provider policy, transport trait and HTTP client.

pub mod adapter;
pub mod anthropic;
pub mod client;
pub mod openai;
pub mod sse;
pub mod types;

// Re-export the most commonly used types for convenience.
pub use adapter::{ProviderAdapter, StreamProcessor};
pub use anthropic::AnthropicAdapter;
pub use client::{LlmClient, LlmClientConfig, LlmProvider, Transport};
pub use openai::OpenAiAdapter;
pub use sse::{ByteStream, Frame, SseFrameReader};
pub use types::{
    ChatRequest, ContentKind, FinalizedTurn, ProviderPayload, Role, StreamEvent, ToolDefinition,
    ToolOutcome, UnifiedContent, UnifiedMessage, UnifiedToolCall,
};
