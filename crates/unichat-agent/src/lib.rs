//! Streaming chat engine for OpenAI-style and Anthropic-style LLM APIs.
//!
//! Both provider families are normalized into one message and event model so
//! the rest of an application never branches on provider identity.
//!
//! ## Architecture
//!
//! ```text
//!  Orchestrator ── request ──> Transport ── bytes ──> SSE reader
//!       ^                                                  │ frames
//!       │                                                  v
//!       └──── events, final message ────── Adapter (openai / anthropic)
//!       │
//!       └── tool calls ──> ToolExecutor
//! ```
//!
//! ## Modules
//!
//! - [`llm`] -- Unified types, SSE reader, provider adapters and HTTP client.
//! - [`orchestrator`] -- Conversation history and the bounded tool loop.
//! - [`tools`] -- Tool executor trait, registry and built-in tools.
//! - [`config`] -- TOML and environment configuration.
//! - [`error`] -- Error types.

pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod tools;

// Re-export the most commonly used types at the crate root.
pub use config::{ChatConfig, DEFAULT_MAX_DEPTH, ProviderKind};
pub use error::{AgentError, Result};
pub use llm::{
    AnthropicAdapter, ByteStream, ChatRequest, ContentKind, FinalizedTurn, Frame, LlmClient,
    LlmClientConfig, LlmProvider, OpenAiAdapter, ProviderAdapter, ProviderPayload, Role,
    SseFrameReader, StreamEvent, StreamProcessor, ToolDefinition, ToolOutcome, Transport,
    UnifiedContent, UnifiedMessage, UnifiedToolCall,
};
pub use orchestrator::Orchestrator;
pub use tools::{Tool, ToolExecutor, ToolRegistry};
