//! Conversation orchestrator.
//!
//! Owns the conversation history, drives one provider turn at a time through
//! the active adapter and transport, executes requested tools and feeds their
//! results back until the model stops calling tools or the depth bound is
//! reached.
//!
//! Each successful tool call spawns its own follow-up turn.  The recursion is
//! kept on an explicit stack of [`Step`]s so that the whole exchange remains
//! a single lazy event stream: nothing runs unless the caller polls, and
//! dropping the stream stops all further requests, tool calls and history
//! appends.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::BoxStream;
use uuid::Uuid;

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{AgentError, Result};
use crate::llm::adapter::ProviderAdapter;
use crate::llm::client::{LlmProvider, Transport};
use crate::llm::sse::SseFrameReader;
use crate::llm::types::{
    ChatRequest, StreamEvent, ToolOutcome, UnifiedMessage, UnifiedToolCall,
};
use crate::tools::ToolExecutor;

/// Pending work within one exchange.
#[derive(Debug)]
enum Step {
    /// Run one assistant turn at `depth`.
    Turn { depth: usize },
    /// Execute the remaining tool calls of a turn at `depth`.
    Tools {
        depth: usize,
        calls: VecDeque<UnifiedToolCall>,
    },
}

/// Drives a single in-memory conversation.
pub struct Orchestrator {
    id: Uuid,
    provider: LlmProvider,
    adapter: Box<dyn ProviderAdapter>,
    transport: Arc<dyn Transport>,
    tools: Arc<dyn ToolExecutor>,
    history: Vec<UnifiedMessage>,
    max_depth: usize,
}

impl Orchestrator {
    /// Create an orchestrator speaking `provider`'s protocol over
    /// `transport`.
    pub fn new(
        provider: LlmProvider,
        transport: Arc<dyn Transport>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            provider,
            adapter: provider.adapter(),
            transport,
            tools,
            history: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Builder: set the bound on assistant turns per exchange.  The bound
    /// counts every turn of one `stream_chat` call, including the follow-up
    /// turns of sibling tool calls.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builder: start the history with a system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.history.push(UnifiedMessage::system(prompt));
        self
    }

    /// Conversation identifier, used in log fields.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The provider protocol in use.
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// The bound on assistant turns per exchange.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The conversation so far, oldest first.
    pub fn history(&self) -> &[UnifiedMessage] {
        &self.history
    }

    /// Start a new exchange with `user_text`.
    ///
    /// The returned stream yields every event in production order.  A
    /// transport failure ends it with `Err` before any event of that turn;
    /// an unrecoverable stream failure first yields
    /// [`StreamEvent::MessageComplete`] carrying the error, then `Err`.  In
    /// both cases the partial assistant message is discarded.
    ///
    /// Reaching the depth bound ends the stream normally.
    pub fn stream_chat(
        &mut self,
        user_text: impl Into<String>,
    ) -> BoxStream<'_, Result<StreamEvent>> {
        let user_text = user_text.into();

        Box::pin(async_stream::try_stream! {
            self.history.push(UnifiedMessage::user(user_text));
            tracing::info!(
                conversation = %self.id,
                provider = %self.provider,
                history = self.history.len(),
                "starting exchange"
            );

            let mut stack = vec![Step::Turn { depth: 0 }];
            let mut turns = 0usize;

            while let Some(step) = stack.pop() {
                match step {
                    Step::Turn { depth } => {
                        if turns >= self.max_depth {
                            tracing::info!(
                                conversation = %self.id,
                                depth,
                                turns,
                                max_depth = self.max_depth,
                                "turn limit reached, not requesting another turn"
                            );
                            continue;
                        }
                        turns += 1;

                        let request = ChatRequest {
                            payload: self.adapter.to_provider_format(&self.history),
                            tools: self.tools.definitions(),
                        };
                        tracing::debug!(
                            conversation = %self.id,
                            depth,
                            messages = request.payload.messages.len(),
                            "requesting assistant turn"
                        );

                        let bytes = self.transport.request(&request).await?;
                        let mut reader = SseFrameReader::new(bytes);
                        let mut processor = self.adapter.create_stream_processor();

                        loop {
                            let next = reader.next_frame().await;
                            if let Err(e) = &next {
                                yield StreamEvent::failure(e.to_string());
                            }
                            let Some(frame) = next? else {
                                break;
                            };
                            tracing::trace!(event = ?frame.event_type(), "frame");

                            for event in processor.process_chunk(&frame) {
                                let failure = event.error().map(str::to_owned);
                                yield event;
                                if let Some(reason) = failure {
                                    Err::<(), AgentError>(AgentError::LlmStreamError { reason })?;
                                }
                            }
                        }
                        drop(reader);

                        let turn = processor.finalize();
                        tracing::debug!(
                            conversation = %self.id,
                            depth,
                            tool_calls = turn.tool_calls.len(),
                            "assistant turn finalized"
                        );
                        self.history.push(turn.completed_message);

                        if !turn.tool_calls.is_empty() {
                            stack.push(Step::Tools {
                                depth,
                                calls: turn.tool_calls.into(),
                            });
                        }
                    }

                    Step::Tools { depth, mut calls } => {
                        let Some(call) = calls.pop_front() else {
                            continue;
                        };

                        match self.tools.execute(&call.tool_name, call.parameters.clone()).await {
                            Ok(result) => {
                                let text = serde_json::to_string(&result)?;
                                self.history.push(UnifiedMessage::tool_result(
                                    self.provider.tool_result_role(),
                                    call.call_id.clone(),
                                    text,
                                ));
                                yield StreamEvent::ToolCallComplete {
                                    call_id: call.call_id,
                                    outcome: ToolOutcome::Result(result),
                                };

                                // The follow-up turn runs before the next call.
                                stack.push(Step::Tools { depth, calls });
                                stack.push(Step::Turn { depth: depth + 1 });
                            }
                            Err(e) => {
                                tracing::warn!(
                                    conversation = %self.id,
                                    tool = %call.tool_name,
                                    call_id = %call.call_id,
                                    error = %e,
                                    "tool execution failed"
                                );
                                self.history.push(UnifiedMessage::system(format!(
                                    "Error executing tool {}: {e}",
                                    call.tool_name
                                )));
                                yield StreamEvent::ToolCallComplete {
                                    call_id: call.call_id,
                                    outcome: ToolOutcome::Error(e.to_string()),
                                };
                                stack.push(Step::Tools { depth, calls });
                            }
                        }
                    }
                }
            }

            tracing::info!(
                conversation = %self.id,
                turns,
                history = self.history.len(),
                "exchange complete"
            );
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("history", &self.history.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::llm::sse::ByteStream;
    use crate::llm::types::Role;
    use crate::tools::ToolRegistry;

    /// Replays one canned body per request.
    struct Replay {
        bodies: Mutex<VecDeque<&'static str>>,
    }

    impl Replay {
        fn new(bodies: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                bodies: Mutex::new(bodies.into()),
            })
        }
    }

    #[async_trait]
    impl Transport for Replay {
        async fn request(&self, _request: &ChatRequest) -> Result<ByteStream> {
            let body = self
                .bodies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or("data: [DONE]\n");
            Ok(futures::stream::iter(vec![Ok(Bytes::from_static(body.as_bytes()))]).boxed())
        }
    }

    const HELLO: &str = "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"Hello\"}}]}\n\ndata: [DONE]\n";

    #[tokio::test]
    async fn system_prompt_leads_history() {
        let mut orchestrator = Orchestrator::new(
            LlmProvider::OpenAI,
            Replay::new(vec![HELLO]),
            Arc::new(ToolRegistry::new()),
        )
        .with_system_prompt("Be brief.");

        let events: Vec<StreamEvent> = orchestrator
            .stream_chat("hi")
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert!(events.contains(&StreamEvent::text_delta("Hello")));
        let roles: Vec<Role> = orchestrator.history().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn zero_depth_bound_requests_nothing() {
        let mut orchestrator = Orchestrator::new(
            LlmProvider::OpenAI,
            Replay::new(vec![HELLO]),
            Arc::new(ToolRegistry::new()),
        )
        .with_max_depth(0);

        let events: Vec<Result<StreamEvent>> = orchestrator.stream_chat("hi").collect().await;
        assert!(events.is_empty());
        assert_eq!(orchestrator.history().len(), 1);
    }

    #[tokio::test]
    async fn tool_result_is_serialized_json() {
        let tool_turn = "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"get_weather\",\"arguments\":\"{\\\"latitude\\\":1,\\\"longitude\\\":2}\"}}]}}]}\n";
        let mut orchestrator = Orchestrator::new(
            LlmProvider::OpenAI,
            Replay::new(vec![tool_turn, HELLO]),
            Arc::new(ToolRegistry::with_builtins()),
        );

        let events: Vec<StreamEvent> = orchestrator
            .stream_chat("weather?")
            .map(|e| e.unwrap())
            .collect()
            .await;

        let complete = events
            .iter()
            .find_map(|e| match e {
                StreamEvent::ToolCallComplete { call_id, outcome } => Some((call_id, outcome)),
                _ => None,
            })
            .unwrap();
        assert_eq!(complete.0, "call_1");
        assert!(matches!(complete.1, ToolOutcome::Result(v) if v["temperature"] == json!(-9)));

        let result_msg = &orchestrator.history()[2];
        assert_eq!(result_msg.role, Role::Tool);
        match &result_msg.content[0] {
            crate::llm::types::UnifiedContent::ToolResult { tool_use_id, content } => {
                assert_eq!(tool_use_id, "call_1");
                let parsed: serde_json::Value =
                    serde_json::from_str(content[0].as_text().unwrap()).unwrap();
                assert_eq!(parsed["condition"], "clear");
            }
            other => panic!("expected tool result, got {other:?}"),
        }
        assert_eq!(orchestrator.history().len(), 4);
    }
}
