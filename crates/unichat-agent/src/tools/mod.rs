//! Tool execution.
//!
//! The orchestrator only sees [`ToolExecutor`]: a name-addressed async
//! function returning JSON.  [`ToolRegistry`] is the standard implementation,
//! mapping tool names to [`Tool`] handlers and advertising their definitions
//! to the model on every request.

pub mod builtin;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};
use crate::llm::types::ToolDefinition;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Executes tool calls on behalf of the orchestrator.
///
/// An unknown tool name and a tool's own failure are distinct errors, but the
/// orchestrator treats both the same way: the failure is recorded in history
/// and the conversation continues.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Definitions of every tool the model may call.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run `tool_name` with `parameters`.
    async fn execute(&self, tool_name: &str, parameters: Map<String, Value>) -> Result<Value>;
}

/// A single tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The definition advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Invoke the tool.
    async fn call(&self, parameters: Map<String, Value>) -> Result<Value>;
}

// ---------------------------------------------------------------------------
// Closure-backed tools
// ---------------------------------------------------------------------------

/// Adapts an async closure into a [`Tool`].
pub struct FnTool<F> {
    definition: ToolDefinition,
    handler: F,
}

impl<F, Fut> FnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    /// Wrap `handler` under `definition`.
    pub fn new(definition: ToolDefinition, handler: F) -> Self {
        Self {
            definition,
            handler,
        }
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn call(&self, parameters: Map<String, Value>) -> Result<Value> {
        (self.handler)(parameters).await
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name-addressed collection of tools.  Definitions are reported in
/// registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a tool, replacing any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "replacing registered tool");
        } else {
            self.order.push(name);
        }
    }

    /// Register an async closure as a tool.
    pub fn register_fn<F, Fut>(&mut self, definition: ToolDefinition, handler: F)
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register(Arc::new(FnTool::new(definition, handler)));
    }

    /// Whether a tool with `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    async fn execute(&self, tool_name: &str, parameters: Map<String, Value>) -> Result<Value> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| AgentError::UnknownTool {
                tool_name: tool_name.to_owned(),
            })?;

        tracing::debug!(tool = %tool_name, "executing tool");

        tool.call(parameters).await.map_err(|e| match e {
            e @ AgentError::ToolExecutionFailed { .. } => e,
            other => AgentError::ToolExecutionFailed {
                tool_name: tool_name.to_owned(),
                reason: other.to_string(),
            },
        })
    }
}

/// Extract a required string parameter.
pub(crate) fn require_str<'a>(
    params: &'a Map<String, Value>,
    field: &str,
    tool_name: &str,
) -> Result<&'a str> {
    params
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::ToolExecutionFailed {
            tool_name: tool_name.to_owned(),
            reason: format!("missing required string field `{field}`"),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
