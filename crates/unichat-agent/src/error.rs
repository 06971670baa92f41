//! Agent error types.
//!
//! All subsystems surface errors through [`AgentError`].  Recoverable
//! conditions (a malformed SSE line, an incomplete tool-argument buffer) never
//! become errors; they are handled where they occur.

/// Unified error type for the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- Transport errors ----------------------------------------------------
    /// Opening the provider stream failed (network failure or non-2xx status).
    #[error("{}", transport_message(*status, message))]
    Transport {
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        message: String,
    },

    // -- LLM errors ----------------------------------------------------------
    /// A non-streaming provider response could not be parsed.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The SSE stream was interrupted or the provider reported an error
    /// mid-stream.
    #[error("llm stream error: {reason}")]
    LlmStreamError { reason: String },

    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    // -- Tool errors ---------------------------------------------------------
    /// A tool call referenced by the model does not exist in the registry.
    #[error("unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    /// A tool invocation failed.
    #[error("tool execution failed for `{tool_name}`: {reason}")]
    ToolExecutionFailed { tool_name: String, reason: String },

    // -- Configuration errors ------------------------------------------------
    /// Configuration validation or loading failed.
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// File system error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // -- Generic -------------------------------------------------------------
    /// Catch-all for unexpected internal errors.  Prefer a typed variant
    /// whenever possible.
    #[error("internal agent error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

fn transport_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("transport error ({code}): {message}"),
        None => format!("transport error: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status() {
        let err = AgentError::Transport {
            status: Some(429),
            message: "rate limited".into(),
        };
        assert_eq!(err.to_string(), "transport error (429): rate limited");
    }

    #[test]
    fn transport_display_without_status() {
        let err = AgentError::Transport {
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn tool_failure_names_the_tool() {
        let err = AgentError::ToolExecutionFailed {
            tool_name: "write_content_to_file".into(),
            reason: "disk full".into(),
        };
        let text = err.to_string();
        assert!(text.contains("write_content_to_file"));
        assert!(text.contains("disk full"));
    }
}
