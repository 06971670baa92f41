//! Multi-provider streaming transport.
//!
//! Supports the **Anthropic Messages API** and the **OpenAI Chat Completions
//! API** (including OpenAI-compatible endpoints such as DeepSeek, Ollama and
//! vLLM).  The client only opens the SSE stream; parsing belongs to the
//! adapters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::llm::adapter::ProviderAdapter;
use crate::llm::anthropic::AnthropicAdapter;
use crate::llm::openai::OpenAiAdapter;
use crate::llm::sse::ByteStream;
use crate::llm::types::{ChatRequest, Role, ToolDefinition};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default Anthropic API base URL.
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Default OpenAI API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// DeepSeek's OpenAI-compatible base URL.
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Provider policy
// ---------------------------------------------------------------------------

/// Identifies which wire protocol family a conversation speaks.
///
/// This is the only place provider identity is branched on: it selects the
/// adapter, the role used for tool results, and the endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI Chat Completions API (also covers OpenAI-compatible endpoints).
    OpenAI,
}

impl LlmProvider {
    /// Lowercase provider name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
        }
    }

    /// The adapter translating this provider's wire format.
    pub fn adapter(self) -> Box<dyn ProviderAdapter> {
        match self {
            Self::Anthropic => Box::new(AnthropicAdapter),
            Self::OpenAI => Box::new(OpenAiAdapter),
        }
    }

    /// Role given to tool-result messages appended to history.
    pub fn tool_result_role(self) -> Role {
        match self {
            Self::Anthropic => Role::User,
            Self::OpenAI => Role::Tool,
        }
    }

    /// The streaming endpoint under `base_url`.
    pub fn endpoint(self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Self::Anthropic => format!("{base}/v1/messages"),
            Self::OpenAI => format!("{base}/chat/completions"),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            other => Err(AgentError::ConfigError {
                reason: format!("unknown provider `{other}`"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Opens one provider stream per assistant turn.
///
/// Failures to open the stream (network error, non-2xx status) are returned
/// as [`AgentError::Transport`].  No retries happen at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the raw response body as a byte stream.
    async fn request(&self, request: &ChatRequest) -> Result<ByteStream>;
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to a single LLM provider endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Which provider this configuration targets.
    pub provider: LlmProvider,
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API (e.g. `https://api.anthropic.com`).
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Sampling temperature, provider default when `None`.
    pub temperature: Option<f32>,
    /// Overall request timeout, including the streamed body.
    pub timeout: Duration,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
}

impl LlmClientConfig {
    fn with_defaults(
        provider: LlmProvider,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Create a configuration for the Anthropic API.
    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_defaults(LlmProvider::Anthropic, api_key, model, ANTHROPIC_BASE_URL)
    }

    /// Create a configuration for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_defaults(LlmProvider::OpenAI, api_key, model, OPENAI_BASE_URL)
    }

    /// Create a configuration for DeepSeek's OpenAI-compatible API.
    pub fn deepseek(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_defaults(LlmProvider::OpenAI, api_key, model, DEEPSEEK_BASE_URL)
    }

    /// Create a configuration for any OpenAI-compatible API.
    pub fn openai_compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self::with_defaults(LlmProvider::OpenAI, api_key, model, base_url)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP transport for either the Anthropic Messages API or the OpenAI Chat
/// Completions API.  Every request is streamed.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: Arc<LlmClientConfig>,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: config.provider.as_str().into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AgentError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// The provider this client talks to.
    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    /// The configured model.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the provider-specific JSON body for a streaming request.
    pub fn build_request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": request.payload.messages,
            "stream": true,
        });

        if let Some(system) = &request.payload.system {
            body["system"] = json!(system);
        }

        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }

        if !request.tools.is_empty() {
            body["tools"] = match self.config.provider {
                LlmProvider::Anthropic => tools_to_anthropic(&request.tools),
                LlmProvider::OpenAI => tools_to_openai(&request.tools),
            };
        }

        body
    }

    /// Authentication and protocol headers for the configured provider.
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let invalid = |e: reqwest::header::InvalidHeaderValue| AgentError::ConfigError {
            reason: format!("invalid API key header: {e}"),
        };

        match self.config.provider {
            LlmProvider::Anthropic => {
                headers.insert(
                    "x-api-key",
                    HeaderValue::from_str(&self.config.api_key).map_err(invalid)?,
                );
                headers.insert(
                    "anthropic-version",
                    HeaderValue::from_static(ANTHROPIC_VERSION),
                );
            }
            LlmProvider::OpenAI => {
                let auth_value = format!("Bearer {}", self.config.api_key);
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&auth_value).map_err(invalid)?,
                );
            }
        }

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl Transport for LlmClient {
    async fn request(&self, request: &ChatRequest) -> Result<ByteStream> {
        let provider = self.config.provider;
        let url = provider.endpoint(&self.config.base_url);
        let body = self.build_request_body(request);

        tracing::debug!(
            url = %url,
            model = %self.config.model,
            provider = %provider,
            messages = request.payload.messages.len(),
            tools = request.tools.len(),
            "sending LLM request"
        );

        let resp = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = extract_error_message(&text);
            tracing::warn!(status = status.as_u16(), %message, "LLM request rejected");
            return Err(AgentError::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        Ok(resp.bytes_stream().map(|r| r.map_err(AgentError::from)).boxed())
    }
}

/// Pull `error.message` out of a JSON error body, falling back to the raw
/// body text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

// ===========================================================================
// Tool definition formats
// ===========================================================================

/// Convert tool definitions into the Anthropic API format.
pub fn tools_to_anthropic(tools: &[ToolDefinition]) -> Value {
    let tool_values: Vec<Value> = tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.input_schema,
            })
        })
        .collect();
    json!(tool_values)
}

/// Convert tool definitions into the OpenAI Chat Completions API format.
///
/// OpenAI wraps each tool in `{"type": "function", "function": {...}}`.
pub fn tools_to_openai(tools: &[ToolDefinition]) -> Value {
    let tool_values: Vec<Value> = tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.input_schema,
                }
            })
        })
        .collect();
    json!(tool_values)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::sse::SseFrameReader;
    use crate::llm::types::{ProviderPayload, UnifiedMessage};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn weather_tool() -> ToolDefinition {
        ToolDefinition {
            name: "get_weather".into(),
            description: "Get current weather".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"latitude": {"type": "number"}},
                "required": ["latitude"]
            }),
        }
    }

    fn request_for(provider: LlmProvider, history: &[UnifiedMessage]) -> ChatRequest {
        ChatRequest {
            payload: provider.adapter().to_provider_format(history),
            tools: vec![weather_tool()],
        }
    }

    #[test]
    fn empty_api_key_returns_error() {
        let err = LlmClient::new(LlmClientConfig::anthropic("", "claude-sonnet-4-20250514"))
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingApiKey { provider } if provider == "anthropic"));
    }

    #[test]
    fn config_presets() {
        let config = LlmClientConfig::openai("sk-test", "gpt-4o");
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.base_url, OPENAI_BASE_URL);
        assert_eq!(config.max_tokens, 4096);

        let config = LlmClientConfig::deepseek("sk-test", "deepseek-chat");
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.base_url, DEEPSEEK_BASE_URL);

        let config =
            LlmClientConfig::openai_compatible("ollama", "llama3", "http://localhost:11434/v1");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn provider_policy_table() {
        assert_eq!(LlmProvider::OpenAI.tool_result_role(), Role::Tool);
        assert_eq!(LlmProvider::Anthropic.tool_result_role(), Role::User);
        assert_eq!(
            LlmProvider::OpenAI.endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            LlmProvider::Anthropic.endpoint(ANTHROPIC_BASE_URL),
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAI);
        assert!("gemini".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn build_anthropic_request_body() {
        let client =
            LlmClient::new(LlmClientConfig::anthropic("sk-test", "claude-sonnet-4-20250514"))
                .unwrap();
        let request = request_for(
            LlmProvider::Anthropic,
            &[
                UnifiedMessage::system("You are helpful."),
                UnifiedMessage::user("Hello"),
            ],
        );
        let body = client.build_request_body(&request);

        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["stream"], true);
        assert_eq!(body["system"], "You are helpful.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["tools"][0]["name"], "get_weather");
        assert!(body["tools"][0]["input_schema"].is_object());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn build_openai_request_body() {
        let mut config = LlmClientConfig::openai("sk-test", "gpt-4o");
        config.temperature = Some(0.5);
        let client = LlmClient::new(config).unwrap();
        let request = request_for(
            LlmProvider::OpenAI,
            &[
                UnifiedMessage::system("You are helpful."),
                UnifiedMessage::user("Hello"),
            ],
        );
        let body = client.build_request_body(&request);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.5);
        assert!(body.get("system").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_weather");
    }

    #[test]
    fn error_message_extraction() {
        assert_eq!(
            extract_error_message(r#"{"error":{"type":"rate_limit","message":"slow down"}}"#),
            "slow down"
        );
        assert_eq!(extract_error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn streams_openai_response_body() {
        let server = MockServer::start().await;
        let sse = "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let client = LlmClient::new(LlmClientConfig::openai_compatible(
            "sk-test",
            "gpt-4o",
            server.uri(),
        ))
        .unwrap();

        let bytes = client
            .request(&ChatRequest {
                payload: ProviderPayload::default(),
                tools: Vec::new(),
            })
            .await
            .unwrap();

        let mut reader = SseFrameReader::new(bytes);
        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.data["choices"][0]["delta"]["content"], "Hi");
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn anthropic_request_sends_version_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "event: ping\ndata: {\"type\":\"ping\"}\n\n",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = LlmClientConfig::anthropic("sk-ant-test", "claude-sonnet-4-20250514");
        config.base_url = server.uri();
        let client = LlmClient::new(config).unwrap();

        let request = request_for(LlmProvider::Anthropic, &[UnifiedMessage::user("hi")]);
        let mut reader = SseFrameReader::new(client.request(&request).await.unwrap());
        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.event_type(), Some("ping"));
    }

    #[tokio::test]
    async fn non_success_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit exceeded", "type": "requests"}
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(LlmClientConfig::openai_compatible(
            "sk-test",
            "gpt-4o",
            server.uri(),
        ))
        .unwrap();

        let err = client
            .request(&ChatRequest::default())
            .await
            .err()
            .unwrap();
        match err {
            AgentError::Transport { status, message } => {
                assert_eq!(status, Some(429));
                assert_eq!(message, "Rate limit exceeded");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
