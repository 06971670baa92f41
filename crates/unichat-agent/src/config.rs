//! Chat configuration.
//!
//! Settings come from an optional TOML file and are then overridden from the
//! environment:
//!
//! - `UNICHAT_PROVIDER` -- `openai`, `anthropic` or `deepseek`
//! - `UNICHAT_MODEL`, `UNICHAT_BASE_URL`, `UNICHAT_MAX_DEPTH`
//! - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` / `DEEPSEEK_API_KEY`, whichever
//!   matches the selected provider

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::llm::client::{LlmClientConfig, LlmProvider};

/// Default bound on recursive assistant turns per exchange.
pub const DEFAULT_MAX_DEPTH: usize = 10;

// ---------------------------------------------------------------------------
// Provider kind
// ---------------------------------------------------------------------------

/// A concrete provider endpoint preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAI,
    Anthropic,
    DeepSeek,
}

impl ProviderKind {
    /// Lowercase name, as used in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::DeepSeek => "deepseek",
        }
    }

    /// The wire protocol family this preset speaks.
    pub fn family(self) -> LlmProvider {
        match self {
            Self::Anthropic => LlmProvider::Anthropic,
            Self::OpenAI | Self::DeepSeek => LlmProvider::OpenAI,
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::DeepSeek => "deepseek-chat",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "deepseek" => Ok(Self::DeepSeek),
            other => Err(AgentError::ConfigError {
                reason: format!(
                    "unknown provider `{other}` (expected openai, anthropic or deepseek)"
                ),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat configuration
// ---------------------------------------------------------------------------

/// Everything needed to run a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Provider preset.
    pub provider: ProviderKind,

    /// API key.  Usually supplied through the environment.
    pub api_key: Option<String>,

    /// Base URL override, e.g. for a local OpenAI-compatible server.
    pub base_url: Option<String>,

    /// Model identifier; the provider default when unset.
    pub model: Option<String>,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Overall HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Bound on recursive assistant turns per exchange.
    pub max_depth: usize,

    /// Optional system prompt placed at the start of history.
    pub system_prompt: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            base_url: None,
            model: None,
            max_tokens: 4096,
            temperature: None,
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            max_depth: DEFAULT_MAX_DEPTH,
            system_prompt: None,
        }
    }
}

impl ChatConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AgentError::ConfigError {
            reason: format!("failed to parse TOML config: {e}"),
        })
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AgentError::ConfigError {
            reason: format!("failed to read config file {}: {e}", path.display()),
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            provider = %config.provider,
            "configuration loaded from file"
        );
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to read variables.  Empty values are
    /// treated as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get("UNICHAT_PROVIDER") {
            self.provider = provider.parse()?;
        }
        if let Some(model) = get("UNICHAT_MODEL") {
            self.model = Some(model);
        }
        if let Some(base_url) = get("UNICHAT_BASE_URL") {
            self.base_url = Some(base_url);
        }
        if let Some(depth) = get("UNICHAT_MAX_DEPTH") {
            self.max_depth = depth.trim().parse().map_err(|e| AgentError::ConfigError {
                reason: format!("invalid UNICHAT_MAX_DEPTH `{depth}`: {e}"),
            })?;
        }
        if let Some(key) = get(self.provider.api_key_env()) {
            self.api_key = Some(key);
        }

        Ok(())
    }

    /// The model to request.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Build the HTTP client configuration.
    pub fn to_client_config(&self) -> Result<LlmClientConfig> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AgentError::MissingApiKey {
                provider: self.provider.as_str().into(),
            })?;

        let model = self.model();
        let mut config = match self.provider {
            ProviderKind::OpenAI => LlmClientConfig::openai(api_key, model),
            ProviderKind::Anthropic => LlmClientConfig::anthropic(api_key, model),
            ProviderKind::DeepSeek => LlmClientConfig::deepseek(api_key, model),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        config.max_tokens = self.max_tokens;
        config.temperature = self.temperature;
        config.timeout = Duration::from_secs(self.request_timeout_secs);
        config.connect_timeout = Duration::from_secs(self.connect_timeout_secs);

        Ok(config)
    }
}
