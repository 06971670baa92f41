//! CLI entry point for unichat.
//!
//! This binary provides the `unichat` command with an interactive `chat`
//! subcommand and a one-shot `ask` subcommand.

mod cli;
mod repl;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use unichat_agent::{ChatConfig, LlmClient, Orchestrator, ToolRegistry};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "info" });

    let config = resolve_config(&cli)?;
    let orchestrator = build_orchestrator(&config)?;

    match cli.command {
        Commands::Chat => repl::cmd_chat(orchestrator, &config).await,
        Commands::Ask { prompt } => repl::cmd_ask(orchestrator, &prompt.join(" ")).await,
    }
}

/// Merge the config file, the environment and command-line flags, in that
/// order of increasing precedence.
fn resolve_config(cli: &Cli) -> Result<ChatConfig> {
    let mut config = match &cli.config {
        Some(path) => ChatConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ChatConfig::default(),
    };

    config
        .apply_env()
        .context("invalid environment configuration")?;

    if let Some(provider) = &cli.provider {
        config.provider = provider.parse().context("invalid --provider")?;
        // The key for the newly selected provider may live in the environment.
        if let Ok(key) = std::env::var(config.provider.api_key_env())
            && !key.is_empty()
        {
            config.api_key = Some(key);
        }
    }
    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }

    Ok(config)
}

fn build_orchestrator(config: &ChatConfig) -> Result<Orchestrator> {
    let client_config = config.to_client_config().with_context(|| {
        format!(
            "no API key for {}; set {} or `api_key` in the config file",
            config.provider,
            config.provider.api_key_env()
        )
    })?;
    let provider = config.provider.family();

    let client = LlmClient::new(client_config).context("failed to create LLM client")?;
    info!(provider = %config.provider, model = %client.model(), "LLM client ready");

    let mut orchestrator = Orchestrator::new(
        provider,
        Arc::new(client),
        Arc::new(ToolRegistry::with_builtins()),
    )
    .with_max_depth(config.max_depth);

    if let Some(prompt) = &config.system_prompt {
        orchestrator = orchestrator.with_system_prompt(prompt.clone());
    }

    Ok(orchestrator)
}

/// Install the global tracing subscriber.  Logs go to stderr so they never
/// interleave with streamed replies on stdout.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
