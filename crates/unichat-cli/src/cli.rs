//! CLI argument definitions for unichat.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// unichat -- one chat loop for OpenAI-style and Anthropic-style APIs.
#[derive(Parser)]
#[command(
    name = "unichat",
    version,
    about = "Streaming chat with tool calling for OpenAI, Anthropic and DeepSeek",
    long_about = "Chats with an LLM provider, streaming the reply as it arrives and \
                  running the built-in tools (get_weather, write_content_to_file) \
                  whenever the model asks for them."
)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Provider preset: openai, anthropic or deepseek.
    #[arg(long, short, global = true)]
    pub provider: Option<String>,

    /// Model identifier.
    #[arg(long, short, global = true)]
    pub model: Option<String>,

    /// Bound on recursive assistant turns per message.
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session.
    Chat,

    /// Send a single prompt and print the reply.
    Ask {
        /// The prompt text.
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
}
