//! Subcommands `unichat chat` and `unichat ask`.
//!
//! Replies are printed as they stream in; tool activity is shown on its own
//! lines.  Ctrl+C cancels the exchange in flight by dropping its stream.

use std::io::{self, Write as _};

use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::info;

use unichat_agent::{ChatConfig, Orchestrator, StreamEvent, ToolOutcome};

/// How an exchange ended.
enum Outcome {
    Completed,
    Interrupted,
}

/// Run the interactive chat loop.
pub async fn cmd_chat(mut orchestrator: Orchestrator, config: &ChatConfig) -> Result<()> {
    println!();
    println!("  unichat v{}", env!("CARGO_PKG_VERSION"));
    println!("  Provider: {}", config.provider);
    println!("  Model: {}", config.model());
    println!("  Max depth: {}", orchestrator.max_depth());
    println!("  Type a message, '/history' to dump the conversation, or 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut line_buf = String::new();

    loop {
        print!("> ");
        io::stdout().flush().ok();

        line_buf.clear();
        match stdin.read_line(&mut line_buf) {
            Ok(0) => {
                println!();
                info!("EOF received, exiting");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("  Error reading input: {e}");
                continue;
            }
        }

        let trimmed = line_buf.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed == "quit" || trimmed == "exit" {
            info!("user requested exit");
            break;
        }

        if trimmed == "/history" {
            let dump = serde_json::to_string_pretty(orchestrator.history())
                .context("failed to serialize history")?;
            println!("{dump}");
            continue;
        }

        match run_exchange(&mut orchestrator, trimmed).await {
            Ok(Outcome::Completed) => println!(),
            Ok(Outcome::Interrupted) => println!("\n  Interrupted.\n"),
            Err(e) => eprintln!("\n  Error: {e}\n"),
        }
    }

    info!(messages = orchestrator.history().len(), "shutting down");
    Ok(())
}

/// Send one prompt and print the reply.
pub async fn cmd_ask(mut orchestrator: Orchestrator, prompt: &str) -> Result<()> {
    match run_exchange(&mut orchestrator, prompt).await? {
        Outcome::Completed => Ok(()),
        Outcome::Interrupted => anyhow::bail!("interrupted"),
    }
}

/// Drive one exchange to completion, rendering events as they arrive.
async fn run_exchange(orchestrator: &mut Orchestrator, text: &str) -> Result<Outcome> {
    let mut stream = orchestrator.stream_chat(text);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut stdout = io::stdout();
    let mut mid_line = false;

    loop {
        let event = tokio::select! {
            _ = &mut interrupt => return Ok(Outcome::Interrupted),
            event = stream.next() => event,
        };
        let Some(event) = event else {
            break;
        };

        match event? {
            StreamEvent::TextDelta { text } => {
                print!("{text}");
                stdout.flush().ok();
                mid_line = !text.ends_with('\n');
            }
            StreamEvent::ToolCallStart { tool_name, .. } => {
                if mid_line {
                    println!();
                    mid_line = false;
                }
                println!("  [tool] calling {tool_name}...");
            }
            StreamEvent::ToolCallComplete { call_id, outcome } => match outcome {
                ToolOutcome::Result(value) => println!("  [tool] {call_id} -> {value}"),
                ToolOutcome::Error(error) => println!("  [tool] {call_id} failed: {error}"),
            },
            _ => {}
        }
    }

    if mid_line {
        println!();
    }
    Ok(Outcome::Completed)
}
