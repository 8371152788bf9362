//! Webpilot - browser agent driven by a computer-use model
//!
//! Main entry point for the CLI application.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use webpilot::core::config::ThinkingLevel;
use webpilot::{Config, Repl, TaskOutcome};

/// Webpilot - browser agent driven by a computer-use model
#[derive(Parser, Debug)]
#[command(name = "webpilot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model name
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Thinking level (off, low, high)
    #[arg(long, short = 't')]
    thinking: Option<ThinkingLevel>,

    /// Use Vertex AI instead of the Gemini API
    #[arg(long)]
    vertex: bool,

    /// Browser bridge command
    #[arg(long)]
    bridge: Option<String>,

    /// Run in headed browser mode (visible window)
    #[arg(long)]
    headed: bool,

    /// Draw the cursor while acting
    #[arg(long)]
    highlight_mouse: bool,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.model.name = model.clone();
    }

    if let Some(thinking) = args.thinking {
        config.model.thinking_level = thinking;
    }

    if args.vertex {
        config.api.use_vertex_ai = true;
    }

    if let Some(ref bridge) = args.bridge {
        config.browser.bridge_command = bridge.clone();
    }

    if args.headed {
        config.browser.headed = true;
    }

    if args.highlight_mouse {
        config.browser.highlight_mouse = true;
    }

    if args.debug {
        config.agent.debug = true;
    }

    let default_filter = if config.agent.debug {
        "webpilot=debug"
    } else {
        "webpilot=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut repl = Repl::with_config(config)?;

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let outcome = repl.run_once(&prompt).await?;
        if let TaskOutcome::Failed(message) = outcome {
            anyhow::bail!(message);
        }
        return Ok(());
    }

    // Interactive REPL mode
    repl.run().await?;

    Ok(())
}
