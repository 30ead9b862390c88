//! Pairbot CLI — entry point.
//!
//! `pairbot -m "task"` runs a single goal and exits; without `-m` it
//! starts an interactive REPL. Dangerous actions prompt on stdin before
//! executing.

mod console;
mod repl;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use pairbot_agent::capabilities::filesystem::{
    ListFilesCapability, ReadFileCapability, WriteFileCapability,
};
use pairbot_agent::capabilities::shell::ShellCapability;
use pairbot_agent::capabilities::web::WebSearchCapability;
use pairbot_agent::{AgentLoop, CapabilityRegistry};
use pairbot_core::config::{load_config, Config};
use pairbot_core::types::RunOutcome;
use pairbot_providers::http_provider::HttpProvider;
use pairbot_providers::traits::RequestConfig;

use console::{ConsoleSink, StdinGate};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Pairbot — an AI pair programmer for your terminal
#[derive(Parser)]
#[command(name = "pairbot", version, about, long_about = None)]
struct Cli {
    /// Single task (non-interactive). Omit for REPL mode.
    #[arg(short, long)]
    message: Option<String>,

    /// Override the configured model.
    #[arg(long)]
    model: Option<String>,

    /// Override the configured workspace directory.
    #[arg(long)]
    workspace: Option<String>,

    /// Enable debug logging.
    #[arg(long, default_value_t = false)]
    logs: bool,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logs);

    let mut config = load_config(None);
    if let Some(model) = cli.model {
        config.agent.model = model;
    }
    if let Some(workspace) = cli.workspace {
        config.agent.workspace = workspace;
    }

    let agent = build_agent(&config)?;

    match cli.message {
        Some(goal) => {
            // Single-shot mode
            info!("processing single task");
            let report = agent.run(&goal).await.context("agent run failed")?;
            match report.outcome {
                RunOutcome::Completed(answer) => console::print_answer(&answer),
                RunOutcome::Exhausted { iterations } => console::print_exhausted(iterations),
            }
        }
        None => {
            repl::run(agent).await?;
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────
// Agent construction
// ─────────────────────────────────────────────

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    std::path::PathBuf::from(path)
}

/// Build an `AgentLoop` from the loaded configuration.
fn build_agent(config: &Config) -> Result<AgentLoop> {
    let workspace = expand_tilde(&config.agent.workspace);
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("failed to create workspace: {}", workspace.display()))?;

    if !config.provider.is_configured() {
        anyhow::bail!(
            "No API key configured. Set PAIRBOT_PROVIDER__API_KEY or OPENAI_API_KEY, \
             or add it to the config file."
        );
    }

    let request_config = RequestConfig {
        max_tokens: config.agent.max_tokens,
        temperature: config.agent.temperature,
    };
    let provider = HttpProvider::new(
        &config.provider.api_base,
        &config.provider.api_key,
        &config.agent.model,
        request_config,
    )
    .context("failed to create completion provider")?;

    let registry = build_registry(config, &workspace)?;

    let agent = AgentLoop::new(
        Arc::new(provider),
        Arc::new(registry),
        Arc::new(StdinGate),
        workspace,
    )
    .with_sink(Arc::new(ConsoleSink))
    .with_max_iterations(config.agent.max_iterations);

    Ok(agent)
}

/// Register the built-in capabilities.
fn build_registry(config: &Config, workspace: &Path) -> Result<CapabilityRegistry> {
    let allowed_dir = if config.agent.restrict_to_workspace {
        Some(workspace.to_path_buf())
    } else {
        None
    };
    let search_key = if config.tools.search_api_key.is_empty() {
        None
    } else {
        Some(config.tools.search_api_key.clone())
    };

    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(ReadFileCapability::new(allowed_dir.clone())))?;
    registry.register(Arc::new(WriteFileCapability::new(allowed_dir.clone())))?;
    registry.register(Arc::new(ListFilesCapability::new(allowed_dir)))?;
    registry.register(Arc::new(ShellCapability::new(
        workspace.to_path_buf(),
        Some(config.agent.command_timeout),
        config.agent.restrict_to_workspace,
    )))?;
    registry.register(Arc::new(WebSearchCapability::new(search_key)))?;

    Ok(registry)
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "info,pairbot_core=debug,pairbot_providers=debug,pairbot_agent=debug,pairbot_cli=debug",
        )
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
