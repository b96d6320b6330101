//! CloudPilot one-shot runner.
//!
//! Runs a single turn and prints the outcome as JSON:
//!
//! ```text
//! cp-agent [--config PATH] [--history FILE] MESSAGE...
//! ```
//!
//! `--history` points at a JSON array of messages from a previous run's
//! `updated_history`.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use cp_agent::{AgentConfig, AwsClientFactory, SessionContext, ToolRegistry, TurnOrchestrator};
use cp_protocol::Message;

const DEFAULT_CONFIG_PATH: &str = "cloudpilot.toml";

struct Args {
    config_path: String,
    history_path: Option<String>,
    message: String,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut history_path = None;
    let mut words = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next().context("--config needs a path")?,
            "--history" => history_path = Some(args.next().context("--history needs a path")?),
            _ => words.push(arg),
        }
    }

    if words.is_empty() {
        anyhow::bail!("usage: cp-agent [--config PATH] [--history FILE] MESSAGE...");
    }
    Ok(Args {
        config_path,
        history_path,
        message: words.join(" "),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cp-agent starting");

    let args = parse_args()?;

    // ── Load config ─────────────────────────────────────────────
    let config = AgentConfig::load(&args.config_path)?;
    tracing::info!(
        region = %config.aws.region,
        model_id = %config.model.model_id,
        "config loaded"
    );

    let history: Vec<Message> = match &args.history_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading history from {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing history in {path}"))?
        }
        None => Vec::new(),
    };

    // ── Wire the orchestrator ───────────────────────────────────
    let factory = AwsClientFactory::new(config.aws.clone(), config.model.clone());
    let session = Arc::new(SessionContext::new(Arc::new(factory)));
    let registry = Arc::new(ToolRegistry::with_defaults());
    tracing::info!(tool_count = registry.len(), "tool registry initialized");
    let orchestrator = TurnOrchestrator::new(session, registry, &config);

    match orchestrator.process_turn(&args.message, &history).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "turn failed");
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            std::process::exit(1);
        }
    }
}
