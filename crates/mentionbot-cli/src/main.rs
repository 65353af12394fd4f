//! Mentionbot CLI: entry point.
//!
//! `mentionbot [--port N] [--stateless] [--config PATH] [--logs]`
//!
//! Loads config (file → env vars → flags), then runs the gateway until
//! Ctrl+C. Exits non-zero only when startup fails.

mod gateway;
mod helpers;

use anyhow::Result;
use clap::Parser;

use mentionbot_core::config::{load_config, Config};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Slack mention bot: answers @mentions in-thread with an LLM reply
#[derive(Parser, Debug)]
#[command(name = "mentionbot", version, about, long_about = None)]
struct Cli {
    /// Port for the Slack Events API listener (overrides config and $PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep no per-thread history; every mention is answered on its own
    #[arg(long, default_value_t = false)]
    stateless: bool,

    /// Config file (default: ~/.mentionbot/config.json)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    logs: bool,
}

impl Cli {
    /// Flags win over file and env settings.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if self.stateless {
            config.agent.history_enabled = false;
        }
        config
    }
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logs);

    let config_path = cli.config.as_deref().map(helpers::expand_tilde);
    let config = cli.apply(load_config(config_path.as_deref()));

    gateway::run(config).await
}

/// `--logs` forces debug output for our crates; otherwise `RUST_LOG`
/// applies, defaulting to `info`.
fn log_filter(verbose: bool, rust_log: Option<String>) -> String {
    if verbose {
        "mentionbot=debug,info".to_string()
    } else {
        rust_log
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "info".to_string())
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(log_filter(verbose, std::env::var("RUST_LOG").ok()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
