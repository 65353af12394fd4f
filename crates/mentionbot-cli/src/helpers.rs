//! Shared CLI helpers: path expansion and the startup banner.

use std::path::PathBuf;

use mentionbot_core::config::Config;

/// Resolve a leading `~` against the home directory. Paths without one, or
/// hosts without a home directory, are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = match path {
        "~" => Some(""),
        _ => path.strip_prefix("~/"),
    };
    match (rest, dirs_next::home_dir()) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Print the startup summary.
pub fn print_banner(config: &Config) {
    let mode = if config.agent.history_enabled {
        "per-thread history"
    } else {
        "stateless"
    };
    let gateway = &config.gateway;
    println!(
        "\n  🤖 Mentionbot v{version}\n\n  Model:     {model}\n  Mode:      {mode}\n  Listening: {host}:{port}{path}\n\n  Ctrl+C to stop\n",
        version = env!("CARGO_PKG_VERSION"),
        model = config.provider.model,
        host = gateway.host,
        port = gateway.port,
        path = config.slack.events_path,
    );
}
