//! Config loader: reads `~/.mentionbot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.mentionbot/config.json`
//! 3. Deployment env vars: `SLACK_BOT_TOKEN`, `SLACK_SIGNING_SECRET`,
//!    `OPENAI_API_KEY`, `PORT`
//! 4. Structured env vars `MENTIONBOT_<SECTION>__<FIELD>`

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given (or default) path + process env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    let config = load_config_from_path(&config_path);
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// `lookup` abstracts `std::env::var` so overrides can be exercised without
/// touching the process environment.
///
/// Supported overrides:
/// - `SLACK_BOT_TOKEN` / `MENTIONBOT_SLACK__BOT_TOKEN` → `slack.bot_token`
/// - `SLACK_SIGNING_SECRET` / `MENTIONBOT_SLACK__SIGNING_SECRET` → `slack.signing_secret`
/// - `MENTIONBOT_SLACK__EVENTS_PATH` → `slack.events_path`
/// - `OPENAI_API_KEY` / `MENTIONBOT_PROVIDER__API_KEY` → `provider.api_key`
/// - `MENTIONBOT_PROVIDER__API_BASE` → `provider.api_base`
/// - `MENTIONBOT_PROVIDER__MODEL` → `provider.model`
/// - `PORT` / `MENTIONBOT_GATEWAY__PORT` → `gateway.port`
/// - `MENTIONBOT_GATEWAY__HOST` → `gateway.host`
/// - `MENTIONBOT_AGENT__HISTORY_ENABLED` → `agent.history_enabled`
/// - `MENTIONBOT_CONVERSATION__MAX_MESSAGES` → `conversation.max_messages`
/// - `MENTIONBOT_CONVERSATION__IDLE_TTL_SECS` → `conversation.idle_ttl_secs`
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    // Deployment-style variables first; structured ones win over them.
    if let Some(val) = lookup("SLACK_BOT_TOKEN") {
        config.slack.bot_token = val;
    }
    if let Some(val) = lookup("SLACK_SIGNING_SECRET") {
        config.slack.signing_secret = val;
    }
    if let Some(val) = lookup("OPENAI_API_KEY") {
        config.provider.api_key = val;
    }
    if let Some(val) = lookup("PORT") {
        set_parsed(&mut config.gateway.port, "PORT", &val);
    }

    // Slack
    if let Some(val) = lookup("MENTIONBOT_SLACK__BOT_TOKEN") {
        config.slack.bot_token = val;
    }
    if let Some(val) = lookup("MENTIONBOT_SLACK__SIGNING_SECRET") {
        config.slack.signing_secret = val;
    }
    if let Some(val) = lookup("MENTIONBOT_SLACK__EVENTS_PATH") {
        config.slack.events_path = val;
    }

    // Provider
    if let Some(val) = lookup("MENTIONBOT_PROVIDER__API_KEY") {
        config.provider.api_key = val;
    }
    if let Some(val) = lookup("MENTIONBOT_PROVIDER__API_BASE") {
        config.provider.api_base = Some(val);
    }
    if let Some(val) = lookup("MENTIONBOT_PROVIDER__MODEL") {
        config.provider.model = val;
    }

    // Gateway
    if let Some(val) = lookup("MENTIONBOT_GATEWAY__HOST") {
        config.gateway.host = val;
    }
    if let Some(val) = lookup("MENTIONBOT_GATEWAY__PORT") {
        set_parsed(&mut config.gateway.port, "MENTIONBOT_GATEWAY__PORT", &val);
    }

    // Agent
    if let Some(val) = lookup("MENTIONBOT_AGENT__HISTORY_ENABLED") {
        config.agent.history_enabled = val == "true" || val == "1";
    }

    // Conversation
    if let Some(val) = lookup("MENTIONBOT_CONVERSATION__MAX_MESSAGES") {
        set_parsed(
            &mut config.conversation.max_messages,
            "MENTIONBOT_CONVERSATION__MAX_MESSAGES",
            &val,
        );
    }
    if let Some(val) = lookup("MENTIONBOT_CONVERSATION__IDLE_TTL_SECS") {
        set_parsed(
            &mut config.conversation.idle_ttl_secs,
            "MENTIONBOT_CONVERSATION__IDLE_TTL_SECS",
            &val,
        );
    }

    config
}

/// Parse `val` into `slot`, leaving the previous value on parse failure.
fn set_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, val: &str) {
    match val.parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key = key, value = val, "ignoring unparseable env override"),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.gateway.port, 10000);
        assert_eq!(config.provider.model, "gpt-4o");
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "provider": { "model": "gpt-4o-mini", "apiKey": "sk-file" },
            "agent": { "historyEnabled": false }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.provider.api_key, "sk-file");
        assert!(!config.agent.history_enabled);
        // Defaults preserved
        assert_eq!(config.gateway.port, 10000);
        assert_eq!(config.provider.timeout_secs, 120);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.gateway.port, 10000);
    }

    #[test]
    fn test_load_empty_json() {
        let file = write_temp_json("{}");
        let config = load_config_from_path(file.path());
        assert!(config.agent.history_enabled);
    }

    #[test]
    fn test_deployment_env_vars() {
        let config = apply_env_overrides(
            Config::default(),
            env(&[
                ("SLACK_BOT_TOKEN", "xoxb-env"),
                ("SLACK_SIGNING_SECRET", "secret"),
                ("OPENAI_API_KEY", "sk-env"),
                ("PORT", "8080"),
            ]),
        );
        assert_eq!(config.slack.bot_token, "xoxb-env");
        assert_eq!(config.slack.signing_secret, "secret");
        assert_eq!(config.provider.api_key, "sk-env");
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn test_structured_env_wins() {
        let config = apply_env_overrides(
            Config::default(),
            env(&[
                ("PORT", "8080"),
                ("MENTIONBOT_GATEWAY__PORT", "9999"),
                ("OPENAI_API_KEY", "sk-plain"),
                ("MENTIONBOT_PROVIDER__API_KEY", "sk-structured"),
            ]),
        );
        assert_eq!(config.gateway.port, 9999);
        assert_eq!(config.provider.api_key, "sk-structured");
    }

    #[test]
    fn test_env_history_and_retention() {
        let config = apply_env_overrides(
            Config::default(),
            env(&[
                ("MENTIONBOT_AGENT__HISTORY_ENABLED", "0"),
                ("MENTIONBOT_CONVERSATION__MAX_MESSAGES", "6"),
                ("MENTIONBOT_CONVERSATION__IDLE_TTL_SECS", "60"),
                ("MENTIONBOT_PROVIDER__API_BASE", "http://localhost:8000/v1"),
            ]),
        );
        assert!(!config.agent.history_enabled);
        assert_eq!(config.conversation.max_messages, 6);
        assert_eq!(config.conversation.idle_ttl_secs, 60);
        assert_eq!(
            config.provider.api_base.as_deref(),
            Some("http://localhost:8000/v1")
        );
    }

    #[test]
    fn test_unparseable_port_keeps_previous() {
        let config = apply_env_overrides(Config::default(), env(&[("PORT", "not-a-port")]));
        assert_eq!(config.gateway.port, 10000);
    }
}
