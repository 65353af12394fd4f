//! Configuration schema.
//!
//! Hierarchy: `Config` → `SlackConfig`, `ProviderConfig`, `AgentConfig`,
//! `GatewayConfig`, `ConversationConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default listen port, as expected by the hosting platform.
pub const DEFAULT_PORT: u16 = 10000;

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default persona sent as the system message. `{date}` is replaced with the
/// thread's creation date.
pub const DEFAULT_SYSTEM_PROMPT: &str = "あなたはSlack上で動く丁寧で親しみやすいアシスタントです。ユーザーの質問に優しく簡潔に答えてください。\n今日は{date}です。季節や時期にあった回答を心がけてください。";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.mentionbot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub slack: SlackConfig,
    pub provider: ProviderConfig,
    pub agent: AgentConfig,
    pub gateway: GatewayConfig,
    pub conversation: ConversationConfig,
}

/// Startup validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing Slack bot token (set SLACK_BOT_TOKEN or slack.botToken)")]
    MissingBotToken,
    #[error("missing completion API key (set OPENAI_API_KEY or provider.apiKey)")]
    MissingApiKey,
    #[error("events path must start with '/': {0}")]
    InvalidEventsPath(String),
    #[error("conversation.maxMessages = 1 cannot hold a question and its answer (use 0 or >= 2)")]
    MaxMessagesTooSmall,
    #[error("provider.timeoutSecs must be greater than 0")]
    ZeroTimeout,
}

impl Config {
    /// Check the settings the gateway cannot run without.
    ///
    /// An empty signing secret is allowed (verification is skipped with a
    /// warning at startup).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slack.bot_token.is_empty() {
            return Err(ConfigError::MissingBotToken);
        }
        if !self.provider.is_configured() {
            return Err(ConfigError::MissingApiKey);
        }
        if !self.slack.events_path.starts_with('/') {
            return Err(ConfigError::InvalidEventsPath(self.slack.events_path.clone()));
        }
        if self.conversation.max_messages == 1 {
            return Err(ConfigError::MaxMessagesTooSmall);
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Slack
// ─────────────────────────────────────────────

/// Slack app credentials and Events API endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`) used for `chat.postMessage`.
    pub bot_token: String,
    /// Signing secret used to verify inbound requests.
    pub signing_secret: String,
    /// HTTP path receiving Events API requests.
    pub events_path: String,
    /// Slack Web API base URL (overridable for tests and proxies).
    pub api_base: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            signing_secret: String::new(),
            events_path: "/slack/events".to_string(),
            api_base: "https://slack.com/api".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// Completion API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for Bearer authentication.
    pub api_key: String,
    /// Custom API base URL (defaults to OpenAI).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Model identifier sent with every request.
    pub model: String,
    /// Optional cap on generated tokens. Omitted from requests when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Optional sampling temperature. Omitted from requests when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// HTTP timeout for one completion call.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: None,
            timeout_secs: 120,
        }
    }
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Mention handling behaviour.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Keep per-thread history. When `false`, every mention is answered from
    /// a fresh system + user prompt.
    pub history_enabled: bool,
    /// Persona template; `{date}` is replaced with the formatted date.
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            history_enabled: true,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

// ─────────────────────────────────────────────
// Conversation retention
// ─────────────────────────────────────────────

/// Retention policy for per-thread history.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationConfig {
    /// Max user/assistant messages kept per thread (system message excluded).
    /// `0` disables the cap.
    pub max_messages: usize,
    /// Evict threads idle for longer than this. `0` disables eviction.
    pub idle_ttl_secs: u64,
    /// How often the idle sweeper runs.
    pub sweep_interval_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_messages: 40,
            idle_ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 5 * 60,
        }
    }
}
