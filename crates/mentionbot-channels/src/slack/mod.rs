//! Slack channel: Events API over HTTP in, Web API `chat.postMessage` out.
//!
//! - `events`: axum router answering Slack's POSTs (signature check,
//!   `url_verification`, `app_mention` → bus)
//! - `signature`: `X-Slack-Signature` HMAC verification
//! - [`SlackChannel`]: binds the listener, serves the router until stopped,
//!   and posts replies into threads

pub mod events;
pub mod signature;

pub use events::{resolve_thread_id, router, BotIdentity, IngressState};
pub use signature::{verify_signature, SlackError};

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use mentionbot_core::bus::queue::MessageBus;
use mentionbot_core::bus::types::OutboundMessage;
use mentionbot_core::config::schema::SlackConfig;

use crate::base::Channel;
use crate::formatting::{split_message, SLACK_MAX_LEN};

// ─────────────────────────────────────────────
// SlackChannel
// ─────────────────────────────────────────────

pub struct SlackChannel {
    config: SlackConfig,
    bus: Arc<MessageBus>,
    http: reqwest::Client,
    /// Filled by `start()` from `auth.test`.
    identity: OnceLock<BotIdentity>,
    /// Taken by `start()`; `None` once serving.
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl SlackChannel {
    /// Bind the Events API listener on `addr` (e.g. `"0.0.0.0:10000"`).
    ///
    /// Binding happens here rather than in `start()` so a port clash is a
    /// startup error.
    pub async fn bind(config: SlackConfig, addr: &str, bus: Arc<MessageBus>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind Slack events listener on {addr}"))?;
        let local_addr = listener.local_addr()?;

        if config.signing_secret.is_empty() {
            warn!("slack signingSecret is empty, request signatures will NOT be verified");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build Slack HTTP client")?;

        Ok(Self {
            config,
            bus,
            http,
            identity: OnceLock::new(),
            listener: Mutex::new(Some(listener)),
            local_addr,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The Events API router for this channel's config and bus.
    pub fn router(&self) -> axum::Router {
        let signing_secret = Some(self.config.signing_secret.clone()).filter(|s| !s.is_empty());
        router(
            &self.config.events_path,
            IngressState {
                signing_secret,
                identity: self.identity.get().cloned(),
                bus: self.bus.clone(),
            },
        )
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.config.api_base.trim_end_matches('/'))
    }

    /// Ask Slack who this token belongs to.
    async fn resolve_identity(&self) -> anyhow::Result<BotIdentity> {
        let resp: Value = self
            .http
            .post(self.api_url("auth.test"))
            .bearer_auth(&self.config.bot_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if resp["ok"].as_bool() != Some(true) {
            let err = resp["error"].as_str().unwrap_or("unknown");
            return Err(SlackError::Api(format!("auth.test failed: {err}")).into());
        }
        let user_id = resp["user_id"]
            .as_str()
            .context("no user_id in auth.test response")?;
        Ok(BotIdentity {
            user_id: user_id.to_string(),
            bot_id: resp["bot_id"].as_str().map(String::from),
        })
    }

    /// Send one message via `chat.postMessage`.
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut body = json!({
            "channel": channel,
            "text": text,
        });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = json!(ts);
        }

        let resp: Value = self
            .http
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(&self.config.bot_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if resp["ok"].as_bool() != Some(true) {
            let err = resp["error"].as_str().unwrap_or("unknown");
            return Err(SlackError::Api(format!("chat.postMessage failed: {err}")).into());
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn start(&self) -> anyhow::Result<()> {
        let listener = self
            .listener
            .lock()
            .await
            .take()
            .context("slack channel already started")?;

        if self.identity.get().is_none() {
            match self.resolve_identity().await {
                Ok(me) => {
                    info!(user_id = %me.user_id, "resolved Slack bot identity");
                    let _ = self.identity.set(me);
                }
                Err(e) => warn!(error = %e, "auth.test failed, ignoring every bot-authored event"),
            }
        }

        info!(
            addr = %self.local_addr,
            path = %self.config.events_path,
            "Slack Events API listening"
        );

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await
            .context("Slack events server failed")
    }

    async fn stop(&self) -> anyhow::Result<()> {
        info!("stopping Slack channel");
        // notify_one keeps a permit if the server has not started waiting yet.
        self.shutdown.notify_one();
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
        let chunks = split_message(&msg.content, SLACK_MAX_LEN);
        debug!(
            chat_id = %msg.chat_id,
            thread = msg.thread_ts.as_deref().unwrap_or("-"),
            chunks = chunks.len(),
            "posting reply"
        );

        for chunk in &chunks {
            self.post_message(&msg.chat_id, chunk, msg.thread_ts.as_deref())
                .await?;
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
