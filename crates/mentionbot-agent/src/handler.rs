//! The mention flow: one inbound mention in, one threaded reply out.
//!
//! 1. Wait for the thread's turn
//! 2. Build the message list: stored history plus the new USER message,
//!    or a fresh `[system, user]` pair when history is disabled
//! 3. Call the LLM
//! 4. On success store the ASSISTANT reply; on failure reply with an apology
//!    and store nothing more

use std::sync::Arc;

use tracing::{debug, info, warn};

use mentionbot_core::bus::types::{InboundMessage, OutboundMessage};
use mentionbot_core::config::Config;
use mentionbot_core::conversation::{Clock, ConversationError, ConversationStore, SystemPrompt};
use mentionbot_core::types::Message;
use mentionbot_providers::{LlmProvider, LlmRequestConfig};

use crate::errors::MentionError;
use crate::locks::{ThreadLocks, Turn};

/// Per-call knobs taken from config.
#[derive(Clone, Debug, PartialEq)]
pub struct HandlerSettings {
    pub model: String,
    pub request: LlmRequestConfig,
    /// `false` sends only `[system, user]` on every call and keeps no history.
    pub history_enabled: bool,
}

impl HandlerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.provider.model.clone(),
            request: LlmRequestConfig {
                max_tokens: config.provider.max_tokens,
                temperature: config.provider.temperature,
            },
            history_enabled: config.agent.history_enabled,
        }
    }
}

pub struct MentionHandler {
    provider: Arc<dyn LlmProvider>,
    store: Arc<ConversationStore>,
    locks: Arc<ThreadLocks>,
    prompt: SystemPrompt,
    clock: Arc<dyn Clock>,
    settings: HandlerSettings,
}

impl MentionHandler {
    /// `prompt` and `clock` are only used directly in stateless mode; with
    /// history enabled the store renders the system message itself.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<ConversationStore>,
        prompt: SystemPrompt,
        clock: Arc<dyn Clock>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            provider,
            store,
            locks: Arc::new(ThreadLocks::new()),
            prompt,
            clock,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn locks(&self) -> &Arc<ThreadLocks> {
        &self.locks
    }

    /// Reserve `msg`'s place in its thread. Mentions of one thread are
    /// processed in the order their turns were reserved.
    pub fn reserve(&self, msg: &InboundMessage) -> Turn {
        self.locks.enqueue(&msg.thread_id)
    }

    /// Process one mention and build the reply for its thread.
    ///
    /// Never fails: errors become an apology message.
    pub async fn handle(&self, msg: &InboundMessage) -> OutboundMessage {
        self.handle_in_turn(msg, self.reserve(msg)).await
    }

    /// Like [`MentionHandler::handle`], with a turn taken earlier by
    /// [`MentionHandler::reserve`].
    pub async fn handle_in_turn(&self, msg: &InboundMessage, turn: Turn) -> OutboundMessage {
        let thread = msg.thread_id.as_str();
        let _guard = turn.wait().await;

        let result = if self.settings.history_enabled {
            self.converse(thread, &msg.content).await
        } else {
            self.one_shot(&msg.content).await
        };

        match result {
            Ok(text) => {
                info!(thread = %thread, chars = text.chars().count(), "replying");
                msg.reply(text)
            }
            Err(e) => {
                warn!(thread = %thread, status = ?e.status(), error = %e, "mention failed");
                msg.reply(e.user_message())
            }
        }
    }

    /// History mode. Caller holds the thread lock.
    async fn converse(&self, thread: &str, text: &str) -> Result<String, MentionError> {
        self.store.get_or_create(thread);
        self.store.append(thread, Message::user(text))?;

        let messages = self
            .store
            .history(thread)
            .ok_or_else(|| ConversationError::UnknownThread(thread.to_string()))?;
        debug!(thread = %thread, messages = messages.len(), "calling LLM with history");

        let response = self
            .provider
            .chat(&messages, &self.settings.model, &self.settings.request)
            .await?;

        if let Err(e) = self
            .store
            .append(thread, Message::assistant(response.content.as_str()))
        {
            warn!(thread = %thread, error = %e, "could not store assistant reply");
        }
        Ok(response.content)
    }

    /// Stateless mode: a dated system prompt and the user text, nothing else.
    async fn one_shot(&self, text: &str) -> Result<String, MentionError> {
        let messages = vec![self.prompt.render_at(self.clock.now()), Message::user(text)];
        let response = self
            .provider
            .chat(&messages, &self.settings.model, &self.settings.request)
            .await?;
        Ok(response.content)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
