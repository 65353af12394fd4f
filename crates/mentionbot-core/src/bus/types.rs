//! What travels on the bus: mentions in, replies out.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// A mention addressed to the bot, already stripped of its `<@BOT>` prefix.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Name of the channel that produced it; replies are routed back here.
    pub channel: String,
    pub sender_id: String,
    /// Platform conversation the mention was posted in (Slack channel ID).
    pub chat_id: String,
    /// Key of the conversation thread: the parent `thread_ts`, or the
    /// mention's own `ts` when it starts a thread.
    pub thread_id: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
    /// Raw platform identifiers kept for logging.
    pub metadata: BTreeMap<String, String>,
}

impl InboundMessage {
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        thread_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        InboundMessage {
            channel: channel.into(),
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            thread_id: thread_id.into(),
            content: content.into(),
            received_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// A reply to this mention, posted in the same thread.
    pub fn reply(&self, content: impl Into<String>) -> OutboundMessage {
        OutboundMessage::new(&self.channel, &self.chat_id, content)
            .in_thread(self.thread_id.as_str())
    }
}

/// Text the bot wants posted.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundMessage {
    pub channel: String,
    pub chat_id: String,
    pub content: String,
    /// Parent thread; `None` posts at the top level of `chat_id`.
    pub thread_ts: Option<String>,
}

impl OutboundMessage {
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        OutboundMessage {
            channel: channel.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            thread_ts: None,
        }
    }

    pub fn in_thread(self, thread_ts: impl Into<String>) -> Self {
        OutboundMessage {
            thread_ts: Some(thread_ts.into()),
            ..self
        }
    }
}
