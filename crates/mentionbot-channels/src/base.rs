//! The `Channel` trait: a chat platform seen from the bot.
//!
//! Ingress runs inside [`Channel::start`] and publishes mentions to the
//! bus. Egress is [`Channel::send`], called once per reply by the
//! [`crate::ChannelManager`] dispatcher.

use async_trait::async_trait;
use mentionbot_core::bus::types::OutboundMessage;

#[async_trait]
pub trait Channel: Send + Sync {
    /// Routing key. Replies whose `OutboundMessage::channel` equals this
    /// name are handed to [`Channel::send`].
    fn name(&self) -> &str;

    /// Serve ingress until [`Channel::stop`] is called.
    async fn start(&self) -> anyhow::Result<()>;

    async fn stop(&self) -> anyhow::Result<()>;

    /// Post one reply. An error here is reported for this reply only.
    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()>;
}
