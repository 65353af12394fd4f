//! Agent loop: drains inbound mentions and publishes replies.
//!
//! Every mention runs in its own task so a slow LLM call in one thread never
//! holds up another. Each mention's turn in its thread is reserved before
//! its task is spawned, so a thread's mentions run in arrival order.

use std::sync::Arc;

use tracing::{debug, error, info};

use mentionbot_core::bus::queue::MessageBus;
use mentionbot_core::utils::truncate_string;

use crate::handler::MentionHandler;

pub struct AgentLoop {
    bus: Arc<MessageBus>,
    handler: Arc<MentionHandler>,
}

impl AgentLoop {
    pub fn new(bus: Arc<MessageBus>, handler: Arc<MentionHandler>) -> Self {
        Self { bus, handler }
    }

    pub fn handler(&self) -> &Arc<MentionHandler> {
        &self.handler
    }

    /// Run until the inbound side of the bus closes.
    pub async fn run(&self) {
        info!("agent loop started, waiting for mentions");

        while let Some(msg) = self.bus.consume_inbound().await {
            debug!(
                thread = %msg.thread_id,
                chat_id = %msg.chat_id,
                text = %truncate_string(&msg.content, 60),
                "received mention"
            );

            // Reserved here, in arrival order, before the task is scheduled.
            let turn = self.handler.reserve(&msg);
            let bus = self.bus.clone();
            let handler = self.handler.clone();
            tokio::spawn(async move {
                let reply = handler.handle_in_turn(&msg, turn).await;
                if let Err(e) = bus.publish_outbound(reply).await {
                    error!(thread = %msg.thread_id, error = %e, "failed to publish reply");
                }
            });
        }

        info!("inbound channel closed, agent loop exiting");
    }
}
