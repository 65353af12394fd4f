//! Channel Manager: runs channel listeners and routes replies.
//!
//! Every registered channel gets its own listener task. A single outbound
//! dispatcher drains the bus and hands each reply to the channel it names.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use mentionbot_core::bus::queue::MessageBus;
use mentionbot_core::bus::types::OutboundMessage;

use crate::base::Channel;

type Routes = BTreeMap<String, Arc<dyn Channel>>;

// ─────────────────────────────────────────────
// ChannelManager
// ─────────────────────────────────────────────

pub struct ChannelManager {
    routes: Routes,
    bus: Arc<MessageBus>,
    shutdown: Arc<Notify>,
}

impl ChannelManager {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self {
            routes: Routes::new(),
            bus,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Add a channel under its own name. A later channel with the same name
    /// takes over its replies.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        if self.routes.insert(name.clone(), channel).is_some() {
            warn!(channel = %name, "replaced previously registered channel");
        } else {
            info!(channel = %name, "registered channel");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Channel>> {
        self.routes.get(name)
    }

    /// Registered channel names in sorted order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Launch listeners and the dispatcher, then park until shutdown.
    ///
    /// Returns immediately when nothing is registered.
    pub async fn start_all(&self) -> Result<()> {
        if self.routes.is_empty() {
            warn!("no channels registered, nothing to start");
            return Ok(());
        }
        info!(channels = ?self.channel_names(), "starting channels");

        for channel in self.routes.values().cloned() {
            tokio::spawn(async move {
                match channel.start().await {
                    Ok(()) => info!(channel = channel.name(), "channel listener exited"),
                    Err(e) => error!(channel = channel.name(), error = %e, "channel listener failed"),
                }
            });
        }

        let dispatcher = Dispatcher {
            bus: self.bus.clone(),
            routes: self.routes.clone(),
            shutdown: self.shutdown.clone(),
        };
        tokio::spawn(dispatcher.run());

        self.shutdown.notified().await;
        info!("channel manager shutting down");
        Ok(())
    }

    /// Signal shutdown, then stop each channel in turn.
    pub async fn stop_all(&self) {
        self.signal_shutdown();
        for (name, channel) in &self.routes {
            debug!(channel = %name, "stopping channel");
            if let Err(e) = channel.stop().await {
                error!(channel = %name, error = %e, "channel stop failed");
            }
        }
        info!("all channels stopped");
    }

    pub fn signal_shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

// ─────────────────────────────────────────────
// Outbound dispatcher
// ─────────────────────────────────────────────

struct Dispatcher {
    bus: Arc<MessageBus>,
    routes: Routes,
    shutdown: Arc<Notify>,
}

impl Dispatcher {
    /// Drain replies until the bus closes or shutdown fires.
    async fn run(self) {
        debug!("outbound dispatcher started");
        loop {
            let next = tokio::select! {
                msg = self.bus.consume_outbound() => msg,
                _ = self.shutdown.notified() => {
                    debug!("outbound dispatcher stopping");
                    return;
                }
            };
            match next {
                Some(reply) => self.deliver(&reply).await,
                None => {
                    info!("outbound bus closed, dispatcher exiting");
                    return;
                }
            }
        }
    }

    /// A failed send is logged and the next reply is still delivered.
    async fn deliver(&self, reply: &OutboundMessage) {
        let Some(channel) = self.routes.get(&reply.channel) else {
            warn!(channel = %reply.channel, "dropping reply for unknown channel");
            return;
        };

        debug!(
            channel = %reply.channel,
            chat_id = %reply.chat_id,
            thread = reply.thread_ts.as_deref().unwrap_or("-"),
            chars = reply.content.chars().count(),
            "dispatching reply"
        );

        if let Err(e) = channel.send(reply).await {
            error!(
                channel = %reply.channel,
                chat_id = %reply.chat_id,
                error = %e,
                "failed to send reply"
            );
        }
    }
}
