//! Gateway: wires config into the running bot.
//!
//! Startup sequence:
//! 1. Validate config (credentials present)
//! 2. Create message bus, completion client, conversation store
//! 3. Create mention handler, agent loop, idle sweeper
//! 4. Bind the Slack events listener, register it with the channel manager
//! 5. Run: `tokio::select!` of agent loop + channels + sweeper + Ctrl+C

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use mentionbot_agent::{AgentLoop, HandlerSettings, IdleSweeper, MentionHandler};
use mentionbot_channels::slack::SlackChannel;
use mentionbot_channels::ChannelManager;
use mentionbot_core::bus::queue::MessageBus;
use mentionbot_core::config::Config;
use mentionbot_core::conversation::{
    Clock, ConversationStore, JapaneseDateFormatter, RetentionPolicy, SystemClock, SystemPrompt,
};
use mentionbot_providers::{HttpProvider, LlmProvider};

use crate::helpers;

/// Bus capacity in each direction.
const BUS_CAPACITY: usize = 100;

pub async fn run(config: Config) -> Result<()> {
    config.validate().context("invalid configuration")?;

    let bus = Arc::new(MessageBus::new(BUS_CAPACITY));

    let provider: Arc<dyn LlmProvider> = Arc::new(
        HttpProvider::new(&config.provider).context("failed to create completion client")?,
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let prompt = SystemPrompt::new(
        config.agent.system_prompt.clone(),
        Arc::new(JapaneseDateFormatter::default()),
    );
    let store = Arc::new(ConversationStore::new(
        RetentionPolicy::from(&config.conversation),
        prompt.clone(),
        clock.clone(),
    ));

    let handler = Arc::new(MentionHandler::new(
        provider.clone(),
        store.clone(),
        prompt,
        clock,
        HandlerSettings::from_config(&config),
    ));
    let sweeper = IdleSweeper::new(
        store,
        handler.locks().clone(),
        Duration::from_secs(config.conversation.sweep_interval_secs),
    );
    let agent_loop = AgentLoop::new(bus.clone(), handler);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let slack = SlackChannel::bind(config.slack.clone(), &addr, bus.clone()).await?;

    let mut channel_manager = ChannelManager::new(bus.clone());
    channel_manager.register(Arc::new(slack));

    info!(
        model = provider.default_model(),
        provider = provider.display_name(),
        history = config.agent.history_enabled,
        addr = %addr,
        "gateway starting"
    );
    helpers::print_banner(&config);

    tokio::select! {
        _ = agent_loop.run() => {
            info!("agent loop exited");
        }
        result = channel_manager.start_all() => {
            if let Err(e) = result {
                error!(error = %e, "channel manager error");
            }
        }
        _ = sweeper.start() => {
            info!("idle sweeper exited");
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("  Shutting down...");
            info!("received Ctrl+C, shutting down");
            sweeper.stop();
            channel_manager.stop_all().await;
        }
    }

    println!("  Mentionbot stopped.");
    Ok(())
}
