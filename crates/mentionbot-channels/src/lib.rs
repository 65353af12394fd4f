//! Mentionbot Channels: where mentions come in and replies go out.
//!
//! This crate provides:
//! - **base**: The `Channel` trait every channel implements
//! - **manager**: `ChannelManager`: lifecycle orchestration and outbound message routing
//! - **formatting**: mention stripping and message chunking for Slack text
//! - **slack**: Events API HTTP ingress + `chat.postMessage` replies (feature `slack`)

pub mod base;
pub mod formatting;
pub mod manager;

#[cfg(feature = "slack")]
pub mod slack;

pub use base::Channel;
pub use manager::ChannelManager;
