//! Mentionbot core: shared building blocks for the Slack mention relay.
//!
//! - [`types`]: chat messages and completion results
//! - [`bus`]: async message bus between the Slack channel and the agent
//! - [`config`]: JSON config + env overrides
//! - [`conversation`]: per-thread conversation history with retention
//! - [`utils`]: paths and string helpers

pub mod bus;
pub mod config;
pub mod conversation;
pub mod types;
pub mod utils;
