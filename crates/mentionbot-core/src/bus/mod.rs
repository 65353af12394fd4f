//! Message bus: decouples Slack ingress from mention processing.
//!
//! The Slack channel publishes [`types::InboundMessage`]s, the agent loop
//! consumes them and publishes [`types::OutboundMessage`] replies, and the
//! channel manager routes replies back to Slack.

pub mod queue;
pub mod types;

pub use queue::{BusClosed, MessageBus};
pub use types::{InboundMessage, OutboundMessage};
