//! Mentionbot Agent: turns inbound mentions into replies.
//!
//! This crate contains:
//! - **handler**: `MentionHandler`, the per-mention flow (history → LLM → reply)
//! - **errors**: `MentionError` and the user-facing apology text
//! - **locks**: `ThreadLocks`, one FIFO turn queue per Slack thread
//! - **agent_loop**: `AgentLoop`, the bus consumer that spawns a task per mention
//! - **sweeper**: `IdleSweeper`, periodic idle-thread eviction

pub mod agent_loop;
pub mod errors;
pub mod handler;
pub mod locks;
pub mod sweeper;

pub use agent_loop::AgentLoop;
pub use errors::MentionError;
pub use handler::{HandlerSettings, MentionHandler};
pub use locks::{ThreadGuard, ThreadLocks, Turn};
pub use sweeper::IdleSweeper;
