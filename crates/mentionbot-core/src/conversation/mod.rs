//! Per-thread conversation history.
//!
//! A thread is keyed by its Slack thread timestamp and starts with a single
//! system message carrying the persona and the date the thread was created.
//! History is in-memory only and bounded by a [`RetentionPolicy`].

pub mod clock;
pub mod store;

pub use clock::{Clock, DateFormatter, JapaneseDateFormatter, ManualClock, SystemClock};
pub use store::{ConversationError, ConversationStore, RetentionPolicy, SystemPrompt};
