//! Completion gateway for Mentionbot.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`]: trait the mention handler calls
//! - [`http_provider::HttpProvider`]: OpenAI-compatible `/chat/completions` client
//! - [`error::ProviderError`]: typed failures (HTTP status vs. transport)

pub mod error;
pub mod http_provider;
pub mod traits;
mod wire;

pub use error::ProviderError;
pub use http_provider::HttpProvider;
pub use traits::{LlmProvider, LlmRequestConfig};
