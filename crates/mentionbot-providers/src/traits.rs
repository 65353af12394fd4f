//! The seam between mention handling and the completion API.

use async_trait::async_trait;
use mentionbot_core::types::{LlmResponse, Message};

use crate::error::ProviderError;

/// Sampling knobs sent with a call. Unset fields are omitted from the
/// request body so the API's own defaults apply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmRequestConfig {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Something that turns a conversation into the next assistant message.
///
/// [`crate::HttpProvider`] talks to a real endpoint; tests script their own.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One completion for `messages` (system message first) using `model`.
    /// A failure is returned as-is; callers decide whether to retry.
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, ProviderError>;

    fn default_model(&self) -> &str;

    /// Short label for startup logs.
    fn display_name(&self) -> &str;
}
