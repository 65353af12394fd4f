//! JSON bodies of the `/chat/completions` endpoint.

use serde::{Deserialize, Serialize};

use mentionbot_core::types::{LlmResponse, Message, UsageInfo};

#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl CompletionBody {
    /// Text of the first choice. `None` when there are no choices or the
    /// content is null.
    pub fn first_text(self) -> Option<LlmResponse> {
        let Choice {
            message,
            finish_reason,
        } = self.choices.into_iter().next()?;
        Some(LlmResponse {
            content: message.content?,
            finish_reason,
            usage: self.usage,
        })
    }
}

/// `{"error": {"message": ...}}` sent with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ErrorBody {
    pub fn parse_message(body: &str) -> Option<String> {
        serde_json::from_str::<Self>(body)
            .ok()
            .map(|parsed| parsed.error.message)
    }
}
