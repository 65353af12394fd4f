//! Chat messages exchanged with the completion API, and its answers.

use serde::{Deserialize, Serialize};

/// Who authored a [`Message`]. Serialized as the lowercase role name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a conversation, in the `{"role", "content"}` wire shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Persona instructions; always first in a thread.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A completion that produced text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    /// `stop`, `length`, ... as reported by the API.
    pub finish_reason: Option<String>,
    pub usage: Option<UsageInfo>,
}

/// Token accounting reported alongside a completion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
