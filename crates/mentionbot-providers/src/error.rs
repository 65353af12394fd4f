//! Completion gateway errors.

use thiserror::Error;

/// Why a completion call failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The API answered with a non-success status.
    ///
    /// `message` is the provider's `error.message` when the body is an
    /// OpenAI-style error envelope, otherwise the raw body.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never got an HTTP response (DNS, connect, timeout, …).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not a valid chat completion.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The response had no choice with text content.
    #[error("no choices in response")]
    EmptyResponse,
}

impl ProviderError {
    /// HTTP status code, when the failure came from the API itself.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    pub fn is_auth_error(&self) -> bool {
        self.status() == Some(401)
    }

    /// The most specific human-readable detail available.
    pub fn detail(&self) -> String {
        match self {
            ProviderError::Api { message, .. } => message.clone(),
            ProviderError::Transport(msg) | ProviderError::Decode(msg) => msg.clone(),
            ProviderError::EmptyResponse => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}
