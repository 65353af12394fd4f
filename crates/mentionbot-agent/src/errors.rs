//! Failures during one mention exchange, and the apology the user sees.

use thiserror::Error;

use mentionbot_core::conversation::ConversationError;
use mentionbot_providers::ProviderError;

/// Prefix of every error reply.
pub const APOLOGY: &str = "ごめんなさい、エラーが発生しました🙏";

const RATE_LIMIT_HINT: &str =
    "\n🔹 利用回数の上限を超えた可能性があります。しばらくしてから再度お試しください。";
const AUTH_HINT: &str = "\n🔹 認証情報に問題があるようです。設定を確認してください。";

#[derive(Debug, Error)]
pub enum MentionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

impl MentionError {
    /// HTTP status of the completion API response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            MentionError::Provider(e) => e.status(),
            MentionError::Conversation(_) => None,
        }
    }

    /// Raw detail shown after `詳細:` for unclassified failures.
    pub fn detail(&self) -> String {
        match self {
            MentionError::Provider(e) => e.detail(),
            MentionError::Conversation(e) => e.to_string(),
        }
    }

    /// The reply posted to the thread for this failure.
    ///
    /// Rate limits and bad credentials get fixed hints; anything else
    /// carries the raw detail.
    pub fn user_message(&self) -> String {
        match self {
            MentionError::Provider(e) if e.is_rate_limited() => format!("{APOLOGY}{RATE_LIMIT_HINT}"),
            MentionError::Provider(e) if e.is_auth_error() => format!("{APOLOGY}{AUTH_HINT}"),
            _ => format!("{APOLOGY}\n🔹 詳細: {}", self.detail()),
        }
    }
}
