//! HTTP client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! One request per call, bearer-token auth, no retries. Non-success statuses
//! keep their status code so callers can tell a rate limit from a bad key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, error};

use mentionbot_core::config::schema::ProviderConfig;
use mentionbot_core::types::{LlmResponse, Message};

use crate::error::ProviderError;
use crate::traits::{LlmProvider, LlmRequestConfig};
use crate::wire::{CompletionBody, CompletionRequest, ErrorBody};

/// Used when the config leaves `apiBase` unset or blank.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    default_model: String,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The key stays out of logs.
        f.debug_struct("HttpProvider")
            .field("endpoint", &self.endpoint)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl HttpProvider {
    /// Build a client from the `provider` config section.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let base = match config.api_base.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => base,
            _ => DEFAULT_API_BASE,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpProvider {
            client,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            default_model: config.model.clone(),
        })
    }

    pub fn completions_url(&self) -> &str {
        &self.endpoint
    }
}

/// Message for a failed call: the API's `error.message`, else the raw body,
/// else a line naming the status.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Some(message) = ErrorBody::parse_message(body) {
        return message;
    }
    match body.trim() {
        "" => format!("Request failed with status code {}", status.as_u16()),
        text => text.to_string(),
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, ProviderError> {
        debug!(model, messages = messages.len(), "requesting completion");

        let request = CompletionRequest {
            model,
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .inspect_err(|e| error!(error = %e, "completion request failed"))?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(status, &body);
            error!(status = status.as_u16(), error = %message, "completion API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CompletionBody = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "unreadable completion body");
            ProviderError::Decode(e.to_string())
        })?;
        let answer = parsed.first_text().ok_or(ProviderError::EmptyResponse)?;

        debug!(
            chars = answer.content.chars().count(),
            finish_reason = answer.finish_reason.as_deref().unwrap_or("?"),
            "completion received"
        );
        Ok(answer)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "OpenAI-compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_base: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            api_key: "sk-test-key".into(),
            api_base: api_base.map(String::from),
            ..ProviderConfig::default()
        }
    }

    fn thread() -> Vec<Message> {
        vec![
            Message::system("あなたは丁寧なアシスタントです。"),
            Message::user("こんにちは"),
        ]
    }

    /// Serve `template` for every POST and send one chat call at it.
    async fn call_with(template: ResponseTemplate) -> Result<LlmResponse, ProviderError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(template)
            .mount(&server)
            .await;
        HttpProvider::new(&config(Some(&server.uri())))
            .unwrap()
            .chat(&thread(), "gpt-4o", &LlmRequestConfig::default())
            .await
    }

    #[test]
    fn test_endpoint_from_base() {
        let trailing = HttpProvider::new(&config(Some("http://localhost:8000/v1/"))).unwrap();
        assert_eq!(
            trailing.completions_url(),
            "http://localhost:8000/v1/chat/completions"
        );

        for base in [None, Some("   ")] {
            let provider = HttpProvider::new(&config(base)).unwrap();
            assert_eq!(
                provider.completions_url(),
                "https://api.openai.com/v1/chat/completions"
            );
            assert_eq!(provider.default_model(), "gpt-4o");
        }
    }

    #[test]
    fn test_error_message_sources() {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(error_message(status, r#"{"error":{"message":"boom"}}"#), "boom");
        assert_eq!(error_message(status, " upstream exploded\n"), "upstream exploded");
        assert_eq!(error_message(status, ""), "Request failed with status code 500");
    }

    #[tokio::test]
    async fn test_sends_bearer_and_thread() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 256,
                "messages": [
                    {"role": "system", "content": "あなたは丁寧なアシスタントです。"},
                    {"role": "user", "content": "こんにちは"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "こんにちは！"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let knobs = LlmRequestConfig {
            max_tokens: Some(256),
            temperature: None,
        };
        let answer = HttpProvider::new(&config(Some(&server.uri())))
            .unwrap()
            .chat(&thread(), "gpt-4o-mini", &knobs)
            .await
            .unwrap();

        assert_eq!(answer.content, "こんにちは！");
        assert_eq!(answer.usage.map(|u| u.total_tokens), Some(15));

        let sent = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_keeps_status() {
        let err = call_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached for gpt-4o", "type": "requests"}
        })))
        .await
        .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(
            err,
            ProviderError::Api {
                status: 429,
                message: "Rate limit reached for gpt-4o".into()
            }
        );
    }

    #[tokio::test]
    async fn test_bad_key_keeps_status() {
        let err = call_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .await
        .unwrap_err();

        assert!(err.is_auth_error());
        assert_eq!(err.detail(), "Incorrect API key provided");
    }

    #[tokio::test]
    async fn test_gateway_error_keeps_raw_body() {
        let err = call_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert_eq!(err.detail(), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_unusable_success_bodies() {
        let empty = call_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .await
            .unwrap_err();
        assert_eq!(empty, ProviderError::EmptyResponse);

        let garbage = call_with(ResponseTemplate::new(200).set_body_string("not json"))
            .await
            .unwrap_err();
        assert!(matches!(garbage, ProviderError::Decode(_)));
        assert_eq!(garbage.status(), None);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let err = HttpProvider::new(&config(Some("http://127.0.0.1:1/v1")))
            .unwrap()
            .chat(&thread(), "gpt-4o", &LlmRequestConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Transport(_)));
        assert_eq!(err.status(), None);
    }
}
