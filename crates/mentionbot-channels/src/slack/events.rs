//! Slack Events API ingress: the HTTP endpoint Slack posts events to.
//!
//! Handles the `url_verification` handshake and `event_callback` envelopes
//! carrying `app_mention` events. Mentions are acknowledged with 200 straight
//! away and published to the bus; replies go out later through
//! `chat.postMessage`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use mentionbot_core::bus::queue::MessageBus;
use mentionbot_core::bus::types::InboundMessage;

use crate::formatting::extract_user_text;
use crate::slack::signature::{verify_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER};

// ─────────────────────────────────────────────
// Payload types
// ─────────────────────────────────────────────

/// Outer Events API payload.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event: SlackEvent,
        #[serde(default)]
        event_id: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

/// The `event` object inside an `event_callback`.
#[derive(Debug, Default, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    pub text: Option<String>,
    pub channel: Option<String>,
    pub ts: Option<String>,
    pub thread_ts: Option<String>,
}

impl SlackEvent {
    /// The conversation this event belongs to: the parent thread if the event
    /// is a thread reply, else the event itself.
    pub fn thread_id(&self) -> Option<&str> {
        resolve_thread_id(self.thread_ts.as_deref(), self.ts.as_deref())
    }
}

/// `thread_ts` when present, else `ts`.
pub fn resolve_thread_id<'a>(thread_ts: Option<&'a str>, ts: Option<&'a str>) -> Option<&'a str> {
    thread_ts.filter(|t| !t.is_empty()).or(ts)
}

// ─────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────

/// The bot's own ids, as reported by `auth.test`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: String,
    pub bot_id: Option<String>,
}

/// Shared state for the ingress handlers.
#[derive(Clone)]
pub struct IngressState {
    /// `None` disables signature verification.
    pub signing_secret: Option<String>,
    /// `None` when `auth.test` could not be reached: every bot-authored event
    /// is then dropped, since the bot cannot tell its own posts apart.
    pub identity: Option<BotIdentity>,
    pub bus: Arc<MessageBus>,
}

/// Whether the event was posted by this bot.
pub fn is_own_event(event: &SlackEvent, identity: Option<&BotIdentity>) -> bool {
    let Some(me) = identity else {
        return event.bot_id.is_some();
    };
    let same_bot = me.bot_id.is_some() && event.bot_id == me.bot_id;
    same_bot || event.user.as_deref() == Some(me.user_id.as_str())
}

/// Build the Events API router, mounted at `events_path`.
pub fn router(events_path: &str, state: IngressState) -> Router {
    Router::new()
        .route(events_path, post(handle_events))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;
    info!(method = %method, path = %path, status = response.status().as_u16(), "request");
    response
}

async fn handle_events(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.signing_secret.as_deref() {
        if let Err(e) = check_signature(secret, &headers, &body) {
            warn!(error = %e, "rejected Slack request");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let payload: EventPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "failed to parse Slack payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match payload {
        EventPayload::UrlVerification { challenge } => {
            info!("answering url_verification challenge");
            challenge.into_response()
        }
        EventPayload::EventCallback { event, event_id } => {
            handle_event(&state, event, event_id).await;
            StatusCode::OK.into_response()
        }
        EventPayload::Unsupported => {
            debug!("ignoring unsupported Slack payload type");
            StatusCode::OK.into_response()
        }
    }
}

fn check_signature(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), crate::slack::SlackError> {
    use crate::slack::SlackError;

    let header = |name: &'static str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or(SlackError::MissingHeader(name))
    };
    let timestamp = header(TIMESTAMP_HEADER)?;
    let signature = header(SIGNATURE_HEADER)?;

    verify_signature(
        secret,
        timestamp,
        body,
        signature,
        chrono::Utc::now().timestamp(),
    )
}

/// Turn an `app_mention` into an inbound bus message.
async fn handle_event(state: &IngressState, event: SlackEvent, event_id: Option<String>) {
    if event.event_type != "app_mention" {
        debug!(event_type = %event.event_type, "ignoring non-mention event");
        return;
    }
    if is_own_event(&event, state.identity.as_ref()) {
        debug!("ignoring mention posted by this bot");
        return;
    }

    let (Some(channel), Some(thread_id)) = (event.channel.as_deref(), event.thread_id()) else {
        warn!("app_mention without channel or ts, dropping");
        return;
    };

    let text = extract_user_text(event.text.as_deref().unwrap_or_default());
    let mut msg = InboundMessage::new(
        "slack",
        event.user.clone().unwrap_or_default(),
        channel,
        thread_id,
        text,
    );
    if let Some(ts) = &event.ts {
        msg = msg.with_meta("ts", ts.as_str());
    }
    if let Some(id) = event_id {
        msg = msg.with_meta("event_id", id);
    }

    info!(
        channel = %msg.chat_id,
        thread = %msg.thread_id,
        user = %msg.sender_id,
        "received app_mention"
    );

    if let Err(e) = state.bus.publish_inbound(msg).await {
        error!(error = %e, "failed to publish mention to bus");
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
