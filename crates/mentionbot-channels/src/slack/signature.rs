//! Slack request signing (`X-Slack-Signature`).
//!
//! `v0=` + hex(HMAC-SHA256(signing_secret, "v0:{timestamp}:{body}")), with the
//! timestamp required to be within five minutes of now.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Maximum allowed clock skew between Slack and us, in seconds.
pub const MAX_SKEW_SECS: i64 = 300;

/// Why a request was rejected or a Slack Web API call failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlackError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("invalid request timestamp")]
    InvalidTimestamp,

    #[error("request timestamp is {0}s away from now")]
    StaleTimestamp(i64),

    #[error("signature mismatch")]
    BadSignature,

    #[error("Slack API error: {0}")]
    Api(String),
}

/// Check a request against the app's signing secret.
///
/// `now` is the current unix time in seconds.
pub fn verify_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<(), SlackError> {
    let ts: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SlackError::InvalidTimestamp)?;

    let skew = (now - ts).abs();
    if skew > MAX_SKEW_SECS {
        return Err(SlackError::StaleTimestamp(skew));
    }

    let provided = signature
        .strip_prefix("v0=")
        .and_then(|h| hex::decode(h).ok())
        .ok_or(SlackError::BadSignature)?;

    let mut mac = signer(secret, timestamp);
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| SlackError::BadSignature)
}

/// Compute the `X-Slack-Signature` value for a body.
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = signer(secret, timestamp);
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

fn signer(secret: &str, timestamp: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const BODY: &[u8] = br#"{"type":"url_verification","challenge":"abc"}"#;

    #[test]
    fn test_accepts_valid_signature() {
        let sig = sign(SECRET, "1700000000", BODY);
        assert!(sig.starts_with("v0="));
        assert_eq!(sig.len(), 3 + 64);
        assert_eq!(
            verify_signature(SECRET, "1700000000", BODY, &sig, 1_700_000_100),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let sig = sign("other-secret", "1700000000", BODY);
        assert_eq!(
            verify_signature(SECRET, "1700000000", BODY, &sig, 1_700_000_000),
            Err(SlackError::BadSignature)
        );
    }

    #[test]
    fn test_rejects_tampered_body() {
        let sig = sign(SECRET, "1700000000", BODY);
        assert_eq!(
            verify_signature(SECRET, "1700000000", b"{}", &sig, 1_700_000_000),
            Err(SlackError::BadSignature)
        );
    }

    #[test]
    fn test_rejects_stale_timestamp() {
        let sig = sign(SECRET, "1700000000", BODY);
        assert_eq!(
            verify_signature(SECRET, "1700000000", BODY, &sig, 1_700_000_301),
            Err(SlackError::StaleTimestamp(301))
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(
            verify_signature(SECRET, "yesterday", BODY, "v0=00", 0),
            Err(SlackError::InvalidTimestamp)
        );
        assert_eq!(
            verify_signature(SECRET, "1700000000", BODY, "v1=zz", 1_700_000_000),
            Err(SlackError::BadSignature)
        );
    }
}
