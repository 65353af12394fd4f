//! Slack text helpers: leading-mention stripping and reply chunking.

use std::sync::LazyLock;

use regex::Regex;

/// Slack message length limit for `chat.postMessage`, in characters.
pub const SLACK_MAX_LEN: usize = 4000;

/// A Slack user mention token plus the whitespace after it.
static MENTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@[^>]+>\s*").expect("Invalid mention regex"));

/// Remove the first `<@…>` mention token and the whitespace right after it.
///
/// Only the first occurrence is removed, wherever it sits; later mentions
/// stay verbatim. Text without a mention is returned unchanged.
pub fn extract_user_text(text: &str) -> String {
    MENTION_REGEX.replace(text, "").into_owned()
}

/// Split a message into chunks of at most `max_chars` characters.
///
/// Prefers to break at the last newline inside the window; the newline
/// itself is dropped. Never splits inside a UTF-8 character.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        let limit = match remaining.char_indices().nth(max_chars) {
            Some((idx, _)) => idx,
            None => {
                chunks.push(remaining.to_string());
                break;
            }
        };

        let split_at = match remaining[..limit].rfind('\n') {
            Some(0) | None => limit,
            Some(idx) => idx,
        };

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk.to_string());
        remaining = rest.strip_prefix('\n').unwrap_or(rest);

        if remaining.is_empty() {
            break;
        }
    }

    chunks
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
