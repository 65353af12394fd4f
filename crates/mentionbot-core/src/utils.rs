//! Small helpers shared across crates.

use std::path::PathBuf;

/// Directory holding `config.json`: `~/.mentionbot`, or `./.mentionbot`
/// when no home directory is set.
pub fn get_data_path() -> PathBuf {
    ["HOME", "USERPROFILE"]
        .iter()
        .find_map(|key| std::env::var_os(key))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mentionbot")
}

/// Shorten `s` to at most `max_chars` characters for log output, ending
/// with `…` when something was cut.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.char_indices().nth(max_chars).is_none() {
        return s.to_string();
    }
    let end = s
        .char_indices()
        .nth(max_chars.saturating_sub(1))
        .map_or(s.len(), |(idx, _)| idx);
    format!("{}…", &s[..end])
}
