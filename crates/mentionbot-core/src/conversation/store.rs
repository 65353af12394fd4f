//! In-memory conversation store keyed by Slack thread timestamp.
//!
//! Thread-safe via `RwLock`. Lives for the process lifetime; nothing is
//! persisted.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use super::clock::{Clock, DateFormatter};
use crate::config::schema::ConversationConfig;
use crate::types::{Message, Role};

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    /// `append` was called before `get_or_create` for this thread.
    #[error("unknown conversation thread: {0}")]
    UnknownThread(String),
}

// ─────────────────────────────────────────────
// Retention policy
// ─────────────────────────────────────────────

/// How much history a thread may keep and for how long.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Max non-system messages per thread. `0` means unbounded.
    pub max_messages: usize,
    /// Threads idle longer than this are evicted. `None` keeps them forever.
    pub idle_ttl: Option<chrono::Duration>,
}

impl RetentionPolicy {
    /// No cap and no eviction.
    pub fn unbounded() -> Self {
        Self {
            max_messages: 0,
            idle_ttl: None,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from(&ConversationConfig::default())
    }
}

impl From<&ConversationConfig> for RetentionPolicy {
    fn from(cfg: &ConversationConfig) -> Self {
        let idle_ttl = (cfg.idle_ttl_secs > 0)
            .then(|| chrono::Duration::seconds(cfg.idle_ttl_secs.min(i64::MAX as u64) as i64));
        Self {
            max_messages: cfg.max_messages,
            idle_ttl,
        }
    }
}

// ─────────────────────────────────────────────
// System prompt
// ─────────────────────────────────────────────

/// Persona template rendered into the first message of every thread.
///
/// The literal `{date}` in the template is replaced with the formatted date.
#[derive(Clone)]
pub struct SystemPrompt {
    template: String,
    formatter: Arc<dyn DateFormatter>,
}

impl SystemPrompt {
    pub fn new(template: impl Into<String>, formatter: Arc<dyn DateFormatter>) -> Self {
        Self {
            template: template.into(),
            formatter,
        }
    }

    /// Build the system message as of `at`.
    pub fn render_at(&self, at: DateTime<Utc>) -> Message {
        let date = self.formatter.format(at);
        Message::system(self.template.replace("{date}", &date))
    }
}

impl std::fmt::Debug for SystemPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPrompt")
            .field("template", &self.template)
            .finish()
    }
}

// ─────────────────────────────────────────────
// ConversationStore
// ─────────────────────────────────────────────

#[derive(Clone, Debug)]
struct ConversationThread {
    messages: Vec<Message>,
    last_active: DateTime<Utc>,
}

/// Thread-id → ordered message history.
pub struct ConversationStore {
    threads: RwLock<HashMap<String, ConversationThread>>,
    policy: RetentionPolicy,
    prompt: SystemPrompt,
    clock: Arc<dyn Clock>,
}

impl ConversationStore {
    pub fn new(policy: RetentionPolicy, prompt: SystemPrompt, clock: Arc<dyn Clock>) -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            policy,
            prompt,
            clock,
        }
    }

    /// Get the history for `thread_id`, creating it with a dated system
    /// message if it does not exist yet.
    ///
    /// The date is frozen at creation; later calls return the same system
    /// message even across a date boundary.
    pub fn get_or_create(&self, thread_id: &str) -> Vec<Message> {
        {
            let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(thread) = threads.get(thread_id) {
                return thread.messages.clone();
            }
        }

        let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
        // Another task may have created it between the two locks.
        let thread = threads.entry(thread_id.to_string()).or_insert_with(|| {
            let now = self.clock.now();
            debug!(thread = %thread_id, "creating conversation thread");
            ConversationThread {
                messages: vec![self.prompt.render_at(now)],
                last_active: now,
            }
        });
        thread.messages.clone()
    }

    /// Append `message` to an existing thread, enforcing the message cap.
    pub fn append(&self, thread_id: &str, message: Message) -> Result<(), ConversationError> {
        let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
        let thread = threads
            .get_mut(thread_id)
            .ok_or_else(|| ConversationError::UnknownThread(thread_id.to_string()))?;

        thread.messages.push(message);
        thread.last_active = self.clock.now();

        let dropped = enforce_cap(&mut thread.messages, self.policy.max_messages);
        if dropped > 0 {
            debug!(thread = %thread_id, dropped, "trimmed conversation history");
        }
        Ok(())
    }

    /// Read a thread's history without creating it.
    pub fn history(&self, thread_id: &str) -> Option<Vec<Message>> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        threads.get(thread_id).map(|t| t.messages.clone())
    }

    /// Drop a thread. Returns `true` if it existed.
    pub fn remove(&self, thread_id: &str) -> bool {
        let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
        threads.remove(thread_id).is_some()
    }

    /// Evict every thread idle for longer than the policy's TTL.
    ///
    /// Returns the number of evicted threads.
    pub fn evict_idle(&self) -> usize {
        let Some(ttl) = self.policy.idle_ttl else {
            return 0;
        };
        let now = self.clock.now();

        let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
        let before = threads.len();
        threads.retain(|_, t| now.signed_duration_since(t.last_active) <= ttl);
        before - threads.len()
    }

    /// Ids of all live threads, sorted.
    pub fn thread_ids(&self) -> Vec<String> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = threads.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.threads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }
}

/// Drop the oldest non-system messages until at most `max` remain.
///
/// Also drops assistant messages left dangling at the front so the kept
/// history never opens with a reply to a question that was trimmed away.
/// Returns how many messages were removed.
fn enforce_cap(messages: &mut Vec<Message>, max: usize) -> usize {
    if max == 0 {
        return 0;
    }
    let start = usize::from(matches!(messages.first(), Some(m) if m.role() == Role::System));
    let body = messages.len() - start;
    if body <= max {
        return 0;
    }

    let mut end = start + (body - max);
    while end < messages.len() && messages[end].role() == Role::Assistant {
        end += 1;
    }
    messages.drain(start..end);
    end - start
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::clock::{JapaneseDateFormatter, ManualClock};
    use chrono::{Duration, FixedOffset, TimeZone};

    const TEMPLATE: &str = "あなたは丁寧なアシスタントです。\n今日は{date}です。";

    fn start() -> DateTime<Utc> {
        // 2026-10-16 09:00 JST
        Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
    }

    fn make_store(policy: RetentionPolicy) -> (ConversationStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let formatter = Arc::new(JapaneseDateFormatter::new(
            FixedOffset::east_opt(9 * 3600).unwrap(),
        ));
        let store = ConversationStore::new(
            policy,
            SystemPrompt::new(TEMPLATE, formatter),
            clock.clone(),
        );
        (store, clock)
    }

    fn roles(messages: &[Message]) -> Vec<Role> {
        messages.iter().map(Message::role).collect()
    }

    #[test]
    fn test_new_thread_starts_with_dated_system_message() {
        let (store, _clock) = make_store(RetentionPolicy::unbounded());
        let messages = store.get_or_create("1700000000.000100");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role(), Role::System);
        assert!(messages[0].content().contains("2026年10月16日"));
        assert!(messages[0].content().starts_with("あなたは丁寧なアシスタントです。"));
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let (store, _clock) = make_store(RetentionPolicy::unbounded());
        let first = store.get_or_create("t1");
        let second = store.get_or_create("t1");

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_date_frozen_at_creation() {
        let (store, clock) = make_store(RetentionPolicy::unbounded());
        store.get_or_create("t1");
        clock.advance(Duration::days(3));

        let messages = store.get_or_create("t1");
        assert!(messages[0].content().contains("2026年10月16日"));

        let fresh = store.get_or_create("t2");
        assert!(fresh[0].content().contains("2026年10月19日"));
    }

    #[test]
    fn test_append_preserves_order() {
        let (store, _clock) = make_store(RetentionPolicy::unbounded());
        store.get_or_create("t1");
        for i in 0..3 {
            store.append("t1", Message::user(format!("q{i}"))).unwrap();
            store.append("t1", Message::assistant(format!("a{i}"))).unwrap();
        }

        let messages = store.history("t1").unwrap();
        assert_eq!(messages.len(), 1 + 2 * 3);
        assert_eq!(
            roles(&messages),
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
            ]
        );
        assert_eq!(messages[5].content(), "q2");
    }

    #[test]
    fn test_append_unknown_thread() {
        let (store, _clock) = make_store(RetentionPolicy::unbounded());
        let err = store.append("missing", Message::user("hi")).unwrap_err();
        assert_eq!(err, ConversationError::UnknownThread("missing".into()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_threads_are_independent() {
        let (store, _clock) = make_store(RetentionPolicy::unbounded());
        store.get_or_create("a");
        store.get_or_create("b");
        store.append("a", Message::user("hello a")).unwrap();

        assert_eq!(store.history("a").unwrap().len(), 2);
        assert_eq!(store.history("b").unwrap().len(), 1);
        assert_eq!(store.thread_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_history_does_not_create() {
        let (store, _clock) = make_store(RetentionPolicy::unbounded());
        assert!(store.history("nope").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_cap_keeps_system_and_latest_exchanges() {
        let policy = RetentionPolicy {
            max_messages: 4,
            idle_ttl: None,
        };
        let (store, _clock) = make_store(policy);
        store.get_or_create("t1");
        for i in 0..5 {
            store.append("t1", Message::user(format!("q{i}"))).unwrap();
            store.append("t1", Message::assistant(format!("a{i}"))).unwrap();
        }

        let messages = store.history("t1").unwrap();
        assert_eq!(messages.len(), 1 + 4);
        assert_eq!(messages[0].role(), Role::System);
        let contents: Vec<&str> = messages[1..].iter().map(Message::content).collect();
        assert_eq!(contents, vec!["q3", "a3", "q4", "a4"]);
    }

    #[test]
    fn test_cap_never_leaves_leading_assistant() {
        let policy = RetentionPolicy {
            max_messages: 3,
            idle_ttl: None,
        };
        let (store, _clock) = make_store(policy);
        store.get_or_create("t1");
        store.append("t1", Message::user("q0")).unwrap();
        store.append("t1", Message::assistant("a0")).unwrap();
        store.append("t1", Message::user("q1")).unwrap();
        store.append("t1", Message::assistant("a1")).unwrap();

        let messages = store.history("t1").unwrap();
        assert_eq!(
            roles(&messages),
            vec![Role::System, Role::User, Role::Assistant]
        );
        assert_eq!(messages[1].content(), "q1");
    }

    #[test]
    fn test_evict_idle_threads() {
        let policy = RetentionPolicy {
            max_messages: 0,
            idle_ttl: Some(Duration::hours(1)),
        };
        let (store, clock) = make_store(policy);
        store.get_or_create("old");
        clock.advance(Duration::minutes(45));
        store.get_or_create("new");
        clock.advance(Duration::minutes(30));

        assert_eq!(store.evict_idle(), 1);
        assert_eq!(store.thread_ids(), vec!["new"]);
    }

    #[test]
    fn test_append_refreshes_activity() {
        let policy = RetentionPolicy {
            max_messages: 0,
            idle_ttl: Some(Duration::hours(1)),
        };
        let (store, clock) = make_store(policy);
        store.get_or_create("t1");
        clock.advance(Duration::minutes(50));
        store.append("t1", Message::user("still here")).unwrap();
        clock.advance(Duration::minutes(50));

        assert_eq!(store.evict_idle(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_evict_disabled_without_ttl() {
        let (store, clock) = make_store(RetentionPolicy::unbounded());
        store.get_or_create("t1");
        clock.advance(Duration::days(365));
        assert_eq!(store.evict_idle(), 0);
    }

    #[test]
    fn test_remove() {
        let (store, _clock) = make_store(RetentionPolicy::unbounded());
        store.get_or_create("t1");
        assert!(store.remove("t1"));
        assert!(!store.remove("t1"));
    }

    #[test]
    fn test_policy_from_config() {
        let cfg = ConversationConfig {
            max_messages: 10,
            idle_ttl_secs: 0,
            sweep_interval_secs: 60,
        };
        let policy = RetentionPolicy::from(&cfg);
        assert_eq!(policy.max_messages, 10);
        assert!(policy.idle_ttl.is_none());

        let default = RetentionPolicy::default();
        assert_eq!(default.idle_ttl, Some(Duration::hours(24)));
    }
}
