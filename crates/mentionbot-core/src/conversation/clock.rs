//! Time sources and date rendering for system prompts.

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, Utc, Weekday};

/// A source of "now". Injected so tests can freeze and advance time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Renders a calendar date for the system prompt.
pub trait DateFormatter: Send + Sync {
    fn format(&self, at: DateTime<Utc>) -> String;
}

/// Japanese long-form date with weekday, e.g. `2026年10月16日金曜日`.
#[derive(Clone, Copy, Debug)]
pub struct JapaneseDateFormatter {
    offset: FixedOffset,
}

impl JapaneseDateFormatter {
    /// Render dates in the given UTC offset.
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Default for JapaneseDateFormatter {
    /// Render dates in the host's local offset.
    fn default() -> Self {
        Self::new(*Local::now().offset())
    }
}

impl DateFormatter for JapaneseDateFormatter {
    fn format(&self, at: DateTime<Utc>) -> String {
        let local = at.with_timezone(&self.offset);
        format!(
            "{}年{}月{}日{}",
            local.year(),
            local.month(),
            local.day(),
            japanese_weekday(local.weekday())
        )
    }
}

fn japanese_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "月曜日",
        Weekday::Tue => "火曜日",
        Weekday::Wed => "水曜日",
        Weekday::Thu => "木曜日",
        Weekday::Fri => "金曜日",
        Weekday::Sat => "土曜日",
        Weekday::Sun => "日曜日",
    }
}
