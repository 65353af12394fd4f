//! Idle sweeper: periodically evicts quiet threads and their lock entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info};

use mentionbot_core::conversation::ConversationStore;

use crate::locks::ThreadLocks;

pub struct IdleSweeper {
    store: Arc<ConversationStore>,
    locks: Arc<ThreadLocks>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl IdleSweeper {
    pub fn new(store: Arc<ConversationStore>, locks: Arc<ThreadLocks>, interval: Duration) -> Self {
        Self {
            store,
            locks,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Tick every `interval` until [`IdleSweeper::stop`] is called.
    ///
    /// With no idle TTL or a zero interval it only waits for `stop()`.
    pub async fn start(&self) {
        if self.store.policy().idle_ttl.is_none() || self.interval.is_zero() {
            info!("idle eviction disabled");
            self.shutdown.notified().await;
            return;
        }

        info!(interval_s = self.interval.as_secs(), "idle sweeper started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.tick();
                }
                _ = self.shutdown.notified() => {
                    info!("idle sweeper shutting down");
                    return;
                }
            }
        }
    }

    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    /// One sweep: evict idle threads, then drop unused locks.
    /// Returns `(threads_evicted, locks_pruned)`.
    pub fn tick(&self) -> (usize, usize) {
        let evicted = self.store.evict_idle();
        let pruned = self.locks.prune();
        if evicted > 0 {
            info!(evicted, remaining = self.store.len(), "evicted idle threads");
        } else {
            debug!(pruned, "sweep: nothing idle");
        }
        (evicted, pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mentionbot_core::conversation::{
        JapaneseDateFormatter, ManualClock, RetentionPolicy, SystemPrompt,
    };

    fn store_with(clock: Arc<ManualClock>, idle_ttl: Option<chrono::Duration>) -> Arc<ConversationStore> {
        let prompt = SystemPrompt::new("{date}", Arc::new(JapaneseDateFormatter::default()));
        Arc::new(ConversationStore::new(
            RetentionPolicy {
                max_messages: 40,
                idle_ttl,
            },
            prompt,
            clock,
        ))
    }

    #[tokio::test]
    async fn test_tick_evicts_idle_threads_and_locks() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = store_with(clock.clone(), Some(chrono::Duration::hours(24)));
        let locks = Arc::new(ThreadLocks::new());

        store.get_or_create("old");
        drop(locks.lock("old").await);
        clock.advance(chrono::Duration::hours(23));
        store.get_or_create("fresh");
        clock.advance(chrono::Duration::hours(2));

        let sweeper = IdleSweeper::new(store.clone(), locks.clone(), Duration::from_secs(300));
        assert_eq!(sweeper.tick(), (1, 1));
        assert_eq!(store.thread_ids(), vec!["fresh".to_string()]);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_sweeper_parks_until_stopped() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sweeper = IdleSweeper::new(
            store_with(clock, None),
            Arc::new(ThreadLocks::new()),
            Duration::from_secs(300),
        );

        let parked = tokio::time::timeout(Duration::from_millis(50), sweeper.start()).await;
        assert!(parked.is_err());

        sweeper.stop();
        tokio::time::timeout(Duration::from_secs(1), sweeper.start())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_ends_loop() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sweeper = Arc::new(IdleSweeper::new(
            store_with(clock, Some(chrono::Duration::hours(1))),
            Arc::new(ThreadLocks::new()),
            Duration::from_secs(300),
        ));

        let runner = sweeper.clone();
        let handle = tokio::spawn(async move { runner.start().await });
        sweeper.stop();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
