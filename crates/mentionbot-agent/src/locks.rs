//! Per-thread turn queues: one FIFO line per Slack thread.
//!
//! [`ThreadLocks::enqueue`] hands out a [`Turn`] synchronously, so the order
//! of `enqueue` calls is the order in which a thread's mentions run, however
//! the tasks holding the turns are scheduled. Other threads are unaffected.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

#[derive(Debug, Default)]
pub struct ThreadLocks {
    /// Per thread, the release signal of the last turn handed out.
    tails: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

/// A reserved place in a thread's line. Await [`Turn::wait`] to run.
#[derive(Debug)]
pub struct Turn {
    ahead: Option<oneshot::Receiver<()>>,
    release: Option<oneshot::Sender<()>>,
}

/// Exclusive access to a thread. The next turn starts when this drops.
#[derive(Debug)]
pub struct ThreadGuard {
    _release: Option<oneshot::Sender<()>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next place in `thread_id`'s line without waiting.
    pub fn enqueue(&self, thread_id: &str) -> Turn {
        let (release, tail) = oneshot::channel();
        let mut tails = self.tails.lock().unwrap_or_else(PoisonError::into_inner);
        let ahead = tails.insert(thread_id.to_string(), tail);
        Turn {
            ahead,
            release: Some(release),
        }
    }

    /// Queue up and wait for exclusive access to `thread_id`.
    pub async fn lock(&self, thread_id: &str) -> ThreadGuard {
        self.enqueue(thread_id).wait().await
    }

    /// Drop lines whose last turn has finished. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut tails = self.tails.lock().unwrap_or_else(PoisonError::into_inner);
        let before = tails.len();
        tails.retain(|_, tail| matches!(tail.try_recv(), Err(TryRecvError::Empty)));
        before - tails.len()
    }

    pub fn len(&self) -> usize {
        self.tails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Turn {
    /// Wait until every earlier turn of the thread has been released.
    pub async fn wait(mut self) -> ThreadGuard {
        if let Some(ahead) = self.ahead.as_mut() {
            // Err means the turn ahead was dropped, which also releases it.
            let _ = ahead.await;
        }
        self.ahead = None;
        ThreadGuard {
            _release: self.release.take(),
        }
    }
}

impl Drop for Turn {
    /// An abandoned turn hands over only after the turn ahead of it is done,
    /// so the line behind it stays serialized.
    fn drop(&mut self) {
        let (Some(ahead), Some(release)) = (self.ahead.take(), self.release.take()) else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                let _ = ahead.await;
                drop(release);
            });
        }
    }
}
