//! Bounded async queues between the Slack channel and the agent loop.

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use super::types::{InboundMessage, OutboundMessage};

/// The receiving side of a queue has been dropped.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("message bus closed")]
pub struct BusClosed;

/// One direction of the bus: many producers, one consumer at a time.
struct Lane<T> {
    tx: mpsc::Sender<T>,
    rx: Mutex<mpsc::Receiver<T>>,
}

impl<T> Lane<T> {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Waits while the lane is full.
    async fn push(&self, item: T) -> Result<(), BusClosed> {
        self.tx.send(item).await.map_err(|_| BusClosed)
    }

    async fn pop(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

/// Mentions flow in on `inbound`, replies flow out on `outbound`.
///
/// The Slack ingress publishes inbound, the agent loop consumes inbound and
/// publishes outbound, the channel manager consumes outbound.
pub struct MessageBus {
    inbound: Lane<InboundMessage>,
    outbound: Lane<OutboundMessage>,
}

impl MessageBus {
    /// `capacity` bounds each direction separately.
    pub fn new(capacity: usize) -> Self {
        MessageBus {
            inbound: Lane::new(capacity),
            outbound: Lane::new(capacity),
        }
    }

    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<(), BusClosed> {
        self.inbound.push(msg).await
    }

    /// Next mention, waiting until one arrives.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        self.inbound.pop().await
    }

    pub async fn publish_outbound(&self, msg: OutboundMessage) -> Result<(), BusClosed> {
        self.outbound.push(msg).await
    }

    /// Next reply, waiting until one arrives.
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        self.outbound.pop().await
    }
}
