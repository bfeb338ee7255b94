//! Best-effort fan-out of delivered messages to live subscribers
//!
//! At-most-once, no replay: a subscriber only sees deliveries that happen
//! while it is subscribed. A subscriber that falls more than the channel
//! capacity behind observes `Lagged` and is dropped by its connection task;
//! publishing never waits on any subscriber.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use kronos_core::DeliveredMessage;

/// Default number of undelivered events a subscriber may lag behind
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new subscriber; events published from now on reach it
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Push a message to every current subscriber.
    ///
    /// Returns how many subscribers it was queued for.
    pub fn publish(&self, message: &DeliveredMessage) -> usize {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize message {} for fan-out: {}", message.id, e);
                return 0;
            }
        };

        // No subscribers is the normal idle case
        match self.tx.send(text) {
            Ok(reached) => {
                debug!("Broadcast message {} to {} subscriber(s)", message.id, reached);
                reached
            }
            Err(_) => 0,
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}
