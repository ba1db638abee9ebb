//! Domain event system — decoupled notification of pipeline results.
//!
//! The orchestrator publishes an event whenever a new artifact becomes
//! available. Consumers subscribe and receive a [`Subscription`] handle; the
//! subscription is released when the handle is dropped or explicitly
//! unsubscribed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A scene description was refined into an image prompt.
    PromptComposed {
        composed_input: String,
        generated_prompt: String,
        timestamp: DateTime<Utc>,
    },

    /// A new image was saved. Subscribers re-read the published reference
    /// from shared state.
    ImageAvailable { timestamp: DateTime<Utc> },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_id: AtomicU64::new(1),
        }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(subscription = id, "Event subscriber registered");
        Subscription {
            id,
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Handle returned by [`EventBus::subscribe`].
pub struct Subscription {
    id: u64,
    receiver: broadcast::Receiver<Arc<DomainEvent>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event.
    ///
    /// Lagged subscribers skip the dropped events and keep receiving.
    /// Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Arc<DomainEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(subscription = self.id, skipped, "Subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Release the subscription.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(subscription = self.id, "Event subscriber released");
    }
}
