//! Live item events and the in-process broadcaster
//!
//! The [`EventBroadcaster`] owns a registry of subscriber sinks. Every sink has
//! its own bounded queue; publishing only ever `try_send`s into those queues, so
//! a publisher never waits on a slow viewer.
//!
//! Overflow policy: a subscriber whose queue is full is disconnected (removed
//! from the registry). It still receives what is already queued, then its
//! stream ends and the client is expected to reconnect.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default per-subscriber queue depth
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Payload pushed to viewers when an item is added
///
/// Serialized as the minimal `{id, name, price}` projection of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEvent {
    pub id: String,
    pub name: String,
    pub price: f64,
}

#[derive(Default)]
struct Sinks {
    senders: HashMap<Uuid, mpsc::Sender<String>>,
    /// Set by `shutdown`; no sink is registered afterwards
    closed: bool,
}

struct Registry {
    sinks: Mutex<Sinks>,
    queue_capacity: usize,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Sinks> {
        // A panic while holding the lock cannot leave the map half-modified
        self.sinks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: &Uuid) -> bool {
        self.lock().senders.remove(id).is_some()
    }
}

/// Fan-out of opaque text messages to every connected viewer
///
/// Cheap to clone; all clones share one registry. Safe to use from any number
/// of tasks at once.
///
/// # Examples
///
/// ```
/// use snapcart_common::events::EventBroadcaster;
///
/// let broadcaster = EventBroadcaster::new(16);
/// let mut subscription = broadcaster.subscribe();
///
/// assert_eq!(broadcaster.publish("hello"), 1);
/// assert_eq!(subscription.try_recv().as_deref(), Some("hello"));
/// ```
#[derive(Clone)]
pub struct EventBroadcaster {
    registry: Arc<Registry>,
}

impl EventBroadcaster {
    /// Create a broadcaster whose subscribers each buffer up to `queue_capacity` messages
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                sinks: Mutex::new(Sinks::default()),
                queue_capacity: queue_capacity.max(1),
            }),
        }
    }

    /// Register a new sink
    ///
    /// The subscription receives every message published after this call
    /// returns. Dropping it unregisters the sink. After [`shutdown`] the
    /// returned subscription is already closed.
    ///
    /// [`shutdown`]: EventBroadcaster::shutdown
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.registry.queue_capacity);
        let id = Uuid::new_v4();

        let mut sinks = self.registry.lock();
        if sinks.closed {
            drop(sinks);
            debug!("Broadcaster is shut down, subscriber {} starts closed", id);
        } else {
            sinks.senders.insert(id, tx);
            let count = sinks.senders.len();
            drop(sinks);
            info!("Subscriber {} registered ({} active)", id, count);
        }

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Remove a sink from the registry
    ///
    /// Returns false if it was already gone; calling this twice is harmless.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.registry.remove(&id);
        if removed {
            debug!("Subscriber {} unregistered", id);
        }
        removed
    }

    /// Queue `message` for every registered sink
    ///
    /// Never waits. Sinks that are closed or whose queue is full are dropped
    /// from the registry; the rest are unaffected. Returns the number of sinks
    /// the message was queued for.
    pub fn publish(&self, message: impl Into<String>) -> usize {
        let message = message.into();
        let mut delivered = 0;

        let mut sinks = self.registry.lock();
        sinks.senders.retain(|id, tx| match tx.try_send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Subscriber {} is not keeping up, disconnecting", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Subscriber {} is closed, removing", id);
                false
            }
        });

        debug!("Published event to {} subscribers", delivered);
        delivered
    }

    /// Serialize `payload` as JSON and publish it
    pub fn publish_json<T: Serialize>(&self, payload: &T) -> Result<usize> {
        let message = serde_json::to_string(payload)
            .map_err(|e| Error::Internal(format!("Failed to serialize event: {}", e)))?;
        Ok(self.publish(message))
    }

    /// Close every sink; open streams end once their queues drain
    ///
    /// Later subscriptions start closed, so nothing can hold a stream open
    /// past this point.
    pub fn shutdown(&self) {
        let mut sinks = self.registry.lock();
        sinks.closed = true;
        let count = sinks.senders.len();
        sinks.senders.clear();
        info!("Event broadcaster shut down ({} subscribers closed)", count);
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().senders.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.registry.queue_capacity
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Handle for one registered sink
///
/// Receives messages in publish order. Dropping the handle, or calling
/// [`Subscription::unsubscribe`], removes the sink from the registry.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<String>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next message
    ///
    /// Returns `None` once the subscription is closed (unsubscribed,
    /// disconnected for overflow, or broadcaster shut down) and its queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take the next queued message without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Unregister this sink; idempotent
    pub fn unsubscribe(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(&self.id) {
                debug!("Subscriber {} unregistered", self.id);
            }
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
