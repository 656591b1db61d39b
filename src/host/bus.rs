use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use crate::model::AgentEvent;

type Subscribers = Arc<Mutex<BTreeMap<u64, mpsc::UnboundedSender<AgentEvent>>>>;

#[derive(Default)]
struct Registry {
    subscribers: Subscribers,
    next_id: Mutex<u64>,
}

/// Push channel for agent events coming from the host.
///
/// Each subscriber gets its own receiver; dropping the returned
/// [`Subscription`] unsubscribes and closes that receiver.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> (Subscription, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut next = self
                .inner
                .next_id
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        tracing::debug!(subscriber = id, "Event subscriber registered");

        let subscription = Subscription {
            id,
            subscribers: Arc::clone(&self.inner.subscribers),
            active: true,
        };
        (subscription, rx)
    }

    /// Deliver an event to every live subscriber, in registration order.
    /// Returns how many received it.
    pub fn publish(&self, event: &AgentEvent) -> usize {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|_, tx| !tx.is_closed());
        subscribers
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Handle for one bus subscription; unsubscribes on drop
pub struct Subscription {
    id: u64,
    subscribers: Subscribers,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the subscriber now. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        tracing::debug!(subscriber = self.id, "Event subscriber removed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
