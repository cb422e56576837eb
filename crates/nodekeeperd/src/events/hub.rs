//! In-process broadcast of domain events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use nodekeeper_events::DomainEvent;
use tracing::debug;

use super::EVENTS_TARGET;

/// Identifier assigned to each subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    sender: Sender<DomainEvent>,
}

/// Broadcasts every published event to all current subscribers.
///
/// Each subscriber owns an unbounded queue, so a slow consumer never blocks
/// publishers. Subscribers are removed explicitly with
/// [`EventHub::unsubscribe`] or implicitly once their [`Subscription`] is
/// dropped and the next publish notices the closed queue.
#[derive(Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl EventHub {
    /// Builds a hub with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber that receives events published from now on.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        self.register(sender, receiver)
    }

    /// Registers a subscriber whose queue starts with `initial`.
    ///
    /// `initial` is queued before the subscriber becomes visible to
    /// publishers, so it is always the first event received. Callers holding
    /// a lock that serialises their own publishes get an initial event that
    /// is consistent with everything that follows.
    pub fn subscribe_with(&self, initial: DomainEvent) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        if sender.send(initial).is_err() {
            debug!(target: EVENTS_TARGET, "initial event dropped");
        }
        self.register(sender, receiver)
    }

    /// Removes a subscriber. Returns `false` when it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let id = subscription.id;
        let mut subscribers = self.lock_subscribers();
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != id);
        let removed = subscribers.len() != before;
        debug!(target: EVENTS_TARGET, subscription = id.0, removed, "unsubscribed");
        removed
    }

    /// Delivers `event` to every subscriber and returns how many received it.
    ///
    /// Subscribers whose receiving side has been dropped are pruned.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|subscriber| subscriber.sender.send(event.clone()).is_ok());
        let delivered = subscribers.len();
        debug!(
            target: EVENTS_TARGET,
            kind = event.kind(),
            delivered,
            "event published"
        );
        delivered
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn register(&self, sender: Sender<DomainEvent>, receiver: Receiver<DomainEvent>) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_subscribers().push(Subscriber { id, sender });
        debug!(target: EVENTS_TARGET, subscription = id.0, "subscribed");
        Subscription { id, receiver }
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving side of a hub registration.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: Receiver<DomainEvent>,
}

impl Subscription {
    /// Identifier of this registration.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the next queued event without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<DomainEvent> {
        self.receiver.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    #[must_use]
    pub fn next_timeout(&self, timeout: Duration) -> Option<DomainEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drains every event queued so far.
    #[must_use]
    pub fn drain(&self) -> Vec<DomainEvent> {
        self.receiver.try_iter().collect()
    }
}
