//! In-process event bus
//!
//! Keeps one subscriber list per event kind and fires events to every
//! subscriber in subscription order.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::{Attribute, EventKind, EventSource, Observer, ScopeMask, Snapshot, SubscribeError, SubscriptionId};

type Subscribers = HashMap<EventKind, Vec<(SubscriptionId, Arc<dyn Observer>)>>;

/// Event bus implementing [`EventSource`]
pub struct EventBus {
    subscribers: RwLock<Subscribers>,
    supported: HashSet<EventKind>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus that fires every event kind
    pub fn new() -> Self {
        Self::with_supported(&EventKind::ALL)
    }

    /// Create a bus that only accepts subscriptions for the given kinds
    pub fn with_supported(kinds: &[EventKind]) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            supported: kinds.iter().copied().collect(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of observers subscribed to an event kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.read().get(&kind).map(Vec::len).unwrap_or(0)
    }

    /// Number of subscriptions across all event kinds
    pub fn total_subscribers(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn create_attribute(&self, attr: &Attribute) {
        for observer in self.observers(EventKind::CreateAttribute) {
            observer.create_attribute(attr);
        }
    }

    pub fn pre_begin(&self, attr: &Attribute) {
        for observer in self.observers(EventKind::PreBegin) {
            observer.pre_begin(attr);
        }
    }

    pub fn pre_end(&self, attr: &Attribute) {
        for observer in self.observers(EventKind::PreEnd) {
            observer.pre_end(attr);
        }
    }

    pub fn pre_set(&self, attr: &Attribute) {
        for observer in self.observers(EventKind::PreSet) {
            observer.pre_set(attr);
        }
    }

    pub fn finish(&self) {
        for observer in self.observers(EventKind::Finish) {
            observer.finish();
        }
    }

    pub fn create_context(&self, scope: ScopeMask) {
        for observer in self.observers(EventKind::CreateContext) {
            observer.create_context(scope);
        }
    }

    pub fn destroy_context(&self) {
        for observer in self.observers(EventKind::DestroyContext) {
            observer.destroy_context();
        }
    }

    pub fn snapshot(&self, scope: ScopeMask) {
        for observer in self.observers(EventKind::Snapshot) {
            observer.snapshot(scope);
        }
    }

    pub fn process_snapshot(&self, snapshot: &dyn Snapshot) {
        for observer in self.observers(EventKind::ProcessSnapshot) {
            observer.process_snapshot(snapshot);
        }
    }

    // Observers run without the bus lock held so they may subscribe or fire
    // nested events.
    fn observers(&self, kind: EventKind) -> Vec<Arc<dyn Observer>> {
        self.read()
            .get(&kind)
            .map(|list| list.iter().map(|(_, observer)| Arc::clone(observer)).collect())
            .unwrap_or_default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Subscribers> {
        self.subscribers.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Subscribers> {
        self.subscribers.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSource for EventBus {
    fn subscribe(&self, kind: EventKind, observer: Arc<dyn Observer>) -> Result<SubscriptionId, SubscribeError> {
        if !self.supported.contains(&kind) {
            return Err(SubscribeError::Unsupported(kind));
        }

        let mut subscribers = self.write();
        let list = subscribers.entry(kind).or_default();

        if list.iter().any(|(_, existing)| Arc::ptr_eq(existing, &observer)) {
            return Err(SubscribeError::Duplicate(kind));
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        list.push((id, observer));
        log::trace!("Subscribed {:?} to {} events", id, kind);
        Ok(id)
    }

    fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut subscribers = self.write();
        let Some(list) = subscribers.get_mut(&kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        list.len() != before
    }
}
