//! Host runtime interface
//!
//! The instrumentation runtime fires lifecycle events; observers subscribe to
//! them without the runtime knowing who they are. This module holds the narrow
//! types both sides agree on.

use std::fmt;
use std::sync::Arc;

pub mod attribute;
pub mod bus;
pub mod scope;
pub mod snapshot;
pub mod variant;

pub use attribute::{Attribute, ValueType};
pub use bus::EventBus;
pub use scope::{ScopeMask, scope_to_string};
pub use snapshot::{RecordDescriptor, SNAPSHOT_RECORD, Snapshot, SnapshotRecord};
pub use variant::Variant;

/// Runtime lifecycle event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    CreateAttribute,
    PreBegin,
    PreEnd,
    PreSet,
    Finish,
    CreateContext,
    DestroyContext,
    Snapshot,
    ProcessSnapshot,
}

impl EventKind {
    /// Every event kind, in the order observers subscribe to them
    pub const ALL: [EventKind; 9] = [
        EventKind::CreateAttribute,
        EventKind::PreBegin,
        EventKind::PreEnd,
        EventKind::PreSet,
        EventKind::Finish,
        EventKind::CreateContext,
        EventKind::DestroyContext,
        EventKind::Snapshot,
        EventKind::ProcessSnapshot,
    ];

    /// Name used in log output
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateAttribute => "create_attribute",
            Self::PreBegin => "pre_begin",
            Self::PreEnd => "pre_end",
            Self::PreSet => "pre_set",
            Self::Finish => "finish",
            Self::CreateContext => "create_context",
            Self::DestroyContext => "destroy_context",
            Self::Snapshot => "snapshot",
            Self::ProcessSnapshot => "process_snapshot",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event observer.
///
/// Every method defaults to a no-op so an observer only implements the events
/// it cares about. Methods run synchronously on the thread that fired the
/// event and must return promptly. Borrowed arguments are only valid for the
/// duration of the call.
pub trait Observer: Send + Sync {
    fn create_attribute(&self, _attr: &Attribute) {}
    fn pre_begin(&self, _attr: &Attribute) {}
    fn pre_end(&self, _attr: &Attribute) {}
    fn pre_set(&self, _attr: &Attribute) {}
    fn finish(&self) {}
    fn create_context(&self, _scope: ScopeMask) {}
    fn destroy_context(&self) {}
    fn snapshot(&self, _scope: ScopeMask) {}
    fn process_snapshot(&self, _snapshot: &dyn Snapshot) {}
}

/// Handle returned by a successful subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Reasons a host rejects a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeError {
    /// The same observer is already subscribed to this event kind
    Duplicate(EventKind),
    /// This host does not fire the event kind
    Unsupported(EventKind),
}

impl fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscribeError::Duplicate(kind) => write!(f, "observer already subscribed to {} events", kind),
            SubscribeError::Unsupported(kind) => write!(f, "{} events are not supported by this runtime", kind),
        }
    }
}

impl std::error::Error for SubscribeError {}

/// Event subscription registry offered by the host runtime
pub trait EventSource: Send + Sync {
    fn subscribe(&self, kind: EventKind, observer: Arc<dyn Observer>) -> Result<SubscriptionId, SubscribeError>;

    /// Remove a subscription; returns false if it was not present
    fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool;
}
