//! # Runtime events emitted by the cache, its listeners and dispatch workers.
//!
//! These are diagnostics about the event-source machinery itself (watch failures,
//! dropped notifications, shutdown progress), not the object events delivered to
//! handlers. They are published on the [`Bus`](super::Bus) and fanned out to
//! [`Subscribe`](crate::Subscribe) implementations.
//!
//! ## Ordering guarantees
//! Each event has a process-wide sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use kindsource::{Event, EventKind, GroupVersionKind};
//!
//! let ev = Event::new(EventKind::WatchFailed)
//!     .with_gvk(&GroupVersionKind::new("apps", "v1", "Deployment"))
//!     .with_reason("connection reset");
//!
//! assert_eq!(ev.kind, EventKind::WatchFailed);
//! assert_eq!(ev.gvk.as_deref(), Some("apps/v1, Kind=Deployment"));
//! assert_eq!(ev.reason.as_deref(), Some("connection reset"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::object::{GroupVersionKind, ObjectKey};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Watch lifecycle ===
    /// A cache entry was created and its listener spawned.
    ///
    /// Sets: `gvk`
    WatchStarted,

    /// The initial list of an entry has been applied to its store.
    ///
    /// Sets: `gvk`, `count` (objects listed)
    CacheSynced,

    /// The watch stream yielded an error; the listener will re-list.
    ///
    /// Sets: `gvk`, `reason`
    WatchFailed,

    /// The watch stream ended without an error; the listener will re-list.
    ///
    /// Sets: `gvk`
    WatchClosed,

    /// Listing the kind failed; the listener will retry.
    ///
    /// Sets: `gvk`, `reason`
    ListFailed,

    /// A periodic resync re-delivered every cached object.
    ///
    /// Sets: `gvk`, `count`
    Resynced,

    // === Notification handling ===
    /// A notification could not be interpreted and was dropped.
    ///
    /// Sets: `gvk`, `reason`, `object` (when known), `source` (when raised by a source)
    TranslationFailed,

    /// A kind source registered its callback.
    ///
    /// Sets: `gvk`, `source`
    SourceStarted,

    /// A callback's pending queue crossed the backlog threshold.
    ///
    /// Sets: `gvk`, `source`, `count` (pending notifications)
    CallbackBacklog,

    /// A callback panicked while handling a notification; the worker continues.
    ///
    /// Sets: `gvk`, `source`, `reason`
    CallbackPanicked,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `source` (subscriber name), `reason`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `source` (subscriber name), `reason`
    SubscriberPanicked,

    // === Shutdown events ===
    /// Stop signal observed.
    ShutdownRequested,

    /// All listeners and workers stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some listeners or workers did not stop in time.
    GraceExceeded,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Rendered kind the event refers to.
    pub gvk: Option<Arc<str>>,
    /// Rendered key of the object the event refers to.
    pub object: Option<Arc<str>>,
    /// Name of the source or subscriber involved.
    pub source: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Object or notification count.
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            gvk: None,
            object: None,
            source: None,
            reason: None,
            count: None,
        }
    }

    #[inline]
    pub fn with_gvk(mut self, gvk: &GroupVersionKind) -> Self {
        self.gvk = Some(gvk.to_string().into());
        self
    }

    #[inline]
    pub fn with_object(mut self, key: &ObjectKey) -> Self {
        self.object = Some(key.to_string().into());
        self
    }

    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::WatchStarted);
        let b = Event::new(EventKind::WatchStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_subscriber_overflow_fields() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.source.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("full"));
    }

    #[test]
    fn test_object_key_rendering() {
        let ev = Event::new(EventKind::TranslationFailed)
            .with_object(&ObjectKey::namespaced("ns", "web"))
            .with_count(3);
        assert_eq!(ev.object.as_deref(), Some("ns/web"));
        assert_eq!(ev.count, Some(3));
    }
}
