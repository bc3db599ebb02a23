//! # Event bus for runtime diagnostics.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Listeners,
//! dispatch workers and sources publish to it; the cache forwards every event
//! to its [`SubscriberSet`](crate::SubscriberSet).
//!
//! ```text
//! Publishers (many):                       Subscriber (one):
//!   listener (per kind) ──┐
//!   dispatch workers   ───┼──► Bus ───► subscriber_listener ───► SubscriberSet
//!   kind sources       ───┘ (broadcast)  (in ObjectCache)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers; returns immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes subsequently published events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
