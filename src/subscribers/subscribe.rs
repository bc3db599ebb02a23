//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for observing runtime [`Event`]s (watch
//! failures, dropped notifications, shutdown progress). Each subscriber is driven
//! by a dedicated worker loop fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they do **not** block listeners, handlers or
//!   other subscribers.
//! - Each subscriber declares its queue capacity via [`Subscribe::queue_capacity`].
//!   On overflow, events for that subscriber are **dropped** and a
//!   `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use kindsource::{Event, EventKind, Subscribe};
//!
//! struct WatchAlerts;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for WatchAlerts {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::WatchFailed {
//!             // page someone...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "watch-alerts" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for runtime event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
