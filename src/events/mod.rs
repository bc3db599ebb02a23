//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: cache listeners (watch/list failures, sync, resync),
//!   dispatch workers (backlog, panics), kind sources (translation failures),
//!   `SubscriberSet` workers (overflow/panic), `ObjectCache::shutdown`.
//! - **Consumer**: `ObjectCache`'s subscriber listener, which fans events out to
//!   the configured [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
