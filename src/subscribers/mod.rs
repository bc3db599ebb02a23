//! # Runtime event subscribers.
//!
//! ```text
//! listener / worker / source ── publish(Event) ──► Bus ──► ObjectCache listener
//!                                                               │
//!                                                        SubscriberSet::emit
//!                                                     ┌─────────┼─────────┐
//!                                                     ▼         ▼         ▼
//!                                                 LogWriter  Metrics   Custom
//! ```
//!
//! - [`Subscribe`]: trait for custom observers.
//! - [`SubscriberSet`]: bounded per-subscriber queues and workers.
//! - `LogWriter` (feature `logging`): forwards events to `tracing`.

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
