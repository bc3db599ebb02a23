//! Object cache: shared per-kind watches, local stores and lifecycle.
//!
//! ## Contents
//! - [`ObjectCache`] kind → entry registry with lazy watch creation and graceful shutdown
//! - [`ObjectCacheBuilder`] configuration and subscriber wiring
//! - [`CacheEntry`] store, callbacks and listener of one kind
//! - [`CacheConfig`] delays, resync, backlog threshold, grace
//!
//! ```text
//! ObjectCache
//!   ├─ entries: { gvk → CacheEntry }
//!   │              ├─ Store (by key, by namespace)
//!   │              ├─ CallbackSet (one worker per callback)
//!   │              └─ Listener task (list → watch → recover)
//!   ├─ Bus ──► subscriber listener ──► SubscriberSet
//!   └─ CancellationToken (stop signal)
//! ```

mod builder;
mod config;
mod entry;
mod listener;
mod object_cache;
mod shutdown;
mod store;

pub use builder::ObjectCacheBuilder;
pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use object_cache::ObjectCache;
pub use shutdown::wait_for_shutdown_signal;
