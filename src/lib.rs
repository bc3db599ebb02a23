//! # kindsource
//!
//! **kindsource** delivers typed create/update/delete events for remote
//! objects of a given kind to consumer handlers, on top of a shared,
//! watch-backed object cache.
//!
//! Any number of [`KindSource`]s can be attached to one [`ObjectCache`]; all
//! sources of the same kind share a single list/watch against the
//! [`Transport`], and each receives its own copy of every event, in order.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  KindSource<Deployment>   KindSource<Deployment>   KindSource<Foo>
//!   (handler A, queue A)     (handler B, queue B)    (handler C, queue C)
//!          │ start                  │ start                │ start
//!          ▼                        ▼                      ▼
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  ObjectCache                                                       │
//! │   get_or_create(gvk)  (one entry, one watch per kind)              │
//! │  ┌──────────────────────────────────┐  ┌─────────────────────────┐ │
//! │  │ CacheEntry apps/v1 Deployment    │  │ CacheEntry example/v1 Foo│ │
//! │  │  Store ◄── Listener ◄── watch    │  │  Store ◄── Listener     │ │
//! │  │  CallbackSet ─┬─► worker A       │  │  CallbackSet ─► worker C │ │
//! │  │               └─► worker B       │  │                          │ │
//! │  └──────────────────────────────────┘  └─────────────────────────┘ │
//! └──────────┬─────────────────────────────────────────────────────────┘
//!            │ runtime events (watch failures, drops, shutdown)
//!            ▼
//!     Bus (broadcast) ──► subscriber listener ──► SubscriberSet ──► LogWriter, custom
//! ```
//!
//! ### Event path
//! ```text
//! Transport ── Added/Modified/Deleted(Value) ──► Listener
//!   ├─ decode metadata (RawObject)         undecodable → TranslationFailed, dropped
//!   ├─ Store::apply → Notification { old/new state }
//!   └─ CallbackSet::dispatch ──► per-callback FIFO ──► SourceCallback
//!        ├─ translate::<K>                 wrong shape → TranslationFailed, dropped
//!        └─ handler.on_create / on_update / on_delete(&queue, event)
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Sources**       | Bind a kind to a cache and a handler.                          | [`KindSource`], [`EventHandler`]            |
//! | **Cache**         | Shared per-kind watches with local stores and typed reads.     | [`ObjectCache`], [`CacheEntry`]             |
//! | **Transport**     | Pluggable list/watch backend; in-memory store included.        | [`Transport`], [`MemoryTransport`]          |
//! | **Subscriber API**| Observe watch, dispatch and shutdown events.                   | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors with stable labels.                               | [`SourceError`], [`RuntimeError`]           |
//! | **Configuration** | Delays, resync, backlog threshold, shutdown grace.             | [`CacheConfig`]                             |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use kindsource::{
//!     EnqueueRequestForObject, GroupVersionKind, KindSource, MemoryTransport, ObjectCache,
//!     ObjectMeta, Request, Resource,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! struct ConfigMap {
//!     metadata: ObjectMeta,
//! }
//!
//! impl Resource for ConfigMap {
//!     fn gvk() -> GroupVersionKind { GroupVersionKind::new("", "v1", "ConfigMap") }
//!     fn meta(&self) -> &ObjectMeta { &self.metadata }
//!     fn meta_mut(&mut self) -> &mut ObjectMeta { &mut self.metadata }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(MemoryTransport::new());
//!     let cache = ObjectCache::builder(transport.clone()).build();
//!
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
//!     let mut source = KindSource::<ConfigMap>::new();
//!     source.bind(cache.clone())?;
//!     source.start(EnqueueRequestForObject, tx).await?;
//!
//!     let cm = ConfigMap { metadata: ObjectMeta::named("settings").in_namespace("default") };
//!     transport.create(&ConfigMap::gvk(), serde_json::to_value(&cm)?).await?;
//!
//!     let req = rx.recv().await.expect("request");
//!     assert_eq!(req.to_string(), "default/settings");
//!
//!     cache.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod cache;
mod dispatch;
mod error;
mod events;
mod object;
mod source;
mod subscribers;
mod transport;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use cache::{
    CacheConfig, CacheEntry, ObjectCache, ObjectCacheBuilder, wait_for_shutdown_signal,
};
pub use dispatch::{Callback, CallbackId, Notification};
pub use error::{CacheError, RuntimeError, SourceError, TranslateError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use object::{GroupVersionKind, ObjectKey, ObjectMeta, RawObject, Resource};
pub use source::{
    CreateEvent, DeleteEvent, EnqueueRequestForObject, EventHandler, HandlerFns, KindSource,
    ObjectEvent, Request, SourcePhase, UpdateEvent, WorkQueue, translate,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use transport::{ListSnapshot, MemoryTransport, Transport, WatchNotification, WatchStream};

// Optional: expose the built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
