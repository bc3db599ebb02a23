//! # Remote list/watch transport boundary.
//!
//! The cache never talks to the backing store directly. It consumes a
//! [`Transport`], which lists a kind and streams subsequent mutations:
//!
//! ```text
//! listener ──► Transport::list(gvk) ──► ListSnapshot { items, resource_version }
//!          └─► Transport::watch(gvk, Some(resource_version)) ──► WatchStream
//!                 Added(obj) | Modified(obj) | Deleted(obj) | Err(TransportError)
//! ```
//!
//! ## Contract assumed
//! - Every mutation after `resource_version` is delivered exactly once, in
//!   occurrence order per object.
//! - A stream error or end means the watch is gone; the cache re-lists and
//!   re-watches. Reconnection policy beyond that belongs to the transport.
//!
//! [`MemoryTransport`] is an in-process backing store implementing this contract,
//! used by tests and demos.

mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::TransportError;
use crate::object::GroupVersionKind;

pub use memory::MemoryTransport;

/// One raw change notification from the backing store.
#[derive(Clone, Debug, PartialEq)]
pub enum WatchNotification {
    Added(Value),
    Modified(Value),
    /// Carries the final state the store had for the object.
    Deleted(Value),
}

/// Point-in-time listing of a kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListSnapshot {
    pub items: Vec<Value>,
    /// Version to resume watching from; `None` watches from "now".
    pub resource_version: Option<String>,
}

/// Live feed of notifications for a kind.
pub type WatchStream = BoxStream<'static, Result<WatchNotification, TransportError>>;

/// Source of list snapshots and watch streams.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Lists every object of `gvk`.
    async fn list(&self, gvk: &GroupVersionKind) -> Result<ListSnapshot, TransportError>;

    /// Opens a watch on `gvk`, delivering mutations after `resource_version`.
    async fn watch(
        &self,
        gvk: &GroupVersionKind,
        resource_version: Option<String>,
    ) -> Result<WatchStream, TransportError>;
}
