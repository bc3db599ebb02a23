//! # Raw store notifications.
//!
//! A [`Notification`] is what a cache entry hands to every registered callback
//! after applying one change to its store. It is untyped: each source decodes it
//! into its own object type.

use std::sync::Arc;

use crate::object::{ObjectKey, RawObject};

/// One applied change, carrying before/after state.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// The object was not in the store before.
    Added { object: Arc<RawObject> },

    /// The object replaced a previously stored state.
    ///
    /// Periodic resync delivers `old` and `new` as the same state.
    Updated {
        old: Arc<RawObject>,
        new: Arc<RawObject>,
    },

    /// The object left the store.
    ///
    /// `last_known` is the stored state, `None` on a cache miss; `observed`
    /// is what the transport reported with the deletion.
    Deleted {
        last_known: Option<Arc<RawObject>>,
        observed: Arc<RawObject>,
    },
}

impl Notification {
    /// Key of the object this notification is about.
    pub fn key(&self) -> ObjectKey {
        match self {
            Notification::Added { object } => object.key(),
            Notification::Updated { new, .. } => new.key(),
            Notification::Deleted { observed, .. } => observed.key(),
        }
    }

    /// Short operation label (`add`, `update`, `delete`).
    pub fn op(&self) -> &'static str {
        match self {
            Notification::Added { .. } => "add",
            Notification::Updated { .. } => "update",
            Notification::Deleted { .. } => "delete",
        }
    }
}
