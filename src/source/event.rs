//! # Typed object events delivered to handlers.
//!
//! Each event carries the metadata separately from the object so handlers
//! that only route by identity never have to look inside the payload.

use crate::object::{ObjectKey, ObjectMeta};

/// An object appeared in the cache.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateEvent<K> {
    pub meta: ObjectMeta,
    pub object: K,
}

/// A cached object changed; `*_old` is the state the cache held before.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateEvent<K> {
    pub meta_old: ObjectMeta,
    pub object_old: K,
    pub meta_new: ObjectMeta,
    pub object_new: K,
}

/// An object left the remote store.
///
/// `meta` and `object` are the last state the cache held, with
/// `resource_version` cleared. When the cache never held the object they come
/// from the delete notification itself; `object` is `None` only if that
/// payload does not decode as `K`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteEvent<K> {
    pub meta: ObjectMeta,
    pub object: Option<K>,
}

/// Any of the three typed events.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectEvent<K> {
    Create(CreateEvent<K>),
    Update(UpdateEvent<K>),
    Delete(DeleteEvent<K>),
}

impl<K> ObjectEvent<K> {
    /// Current metadata: the new state for updates.
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            ObjectEvent::Create(e) => &e.meta,
            ObjectEvent::Update(e) => &e.meta_new,
            ObjectEvent::Delete(e) => &e.meta,
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.meta().key()
    }

    /// Short operation label: `create`, `update` or `delete`.
    pub fn op(&self) -> &'static str {
        match self {
            ObjectEvent::Create(_) => "create",
            ObjectEvent::Update(_) => "update",
            ObjectEvent::Delete(_) => "delete",
        }
    }
}
