//! # Local indexed store of one cache entry.
//!
//! Holds the last observed state of every object of a kind, keyed by
//! namespace + name, with a secondary index by namespace. Every mutation
//! returns the [`Notification`]s it implies, carrying the previous state so
//! consumers can diff.
//!
//! ## Rules
//! - `Added` for a known key is applied as an update.
//! - `Modified` for an unknown key is applied as an add.
//! - `Deleted` for an unknown key yields `last_known: None`.
//! - A re-list keeps objects whose resource version is unchanged silent.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::dispatch::Notification;
use crate::object::{ObjectKey, RawObject};

/// One change reported by the transport, after metadata decoding.
#[derive(Debug)]
pub(crate) enum Change {
    Upsert(RawObject),
    Remove(RawObject),
}

#[derive(Default)]
pub(crate) struct Store {
    items: BTreeMap<ObjectKey, Arc<RawObject>>,
    by_namespace: BTreeMap<String, BTreeSet<ObjectKey>>,
}

impl Store {
    /// Applies one change and returns the resulting notification.
    pub(crate) fn apply(&mut self, change: Change) -> Notification {
        match change {
            Change::Upsert(object) => {
                let object = Arc::new(object);
                match self.insert(Arc::clone(&object)) {
                    Some(old) => Notification::Updated { old, new: object },
                    None => Notification::Added { object },
                }
            }
            Change::Remove(observed) => {
                let key = observed.key();
                let last_known = self.remove(&key);
                Notification::Deleted {
                    last_known,
                    observed: Arc::new(observed),
                }
            }
        }
    }

    /// Replaces the contents with a fresh listing.
    ///
    /// Returns notifications for the differences only: listed objects that are
    /// new or have a changed resource version, then deletions of objects
    /// absent from the listing, in key order.
    pub(crate) fn replace(&mut self, listed: Vec<RawObject>) -> Vec<Notification> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();

        for object in listed {
            let key = object.key();
            let unchanged = self.items.get(&key).is_some_and(|cur| {
                cur.resource_version().is_some()
                    && cur.resource_version() == object.resource_version()
            });
            seen.insert(key);
            if !unchanged {
                out.push(self.apply(Change::Upsert(object)));
            }
        }

        let gone: Vec<ObjectKey> = self
            .items
            .keys()
            .filter(|k| !seen.contains(*k))
            .cloned()
            .collect();
        for key in gone {
            if let Some(old) = self.remove(&key) {
                out.push(Notification::Deleted {
                    observed: Arc::clone(&old),
                    last_known: Some(old),
                });
            }
        }
        out
    }

    /// Every cached object as an `Added` notification, in key order.
    pub(crate) fn snapshot_added(&self) -> Vec<Notification> {
        self.items
            .values()
            .map(|object| Notification::Added {
                object: Arc::clone(object),
            })
            .collect()
    }

    /// Every cached object as a same-state `Updated` notification, in key order.
    pub(crate) fn resync(&self) -> Vec<Notification> {
        self.items
            .values()
            .map(|object| Notification::Updated {
                old: Arc::clone(object),
                new: Arc::clone(object),
            })
            .collect()
    }

    pub(crate) fn get(&self, key: &ObjectKey) -> Option<Arc<RawObject>> {
        self.items.get(key).cloned()
    }

    pub(crate) fn list(&self) -> Vec<Arc<RawObject>> {
        self.items.values().cloned().collect()
    }

    pub(crate) fn list_namespace(&self, namespace: &str) -> Vec<Arc<RawObject>> {
        self.by_namespace
            .get(namespace)
            .into_iter()
            .flatten()
            .filter_map(|key| self.items.get(key).cloned())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    fn insert(&mut self, object: Arc<RawObject>) -> Option<Arc<RawObject>> {
        let key = object.key();
        if let Some(ns) = &key.namespace {
            self.by_namespace
                .entry(ns.clone())
                .or_default()
                .insert(key.clone());
        }
        self.items.insert(key, object)
    }

    fn remove(&mut self, key: &ObjectKey) -> Option<Arc<RawObject>> {
        let old = self.items.remove(key)?;
        if let Some(ns) = &key.namespace {
            if let Some(keys) = self.by_namespace.get_mut(ns) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_namespace.remove(ns);
                }
            }
        }
        Some(old)
    }
}
