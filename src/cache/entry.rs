//! # Cache entry: the shared watch for one kind.
//!
//! A [`CacheEntry`] owns the store for one [`GroupVersionKind`], the callbacks
//! registered on it, and the handle of the listener that feeds it. All sources
//! of the same kind share one entry.
//!
//! ```text
//! listener ──► apply / replace / resync ──► [RwLock] Store ──► CallbackSet::dispatch
//!                                                ▲
//! register(callback) ── snapshot as Added ───────┘ (same lock: no gap, no duplicate)
//! ```
//!
//! ## Rules
//! - Store mutation and dispatch happen under one write lock, so every callback
//!   sees changes in the order the store applied them.
//! - A late callback first receives the current contents as `Added`, then live
//!   notifications.

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::store::{Change, Store};
use crate::dispatch::{Callback, CallbackId, CallbackSet};
use crate::events::Bus;
use crate::object::{GroupVersionKind, ObjectKey, RawObject};

struct EntryState {
    store: Store,
    callbacks: CallbackSet,
    listener: Option<JoinHandle<()>>,
}

/// The store, callbacks and watch listener of one kind.
pub struct CacheEntry {
    gvk: GroupVersionKind,
    state: RwLock<EntryState>,
    synced: watch::Sender<bool>,
    token: CancellationToken,
}

impl CacheEntry {
    pub(crate) fn new(
        gvk: GroupVersionKind,
        bus: Bus,
        token: CancellationToken,
        backlog_warn: Option<usize>,
    ) -> Self {
        let callbacks = CallbackSet::new(gvk.clone(), bus, token.clone(), backlog_warn);
        let (synced, _) = watch::channel(false);
        Self {
            gvk,
            state: RwLock::new(EntryState {
                store: Store::default(),
                callbacks,
                listener: None,
            }),
            synced,
            token,
        }
    }

    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    /// Registers a callback for every change of this kind.
    ///
    /// Objects already cached are queued to it as `Added` before any later
    /// change.
    pub async fn register(&self, callback: Arc<dyn Callback>) -> CallbackId {
        let mut state = self.state.write().await;
        let replay = state.store.snapshot_added();
        state.callbacks.add(callback, replay)
    }

    /// Whether `id` is registered on this entry.
    pub async fn is_registered(&self, id: CallbackId) -> bool {
        self.state.read().await.callbacks.contains(id)
    }

    pub async fn callback_count(&self) -> usize {
        self.state.read().await.callbacks.len()
    }

    pub async fn get(&self, key: &ObjectKey) -> Option<Arc<RawObject>> {
        self.state.read().await.store.get(key)
    }

    /// All cached objects, ordered by key.
    pub async fn list(&self) -> Vec<Arc<RawObject>> {
        self.state.read().await.store.list()
    }

    pub async fn list_namespace(&self, namespace: &str) -> Vec<Arc<RawObject>> {
        self.state.read().await.store.list_namespace(namespace)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether the initial list has been applied.
    pub fn has_synced(&self) -> bool {
        *self.synced.borrow()
    }

    /// Waits until the initial list has been applied.
    ///
    /// Returns `false` if the cache stopped first.
    pub async fn wait_for_sync(&self) -> bool {
        let mut rx = self.synced.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return true;
            }
            tokio::select! {
                res = rx.changed() => {
                    if res.is_err() {
                        return self.has_synced();
                    }
                }
                _ = self.token.cancelled() => return self.has_synced(),
            }
        }
    }

    pub(crate) fn mark_synced(&self) -> bool {
        self.synced.send_if_modified(|synced| !std::mem::replace(synced, true))
    }

    pub(crate) async fn apply(&self, change: Change) {
        let mut state = self.state.write().await;
        let notification = state.store.apply(change);
        state.callbacks.dispatch(notification);
    }

    /// Applies a full listing; returns how many notifications it produced.
    pub(crate) async fn replace(&self, listed: Vec<RawObject>) -> usize {
        let mut state = self.state.write().await;
        let notifications = state.store.replace(listed);
        let n = notifications.len();
        for notification in notifications {
            state.callbacks.dispatch(notification);
        }
        n
    }

    /// Re-delivers every cached object; returns how many.
    pub(crate) async fn resync(&self) -> usize {
        let state = self.state.write().await;
        let notifications = state.store.resync();
        let n = notifications.len();
        for notification in notifications {
            state.callbacks.dispatch(notification);
        }
        n
    }

    pub(crate) async fn set_listener(&self, handle: JoinHandle<()>) {
        self.state.write().await.listener = Some(handle);
    }

    /// Takes the listener and worker handles so shutdown can await them.
    pub(crate) async fn take_tasks(&self) -> Vec<JoinHandle<()>> {
        let mut state = self.state.write().await;
        let mut tasks: Vec<JoinHandle<()>> = state.listener.take().into_iter().collect();
        tasks.extend(state.callbacks.take_workers());
        tasks
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("gvk", &self.gvk)
            .field("synced", &self.has_synced())
            .finish_non_exhaustive()
    }
}
