//! # In-process backing store.
//!
//! [`MemoryTransport`] keeps objects per kind, assigns uids and monotonically
//! increasing resource versions, and records a per-kind history so watches can
//! resume from a listed version without gaps. It also exposes hooks tests need:
//! call counters, raw notification injection and forced watch/list failures.
//!
//! ## Example
//! ```rust
//! use kindsource::{GroupVersionKind, MemoryTransport, ObjectKey, Transport};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), kindsource::TransportError> {
//! let gvk = GroupVersionKind::new("", "v1", "ConfigMap");
//! let store = MemoryTransport::new();
//!
//! let created = store.create(&gvk, json!({"metadata": {"name": "a", "namespace": "ns"}})).await?;
//! assert_eq!(created["metadata"]["resourceVersion"], "1");
//!
//! store.delete(&gvk, &ObjectKey::namespaced("ns", "a")).await?;
//! assert!(store.list(&gvk).await?.items.is_empty());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{ListSnapshot, Transport, WatchNotification, WatchStream};
use crate::error::TransportError;
use crate::object::{GroupVersionKind, ObjectKey, RawObject};

type WatchSender = mpsc::UnboundedSender<Result<WatchNotification, TransportError>>;

#[derive(Default)]
struct KindState {
    objects: BTreeMap<ObjectKey, Value>,
    history: Vec<(u64, WatchNotification)>,
    watchers: Vec<WatchSender>,
    list_calls: usize,
    watch_calls: usize,
    failing_lists: usize,
}

impl KindState {
    /// Records the change and forwards it to live watchers, forgetting closed ones.
    fn record(&mut self, rv: u64, notification: WatchNotification) {
        self.history.push((rv, notification.clone()));
        self.broadcast(Ok(notification));
    }

    fn broadcast(&mut self, item: Result<WatchNotification, TransportError>) {
        self.watchers.retain(|tx| tx.send(item.clone()).is_ok());
    }
}

#[derive(Default)]
struct State {
    last_rv: u64,
    last_uid: u64,
    kinds: HashMap<GroupVersionKind, KindState>,
}

impl State {
    fn next_rv(&mut self) -> u64 {
        self.last_rv += 1;
        self.last_rv
    }
}

/// In-memory implementation of [`Transport`] with write operations.
#[derive(Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new object; fails with `Conflict` if the key is taken.
    ///
    /// Returns the stored payload with `uid` and `resourceVersion` set.
    pub async fn create(&self, gvk: &GroupVersionKind, object: Value) -> Result<Value, TransportError> {
        let key = validate(&object)?;
        let mut state = self.state.lock().await;
        let rv = state.last_rv + 1;
        state.last_uid += 1;
        let uid = format!("uid-{}", state.last_uid);

        let kind = state.kinds.entry(gvk.clone()).or_default();
        if kind.objects.contains_key(&key) {
            return Err(TransportError::Conflict(format!("{gvk} {key} already exists")));
        }

        let mut stored = object;
        set_meta(&mut stored, "uid", json!(uid));
        set_meta(&mut stored, "resourceVersion", json!(rv.to_string()));
        kind.objects.insert(key, stored.clone());
        kind.record(rv, WatchNotification::Added(stored.clone()));
        state.last_rv = rv;
        Ok(stored)
    }

    /// Replaces an existing object.
    ///
    /// A `resourceVersion` on the input must match the stored one.
    pub async fn update(&self, gvk: &GroupVersionKind, object: Value) -> Result<Value, TransportError> {
        let key = validate(&object)?;
        let mut state = self.state.lock().await;
        let rv = state.last_rv + 1;

        let kind = state.kinds.entry(gvk.clone()).or_default();
        let current = kind
            .objects
            .get(&key)
            .ok_or_else(|| TransportError::NotFound(format!("{gvk} {key}")))?;

        let expected = object["metadata"].get("resourceVersion");
        if let Some(expected) = expected {
            if Some(expected) != current["metadata"].get("resourceVersion") {
                return Err(TransportError::Conflict(format!(
                    "{gvk} {key} was modified concurrently"
                )));
            }
        }
        let uid = current["metadata"]["uid"].clone();

        let mut stored = object;
        set_meta(&mut stored, "uid", uid);
        set_meta(&mut stored, "resourceVersion", json!(rv.to_string()));
        kind.objects.insert(key, stored.clone());
        kind.record(rv, WatchNotification::Modified(stored.clone()));
        state.last_rv = rv;
        Ok(stored)
    }

    /// Removes an object; watchers receive its final state with a fresh version.
    pub async fn delete(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        let rv = state.last_rv + 1;

        let kind = state.kinds.entry(gvk.clone()).or_default();
        let mut last = kind
            .objects
            .remove(key)
            .ok_or_else(|| TransportError::NotFound(format!("{gvk} {key}")))?;
        set_meta(&mut last, "resourceVersion", json!(rv.to_string()));
        kind.record(rv, WatchNotification::Deleted(last));
        state.last_rv = rv;
        Ok(())
    }

    /// Returns the stored payload for `key`.
    pub async fn get(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> Option<Value> {
        let state = self.state.lock().await;
        state.kinds.get(gvk)?.objects.get(key).cloned()
    }

    /// Sends a notification to live watchers without touching the store.
    ///
    /// Lets tests deliver payloads the store itself would never produce.
    pub async fn inject(&self, gvk: &GroupVersionKind, notification: WatchNotification) {
        let mut state = self.state.lock().await;
        let rv = state.next_rv();
        state
            .kinds
            .entry(gvk.clone())
            .or_default()
            .record(rv, notification);
    }

    /// Terminates every live watch on `gvk` with `error`.
    pub async fn break_watches(&self, gvk: &GroupVersionKind, error: TransportError) {
        let mut state = self.state.lock().await;
        if let Some(kind) = state.kinds.get_mut(gvk) {
            kind.broadcast(Err(error));
            kind.watchers.clear();
        }
    }

    /// Makes the next `n` list calls on `gvk` fail with `Unavailable`.
    pub async fn fail_lists(&self, gvk: &GroupVersionKind, n: usize) {
        let mut state = self.state.lock().await;
        state.kinds.entry(gvk.clone()).or_default().failing_lists = n;
    }

    /// Number of `watch` invocations for `gvk`.
    pub async fn watch_calls(&self, gvk: &GroupVersionKind) -> usize {
        let state = self.state.lock().await;
        state.kinds.get(gvk).map_or(0, |k| k.watch_calls)
    }

    /// Number of `list` invocations for `gvk`.
    pub async fn list_calls(&self, gvk: &GroupVersionKind) -> usize {
        let state = self.state.lock().await;
        state.kinds.get(gvk).map_or(0, |k| k.list_calls)
    }

    /// Number of open watch streams on `gvk`.
    pub async fn open_watches(&self, gvk: &GroupVersionKind) -> usize {
        let state = self.state.lock().await;
        state
            .kinds
            .get(gvk)
            .map_or(0, |k| k.watchers.iter().filter(|tx| !tx.is_closed()).count())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn list(&self, gvk: &GroupVersionKind) -> Result<ListSnapshot, TransportError> {
        let mut state = self.state.lock().await;
        let last_rv = state.last_rv;
        let kind = state.kinds.entry(gvk.clone()).or_default();
        kind.list_calls += 1;

        if kind.failing_lists > 0 {
            kind.failing_lists -= 1;
            return Err(TransportError::Unavailable(format!("list {gvk} refused")));
        }
        Ok(ListSnapshot {
            items: kind.objects.values().cloned().collect(),
            resource_version: Some(last_rv.to_string()),
        })
    }

    async fn watch(
        &self,
        gvk: &GroupVersionKind,
        resource_version: Option<String>,
    ) -> Result<WatchStream, TransportError> {
        let from = match resource_version {
            Some(rv) => Some(
                rv.parse::<u64>()
                    .map_err(|_| TransportError::Invalid(format!("resource version {rv:?}")))?,
            ),
            None => None,
        };

        let mut state = self.state.lock().await;
        let kind = state.kinds.entry(gvk.clone()).or_default();
        kind.watch_calls += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(from) = from {
            for (_, n) in kind.history.iter().filter(|(rv, _)| *rv > from) {
                let _ = tx.send(Ok(n.clone()));
            }
        }
        kind.watchers.push(tx);
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

fn validate(object: &Value) -> Result<ObjectKey, TransportError> {
    RawObject::from_value(object.clone())
        .map(|raw| raw.key())
        .map_err(|e| TransportError::Invalid(e.to_string()))
}

fn set_meta(object: &mut Value, field: &str, value: Value) {
    if let Some(meta) = object.get_mut("metadata").and_then(Value::as_object_mut) {
        meta.insert(field.to_string(), value);
    }
}
