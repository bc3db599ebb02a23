//! # ObjectCache: one shared watch per kind.
//!
//! The [`ObjectCache`] maps each [`GroupVersionKind`] to a [`CacheEntry`] and
//! creates entries lazily, the first time a kind is asked for. Creating an
//! entry spawns its listener, which is the only watch ever opened for that kind
//! by this cache.
//!
//! ```text
//! KindSource<Deployment> ─┐
//! KindSource<Deployment> ─┼─► get_or_create(apps/v1 Deployment) ──► CacheEntry ◄── Listener ◄── Transport
//! cache.get::<Deployment>─┘
//! KindSource<Foo> ──────────► get_or_create(example.com/v1 Foo) ──► CacheEntry ◄── Listener ◄── Transport
//!
//! Runtime events:
//!   listeners / workers / sources ── publish ──► Bus ──► forwarder ──► SubscriberSet
//!
//! Shutdown:
//!   shutdown()
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► token.cancel()        → listeners and callback workers stop
//!     └─► join within cfg.grace
//!            ├─ all joined      → Bus.publish(AllStoppedWithin)
//!            └─ timeout         → Bus.publish(GraceExceeded), abort stragglers
//!     └─► drain subscribers
//! ```
//!
//! ## Rules
//! - Concurrent `get_or_create` for the same kind yields the same entry and one
//!   listener (checked again under the write lock).
//! - After the stop signal no new entry is created.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::builder::ObjectCacheBuilder;
use super::entry::CacheEntry;
use super::listener::Listener;
use super::{CacheConfig, shutdown};
use crate::error::{CacheError, RuntimeError, TranslateError};
use crate::events::{Bus, Event, EventKind};
use crate::object::{GroupVersionKind, ObjectKey, Resource};
use crate::subscribers::SubscriberSet;
use crate::transport::Transport;

/// Shared, lazily populated cache of watched kinds.
pub struct ObjectCache {
    cfg: CacheConfig,
    transport: Arc<dyn Transport>,
    entries: RwLock<HashMap<GroupVersionKind, Arc<CacheEntry>>>,
    bus: Bus,
    token: CancellationToken,
    events_token: CancellationToken,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    stopping: AtomicBool,
}

impl ObjectCache {
    /// Starts building a cache over `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> ObjectCacheBuilder {
        ObjectCacheBuilder::new(transport)
    }

    pub(crate) fn new_internal(
        cfg: CacheConfig,
        transport: Arc<dyn Transport>,
        bus: Bus,
        subs: SubscriberSet,
    ) -> Self {
        let events_token = CancellationToken::new();
        let forwarder = subscriber_listener(&bus, subs, events_token.clone());
        Self {
            cfg,
            transport,
            entries: RwLock::new(HashMap::new()),
            bus,
            token: CancellationToken::new(),
            events_token,
            forwarder: Mutex::new(Some(forwarder)),
            stopping: AtomicBool::new(false),
        }
    }

    /// Returns the entry for `gvk`, creating it and starting its watch on first use.
    ///
    /// Fails with [`CacheError::Stopped`] once the cache has been shut down.
    pub async fn get_or_create(
        &self,
        gvk: &GroupVersionKind,
    ) -> Result<Arc<CacheEntry>, CacheError> {
        if self.token.is_cancelled() {
            return Err(CacheError::Stopped);
        }
        if let Some(entry) = self.entries.read().await.get(gvk) {
            return Ok(Arc::clone(entry));
        }

        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(gvk) {
            return Ok(Arc::clone(entry));
        }
        if self.token.is_cancelled() {
            return Err(CacheError::Stopped);
        }

        let entry = Arc::new(CacheEntry::new(
            gvk.clone(),
            self.bus.clone(),
            self.token.clone(),
            self.cfg.backlog_warn(),
        ));
        let listener = Listener {
            entry: Arc::clone(&entry),
            transport: Arc::clone(&self.transport),
            bus: self.bus.clone(),
            token: self.token.clone(),
            rewatch_delay: self.cfg.rewatch_delay,
            resync_period: self.cfg.resync_period(),
        };
        entry.set_listener(tokio::spawn(listener.run())).await;
        entries.insert(gvk.clone(), Arc::clone(&entry));

        info!(gvk = %gvk, "watch started");
        self.bus
            .publish(Event::new(EventKind::WatchStarted).with_gvk(gvk));
        Ok(entry)
    }

    /// Returns the entry for `gvk` if one exists; never starts a watch.
    pub async fn entry(&self, gvk: &GroupVersionKind) -> Option<Arc<CacheEntry>> {
        self.entries.read().await.get(gvk).cloned()
    }

    /// Reads one cached object as `K`.
    ///
    /// `Ok(None)` when the object is not cached or `K` is not watched yet.
    pub async fn get<K>(&self, key: &ObjectKey) -> Result<Option<K>, TranslateError>
    where
        K: Resource + DeserializeOwned,
    {
        let gvk = K::gvk();
        let Some(entry) = self.entry(&gvk).await else {
            return Ok(None);
        };
        entry
            .get(key)
            .await
            .map(|raw| raw.decode(&gvk))
            .transpose()
    }

    /// Reads every cached object of `K`, ordered by key.
    pub async fn list<K>(&self) -> Result<Vec<K>, TranslateError>
    where
        K: Resource + DeserializeOwned,
    {
        let gvk = K::gvk();
        let Some(entry) = self.entry(&gvk).await else {
            return Ok(Vec::new());
        };
        entry
            .list()
            .await
            .iter()
            .map(|raw| raw.decode(&gvk))
            .collect()
    }

    /// Waits until every entry created so far has applied its initial list.
    ///
    /// Returns `false` if the cache stopped first.
    pub async fn wait_for_cache_sync(&self) -> bool {
        let entries: Vec<Arc<CacheEntry>> = self.entries.read().await.values().cloned().collect();
        for entry in entries {
            if !entry.wait_for_sync().await {
                return false;
            }
        }
        true
    }

    /// Number of watches opened, one per kind.
    pub async fn watch_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Watched kinds, sorted.
    pub async fn kinds(&self) -> Vec<GroupVersionKind> {
        let mut kinds: Vec<GroupVersionKind> =
            self.entries.read().await.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Receiver of runtime events published after this call.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &CacheConfig {
        &self.cfg
    }

    /// Whether the stop signal has been given.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stops every watch and callback worker, waiting up to `cfg.grace`.
    ///
    /// Handlers already running finish their current notification; nothing new
    /// is delivered. Calling it again is a no-op.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!("object cache stopping");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.token.cancel();

        let entries: Vec<Arc<CacheEntry>> = self.entries.read().await.values().cloned().collect();
        let mut tasks: Vec<(String, Vec<JoinHandle<()>>)> = Vec::with_capacity(entries.len());
        for entry in entries {
            tasks.push((entry.gvk().to_string(), entry.take_tasks().await));
        }

        let grace = self.cfg.grace;
        let done = async {
            for (_, handles) in tasks.iter_mut() {
                for handle in handles.iter_mut() {
                    let _ = handle.await;
                }
            }
        };
        let joined = tokio::time::timeout(grace, done).await;
        let result = match joined {
            Ok(()) => {
                debug!("all watches and workers stopped");
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let mut stuck = Vec::new();
                for (kind, handles) in &tasks {
                    let mut kind_stuck = false;
                    for handle in handles.iter().filter(|h| !h.is_finished()) {
                        handle.abort();
                        kind_stuck = true;
                    }
                    if kind_stuck {
                        stuck.push(kind.clone());
                    }
                }
                warn!(?grace, ?stuck, "grace period exceeded");
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        };

        self.events_token.cancel();
        if let Some(forwarder) = self.forwarder.lock().await.take() {
            let _ = forwarder.await;
        }
        result
    }

    /// Runs until a termination signal arrives or `shutdown` is called elsewhere,
    /// then stops gracefully.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => {
                if let Err(e) = res {
                    warn!(error = %e, "signal registration failed, stopping");
                }
            }
            _ = self.token.cancelled() => {}
        }
        self.shutdown().await
    }
}

impl std::fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCache")
            .field("cfg", &self.cfg)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled.
///
/// Pending events are drained before stopping.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        subs.shutdown().await;
    })
}
