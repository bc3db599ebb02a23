//! # KindSource: typed events of one kind for one consumer.
//!
//! ```text
//! KindSource::<K>::new()          Unbound
//!     └─ bind(cache)              Bound
//!         └─ start(handler, queue)
//!              ├─ cache.get_or_create(K::gvk())   (shared watch, created on first use)
//!              ├─ entry.register(SourceCallback)  (replay of cached objects, then live)
//!              └─ Bus.publish(SourceStarted)      Started
//!
//! SourceCallback::on_notification(n)
//!     ├─ translate::<K>(n) ─ Ok ─► handler.on_{create,update,delete}(&queue, evt)
//!     └─ Err ─► Bus.publish(TranslationFailed), notification dropped
//! ```
//!
//! ## Rules
//! - `bind` only from `Unbound`; `start` only from `Bound`.
//! - A failed `start` leaves the source `Bound`; a second successful one is
//!   impossible, so a handler never receives the same event twice from one source.
//! - Sources never share handler state; each gets its own callback and queue.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::event::ObjectEvent;
use super::handler::EventHandler;
use super::translate::translate;
use crate::cache::{CacheEntry, ObjectCache};
use crate::dispatch::{Callback, CallbackId, Notification};
use crate::error::SourceError;
use crate::events::{Bus, Event, EventKind};
use crate::object::{GroupVersionKind, Resource};

static SOURCE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Lifecycle phase of a [`KindSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourcePhase {
    Unbound,
    Bound,
    Started,
}

enum State {
    Unbound,
    Bound(Arc<ObjectCache>),
    Started {
        entry: Arc<CacheEntry>,
        callback: CallbackId,
    },
}

/// Source of typed create/update/delete events for kind `K`.
pub struct KindSource<K> {
    gvk: GroupVersionKind,
    name: Arc<str>,
    state: State,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KindSource<K>
where
    K: Resource + DeserializeOwned,
{
    /// Creates an unbound source, named `<Kind>#<n>` unless renamed.
    pub fn new() -> Self {
        let gvk = K::gvk();
        let name = format!("{}#{}", gvk.kind, SOURCE_SEQ.fetch_add(1, Ordering::Relaxed));
        Self {
            gvk,
            name: name.into(),
            state: State::Unbound,
            _kind: PhantomData,
        }
    }

    /// Sets the name used in runtime events and logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    pub fn phase(&self) -> SourcePhase {
        match self.state {
            State::Unbound => SourcePhase::Unbound,
            State::Bound(_) => SourcePhase::Bound,
            State::Started { .. } => SourcePhase::Started,
        }
    }

    pub fn is_started(&self) -> bool {
        self.phase() == SourcePhase::Started
    }

    /// The shared cache entry, once started.
    pub fn entry(&self) -> Option<&Arc<CacheEntry>> {
        match &self.state {
            State::Started { entry, .. } => Some(entry),
            _ => None,
        }
    }

    /// Callback registered on the entry, once started.
    pub fn callback_id(&self) -> Option<CallbackId> {
        match self.state {
            State::Started { callback, .. } => Some(callback),
            _ => None,
        }
    }

    /// Attaches the cache this source reads from.
    pub fn bind(&mut self, cache: Arc<ObjectCache>) -> Result<(), SourceError> {
        match self.state {
            State::Unbound => {
                self.state = State::Bound(cache);
                Ok(())
            }
            _ => Err(SourceError::AlreadyBound {
                kind: self.gvk.clone(),
            }),
        }
    }

    /// Starts delivering events of `K` to `handler`, which enqueues into `queue`.
    ///
    /// Obtains the shared entry for `K` (starting its watch if this is the
    /// first user) and registers a callback on it. Objects already cached are
    /// delivered as creates first.
    pub async fn start<H, Q>(&mut self, handler: H, queue: Q) -> Result<(), SourceError>
    where
        H: EventHandler<K, Q>,
        Q: Send + Sync + 'static,
    {
        let cache = match &self.state {
            State::Unbound => {
                return Err(SourceError::NotBound {
                    kind: self.gvk.clone(),
                });
            }
            State::Started { .. } => {
                return Err(SourceError::AlreadyStarted {
                    kind: self.gvk.clone(),
                });
            }
            State::Bound(cache) => Arc::clone(cache),
        };

        let entry = cache.get_or_create(&self.gvk).await?;
        let bus = cache.bus().clone();
        let callback = Arc::new(SourceCallback {
            gvk: self.gvk.clone(),
            name: Arc::clone(&self.name),
            handler,
            queue,
            bus: bus.clone(),
            _kind: PhantomData,
        });
        let callback = entry.register(callback).await;

        info!(gvk = %self.gvk, source = %self.name, "source started");
        bus.publish(
            Event::new(EventKind::SourceStarted)
                .with_gvk(&self.gvk)
                .with_source(Arc::clone(&self.name)),
        );
        self.state = State::Started { entry, callback };
        Ok(())
    }
}

impl<K> Default for KindSource<K>
where
    K: Resource + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> std::fmt::Debug for KindSource<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self.state {
            State::Unbound => SourcePhase::Unbound,
            State::Bound(_) => SourcePhase::Bound,
            State::Started { .. } => SourcePhase::Started,
        };
        f.debug_struct("KindSource")
            .field("gvk", &self.gvk)
            .field("name", &self.name)
            .field("phase", &phase)
            .finish()
    }
}

/// Translates raw notifications for one source and drives its handler.
struct SourceCallback<K, H, Q> {
    gvk: GroupVersionKind,
    name: Arc<str>,
    handler: H,
    queue: Q,
    bus: Bus,
    _kind: PhantomData<fn() -> K>,
}

#[async_trait]
impl<K, H, Q> Callback for SourceCallback<K, H, Q>
where
    K: Resource + DeserializeOwned,
    H: EventHandler<K, Q>,
    Q: Send + Sync + 'static,
{
    async fn on_notification(&self, notification: &Notification) {
        match translate::<K>(notification) {
            Ok(ObjectEvent::Create(evt)) => self.handler.on_create(&self.queue, evt).await,
            Ok(ObjectEvent::Update(evt)) => self.handler.on_update(&self.queue, evt).await,
            Ok(ObjectEvent::Delete(evt)) => self.handler.on_delete(&self.queue, evt).await,
            Err(e) => {
                let key = notification.key();
                warn!(
                    gvk = %self.gvk,
                    source = %self.name,
                    object = %key,
                    error = %e,
                    "dropping notification"
                );
                self.bus.publish(
                    Event::new(EventKind::TranslationFailed)
                        .with_gvk(&self.gvk)
                        .with_object(&key)
                        .with_source(Arc::clone(&self.name))
                        .with_reason(e.to_string()),
                );
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::error::CacheError;
    use crate::object::ObjectKey;
    use crate::source::{CreateEvent, DeleteEvent, EnqueueRequestForObject, Request, UpdateEvent};
    use crate::testing::{Widget, widget};
    use crate::transport::MemoryTransport;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn cache(transport: Arc<MemoryTransport>) -> Arc<ObjectCache> {
        ObjectCache::builder(transport)
            .with_config(CacheConfig {
                rewatch_delay: Duration::from_millis(10),
                grace: Duration::from_secs(1),
                ..CacheConfig::default()
            })
            .build()
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Request>) -> Request {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no request within timeout")
            .expect("queue closed")
    }

    #[tokio::test]
    async fn test_start_requires_bind() {
        let mut source = KindSource::<Widget>::new();
        let (tx, _rx) = mpsc::unbounded_channel::<Request>();

        let err = source.start(EnqueueRequestForObject, tx).await.unwrap_err();
        assert_eq!(err, SourceError::NotBound { kind: Widget::gvk() });
        assert_eq!(source.phase(), SourcePhase::Unbound);
    }

    #[tokio::test]
    async fn test_bind_twice_is_rejected() {
        let cache = cache(Arc::new(MemoryTransport::new()));
        let mut source = KindSource::<Widget>::new();

        source.bind(Arc::clone(&cache)).unwrap();
        let err = source.bind(Arc::clone(&cache)).unwrap_err();
        assert_eq!(err.as_label(), "source_already_bound");
        assert_eq!(source.phase(), SourcePhase::Bound);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_without_double_delivery() {
        let transport = Arc::new(MemoryTransport::new());
        let cache = cache(transport.clone());
        let mut source = KindSource::<Widget>::new().with_name("widgets");
        source.bind(Arc::clone(&cache)).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel::<Request>();
        source.start(EnqueueRequestForObject, tx.clone()).await.unwrap();
        let err = source.start(EnqueueRequestForObject, tx).await.unwrap_err();
        assert_eq!(err.as_label(), "source_already_started");

        let entry = source.entry().unwrap();
        assert_eq!(entry.callback_count().await, 1);
        assert!(entry.is_registered(source.callback_id().unwrap()).await);

        transport
            .create(&Widget::gvk(), serde_json::to_value(widget("default", "w1")).unwrap())
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await, ObjectKey::namespaced("default", "w1"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
        cache.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_on_stopped_cache_fails() {
        let cache = cache(Arc::new(MemoryTransport::new()));
        cache.shutdown().await.unwrap();

        let mut source = KindSource::<Widget>::new();
        source.bind(Arc::clone(&cache)).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel::<Request>();

        let err = source.start(EnqueueRequestForObject, tx).await.unwrap_err();
        assert_eq!(err, SourceError::Cache(CacheError::Stopped));
        assert_eq!(source.phase(), SourcePhase::Bound);
    }

    #[tokio::test]
    async fn test_undecodable_object_is_reported_and_skipped() {
        let transport = Arc::new(MemoryTransport::new());
        let cache = cache(transport.clone());
        let mut events = cache.subscribe_events();
        let mut source = KindSource::<Widget>::new().with_name("widgets");
        source.bind(Arc::clone(&cache)).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel::<Request>();
        source.start(EnqueueRequestForObject, tx).await.unwrap();
        assert!(cache.wait_for_cache_sync().await);

        let gvk = Widget::gvk();
        transport
            .create(
                &gvk,
                json!({"metadata": {"name": "bad", "namespace": "default"}, "spec": {"size": "huge"}}),
            )
            .await
            .unwrap();
        transport
            .create(&gvk, serde_json::to_value(widget("default", "good")).unwrap())
            .await
            .unwrap();

        assert_eq!(next(&mut rx).await, ObjectKey::namespaced("default", "good"));

        let failed = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let ev = events.recv().await.unwrap();
                if ev.kind == EventKind::TranslationFailed {
                    return ev;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(failed.source.as_deref(), Some("widgets"));
        assert_eq!(failed.object.as_deref(), Some("default/bad"));
        cache.shutdown().await.unwrap();
    }

    struct Ops;

    #[async_trait::async_trait]
    impl EventHandler<Widget, mpsc::UnboundedSender<String>> for Ops {
        async fn on_create(&self, queue: &mpsc::UnboundedSender<String>, evt: CreateEvent<Widget>) {
            let _ = queue.send(format!("create:{}", evt.object.spec.size));
        }
        async fn on_update(&self, queue: &mpsc::UnboundedSender<String>, evt: UpdateEvent<Widget>) {
            let _ = queue.send(format!("update:{}", evt.object_new.spec.size));
        }
        async fn on_delete(&self, queue: &mpsc::UnboundedSender<String>, evt: DeleteEvent<Widget>) {
            let size = evt.object.map(|w| w.spec.size);
            let _ = queue.send(format!("delete:{}:{size:?}", evt.meta.name));
        }
    }

    #[tokio::test]
    async fn test_object_repaired_after_malformed_create_is_delivered() {
        let transport = Arc::new(MemoryTransport::new());
        let cache = cache(transport.clone());
        let mut source = KindSource::<Widget>::new();
        source.bind(Arc::clone(&cache)).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        source.start(Ops, tx).await.unwrap();
        assert!(cache.wait_for_cache_sync().await);

        let gvk = Widget::gvk();
        transport
            .create(
                &gvk,
                json!({"metadata": {"name": "w", "namespace": "default"}, "spec": {"size": "huge"}}),
            )
            .await
            .unwrap();
        let mut repaired = widget("default", "w");
        repaired.spec.size = 3;
        transport
            .update(&gvk, serde_json::to_value(&repaired).unwrap())
            .await
            .unwrap();
        repaired.spec.size = 4;
        transport
            .update(&gvk, serde_json::to_value(&repaired).unwrap())
            .await
            .unwrap();
        transport
            .delete(&gvk, &ObjectKey::namespaced("default", "w"))
            .await
            .unwrap();

        let mut ops = Vec::new();
        for _ in 0..3 {
            let op = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("no event within timeout")
                .expect("queue closed");
            ops.push(op);
        }
        assert_eq!(ops, vec!["create:3", "update:4", "delete:w:Some(4)"]);
        cache.shutdown().await.unwrap();
    }
}
