use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kindsource::{
    CacheConfig, CreateEvent, DeleteEvent, Event, EventHandler, EventKind, GroupVersionKind,
    KindSource, MemoryTransport, ObjectCache, ObjectEvent, ObjectKey, ObjectMeta, Resource,
    Subscribe, TransportError, UpdateEvent, WatchNotification,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct DeploymentSpec {
    replicas: u32,
    image: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Deployment {
    metadata: ObjectMeta,
    spec: DeploymentSpec,
}

impl Resource for Deployment {
    fn gvk() -> GroupVersionKind {
        GroupVersionKind::new("apps", "v1", "Deployment")
    }
    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct FooSpec {
    #[serde(default)]
    count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Foo {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: FooSpec,
}

impl Resource for Foo {
    fn gvk() -> GroupVersionKind {
        GroupVersionKind::new("chaosapps.metamagical.io", "v1", "Foo")
    }
    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Opaque queue handed to a source; handlers check they got the right one.
#[derive(Debug, Default)]
struct Queue {
    id: u32,
}

/// Forwards every typed event to a channel after checking the queue identity.
struct Recorder<K> {
    queue: Arc<Queue>,
    tx: mpsc::UnboundedSender<ObjectEvent<K>>,
}

#[async_trait]
impl<K: Resource> EventHandler<K, Arc<Queue>> for Recorder<K> {
    async fn on_create(&self, queue: &Arc<Queue>, event: CreateEvent<K>) {
        assert!(Arc::ptr_eq(queue, &self.queue), "wrong queue {}", queue.id);
        let _ = self.tx.send(ObjectEvent::Create(event));
    }
    async fn on_update(&self, queue: &Arc<Queue>, event: UpdateEvent<K>) {
        assert!(Arc::ptr_eq(queue, &self.queue), "wrong queue {}", queue.id);
        let _ = self.tx.send(ObjectEvent::Update(event));
    }
    async fn on_delete(&self, queue: &Arc<Queue>, event: DeleteEvent<K>) {
        assert!(Arc::ptr_eq(queue, &self.queue), "wrong queue {}", queue.id);
        let _ = self.tx.send(ObjectEvent::Delete(event));
    }
}

type Events<K> = mpsc::UnboundedReceiver<ObjectEvent<K>>;

fn new_cache(transport: &Arc<MemoryTransport>) -> Arc<ObjectCache> {
    ObjectCache::builder(transport.clone())
        .with_config(CacheConfig {
            rewatch_delay: Duration::from_millis(10),
            grace: Duration::from_secs(2),
            ..CacheConfig::default()
        })
        .build()
}

async fn start_source<K>(cache: &Arc<ObjectCache>, id: u32) -> (KindSource<K>, Events<K>)
where
    K: Resource + serde::de::DeserializeOwned,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let queue = Arc::new(Queue { id });
    let mut source = KindSource::<K>::new().with_name(format!("source-{id}"));
    source.bind(Arc::clone(cache)).unwrap();
    source
        .start(
            Recorder {
                queue: Arc::clone(&queue),
                tx,
            },
            queue,
        )
        .await
        .unwrap();
    (source, rx)
}

async fn next<K>(rx: &mut Events<K>) -> ObjectEvent<K> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no event within timeout")
        .expect("handler channel closed")
}

async fn assert_quiet<K: std::fmt::Debug>(rx: &mut Events<K>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Ok(evt) = rx.try_recv() {
        panic!("unexpected extra event {evt:?}");
    }
}

async fn wait_for_open_watch(transport: &MemoryTransport, gvk: &GroupVersionKind) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.open_watches(gvk).await == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("watch was not opened");
}

fn decode<K: serde::de::DeserializeOwned>(value: Value) -> K {
    serde_json::from_value(value).unwrap()
}

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn deployment(ns: &str, name: &str) -> Deployment {
    let mut metadata = ObjectMeta::named(name).in_namespace(ns);
    metadata.labels = labels(&[("foo", "bar")]);
    Deployment {
        metadata,
        spec: DeploymentSpec {
            replicas: 1,
            image: "nginx".to_string(),
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deployment_lifecycle_reaches_every_source_in_order() {
    let transport = Arc::new(MemoryTransport::new());
    let cache = new_cache(&transport);
    let gvk = Deployment::gvk();

    let (_s1, mut rx1) = start_source::<Deployment>(&cache, 1).await;
    let (_s2, mut rx2) = start_source::<Deployment>(&cache, 2).await;
    assert!(cache.wait_for_cache_sync().await);
    wait_for_open_watch(&transport, &gvk).await;
    assert_eq!(cache.watch_count().await, 1);
    assert_eq!(transport.watch_calls(&gvk).await, 1);

    // Create.
    let created: Deployment = decode(
        transport
            .create(&gvk, serde_json::to_value(deployment("default", "deployment-name")).unwrap())
            .await
            .unwrap(),
    );
    for rx in [&mut rx1, &mut rx2] {
        match next(rx).await {
            ObjectEvent::Create(evt) => {
                assert_eq!(evt.meta, created.metadata);
                assert_eq!(evt.object, created);
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    // Update labels.
    let mut changed = created.clone();
    changed.metadata.labels = labels(&[("biz", "buz")]);
    let updated: Deployment = decode(
        transport
            .update(&gvk, serde_json::to_value(&changed).unwrap())
            .await
            .unwrap(),
    );
    for rx in [&mut rx1, &mut rx2] {
        match next(rx).await {
            ObjectEvent::Update(evt) => {
                assert_eq!(evt.meta_old.labels, labels(&[("foo", "bar")]));
                assert_eq!(evt.meta_new.labels, labels(&[("biz", "buz")]));
                assert_eq!(evt.object_old, created);
                assert_eq!(evt.object_new, updated);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    // Delete.
    transport
        .delete(&gvk, &ObjectKey::namespaced("default", "deployment-name"))
        .await
        .unwrap();
    let mut tombstone = updated.clone();
    tombstone.metadata.resource_version = None;
    for rx in [&mut rx1, &mut rx2] {
        match next(rx).await {
            ObjectEvent::Delete(evt) => {
                assert_eq!(evt.meta, tombstone.metadata);
                assert_eq!(evt.object.as_ref(), Some(&tombstone));
            }
            other => panic!("expected delete, got {other:?}"),
        }
    }

    assert_quiet(&mut rx1).await;
    assert_quiet(&mut rx2).await;
    assert_eq!(transport.watch_calls(&gvk).await, 1);
    cache.shutdown().await.unwrap();
}

#[tokio::test]
async fn custom_resource_kind_gets_the_same_contract() {
    let transport = Arc::new(MemoryTransport::new());
    let cache = new_cache(&transport);
    let gvk = Foo::gvk();

    let (_source, mut rx) = start_source::<Foo>(&cache, 1).await;
    assert!(cache.wait_for_cache_sync().await);

    let foo = Foo {
        metadata: ObjectMeta::named("foo-1").in_namespace("chaos"),
        spec: FooSpec { count: 3 },
    };
    let created: Foo = decode(
        transport
            .create(&gvk, serde_json::to_value(&foo).unwrap())
            .await
            .unwrap(),
    );
    match next(&mut rx).await {
        ObjectEvent::Create(evt) => assert_eq!(evt.object, created),
        other => panic!("expected create, got {other:?}"),
    }

    transport
        .delete(&gvk, &ObjectKey::namespaced("chaos", "foo-1"))
        .await
        .unwrap();
    match next(&mut rx).await {
        ObjectEvent::Delete(evt) => {
            assert_eq!(evt.meta.name, "foo-1");
            assert_eq!(evt.meta.resource_version, None);
            assert_eq!(evt.object.map(|f| f.spec), Some(FooSpec { count: 3 }));
        }
        other => panic!("expected delete, got {other:?}"),
    }

    assert_eq!(cache.kinds().await, vec![gvk]);
    cache.shutdown().await.unwrap();
}

#[tokio::test]
async fn late_source_is_replayed_then_follows_live_changes() {
    let transport = Arc::new(MemoryTransport::new());
    let gvk = Deployment::gvk();
    for name in ["b", "a"] {
        transport
            .create(&gvk, serde_json::to_value(deployment("default", name)).unwrap())
            .await
            .unwrap();
    }
    let cache = new_cache(&transport);

    let (_early, mut early_rx) = start_source::<Deployment>(&cache, 1).await;
    assert!(cache.wait_for_cache_sync().await);
    for _ in 0..2 {
        assert!(matches!(next(&mut early_rx).await, ObjectEvent::Create(_)));
    }

    let (_late, mut late_rx) = start_source::<Deployment>(&cache, 2).await;
    let replayed: Vec<String> = vec![next(&mut late_rx).await, next(&mut late_rx).await]
        .into_iter()
        .map(|evt| {
            assert!(matches!(evt, ObjectEvent::Create(_)));
            evt.meta().name.clone()
        })
        .collect();
    assert_eq!(replayed, vec!["a", "b"]);

    transport
        .delete(&gvk, &ObjectKey::namespaced("default", "a"))
        .await
        .unwrap();
    for rx in [&mut early_rx, &mut late_rx] {
        match next(rx).await {
            ObjectEvent::Delete(evt) => assert_eq!(evt.meta.name, "a"),
            other => panic!("expected delete, got {other:?}"),
        }
    }
    assert_eq!(cache.watch_count().await, 1);
    cache.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_notification_does_not_stop_the_stream() {
    let transport = Arc::new(MemoryTransport::new());
    let cache = new_cache(&transport);
    let gvk = Deployment::gvk();
    let mut runtime_events = cache.subscribe_events();

    let (_source, mut rx) = start_source::<Deployment>(&cache, 1).await;
    assert!(cache.wait_for_cache_sync().await);
    wait_for_open_watch(&transport, &gvk).await;

    transport
        .inject(&gvk, WatchNotification::Added(json!({"spec": {"replicas": 1}})))
        .await;
    transport
        .create(&gvk, serde_json::to_value(deployment("default", "ok")).unwrap())
        .await
        .unwrap();

    match next(&mut rx).await {
        ObjectEvent::Create(evt) => assert_eq!(evt.meta.name, "ok"),
        other => panic!("expected create, got {other:?}"),
    }

    let dropped = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let ev = runtime_events.recv().await.unwrap();
            if ev.kind == EventKind::TranslationFailed {
                return ev;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(dropped.gvk.as_deref(), Some("apps/v1, Kind=Deployment"));
    cache.shutdown().await.unwrap();
}

#[tokio::test]
async fn broken_watch_is_recovered_without_losing_changes() {
    let transport = Arc::new(MemoryTransport::new());
    let gvk = Deployment::gvk();
    for name in ["keep", "drop"] {
        transport
            .create(&gvk, serde_json::to_value(deployment("default", name)).unwrap())
            .await
            .unwrap();
    }
    let cache = new_cache(&transport);
    let (_source, mut rx) = start_source::<Deployment>(&cache, 1).await;
    assert!(cache.wait_for_cache_sync().await);
    for _ in 0..2 {
        assert!(matches!(next(&mut rx).await, ObjectEvent::Create(_)));
    }
    wait_for_open_watch(&transport, &gvk).await;

    transport
        .break_watches(&gvk, TransportError::Unavailable("connection reset".into()))
        .await;

    let keep = transport
        .get(&gvk, &ObjectKey::namespaced("default", "keep"))
        .await
        .unwrap();
    let mut keep: Deployment = decode(keep);
    keep.spec.replicas = 3;
    transport
        .update(&gvk, serde_json::to_value(&keep).unwrap())
        .await
        .unwrap();
    transport
        .delete(&gvk, &ObjectKey::namespaced("default", "drop"))
        .await
        .unwrap();
    transport
        .create(&gvk, serde_json::to_value(deployment("default", "new")).unwrap())
        .await
        .unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let evt = next(&mut rx).await;
        seen.push(format!("{}:{}", evt.op(), evt.meta().name));
    }
    seen.sort();
    assert_eq!(seen, vec!["create:new", "delete:drop", "update:keep"]);
    assert_quiet(&mut rx).await;

    assert!(transport.watch_calls(&gvk).await >= 2);
    assert_eq!(cache.watch_count().await, 1);
    cache.shutdown().await.unwrap();
}

#[derive(Default)]
struct KindLog {
    kinds: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for KindLog {
    async fn on_event(&self, ev: &Event) {
        self.kinds.lock().unwrap().push(ev.kind);
    }
    fn name(&self) -> &'static str {
        "kind-log"
    }
}

#[tokio::test]
async fn subscribers_observe_runtime_lifecycle() {
    let transport = Arc::new(MemoryTransport::new());
    let log = Arc::new(KindLog::default());
    let cache = ObjectCache::builder(transport.clone())
        .with_config(CacheConfig {
            grace: Duration::from_secs(2),
            ..CacheConfig::default()
        })
        .with_subscribers(vec![log.clone()])
        .build();

    let (_source, _rx) = start_source::<Deployment>(&cache, 1).await;
    assert!(cache.wait_for_cache_sync().await);
    cache.shutdown().await.unwrap();

    let kinds = log.kinds.lock().unwrap().clone();
    for expected in [
        EventKind::WatchStarted,
        EventKind::CacheSynced,
        EventKind::SourceStarted,
        EventKind::ShutdownRequested,
        EventKind::AllStoppedWithin,
    ] {
        assert!(kinds.contains(&expected), "missing {expected:?} in {kinds:?}");
    }
    assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nothing_is_delivered_after_shutdown() {
    let transport = Arc::new(MemoryTransport::new());
    let cache = new_cache(&transport);
    let gvk = Deployment::gvk();

    let (_s1, mut rx1) = start_source::<Deployment>(&cache, 1).await;
    let (_s2, mut rx2) = start_source::<Deployment>(&cache, 2).await;
    assert!(cache.wait_for_cache_sync().await);
    wait_for_open_watch(&transport, &gvk).await;

    transport
        .create(&gvk, serde_json::to_value(deployment("default", "before")).unwrap())
        .await
        .unwrap();
    for rx in [&mut rx1, &mut rx2] {
        assert!(matches!(next(rx).await, ObjectEvent::Create(_)));
    }

    cache.shutdown().await.unwrap();
    assert!(cache.is_stopped());

    transport
        .create(&gvk, serde_json::to_value(deployment("default", "after")).unwrap())
        .await
        .unwrap();
    let mut updated = deployment("default", "before");
    updated.spec.replicas = 5;
    transport
        .update(&gvk, serde_json::to_value(&updated).unwrap())
        .await
        .unwrap();
    transport
        .delete(&gvk, &ObjectKey::namespaced("default", "before"))
        .await
        .unwrap();

    // Workers are gone, so each handler channel closes without another event.
    for rx in [&mut rx1, &mut rx2] {
        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("handler channel still open after shutdown");
        assert!(closed.is_none(), "event after shutdown: {closed:?}");
    }
}
