//! # Event handlers.
//!
//! A [`KindSource`](crate::KindSource) calls exactly one method of its
//! [`EventHandler`] per translated event, passing the work queue it was
//! started with.
//!
//! ## Provided handlers
//! - [`EnqueueRequestForObject`] enqueues the object's [`Request`] for every event.
//! - [`HandlerFns`] adapts plain closures; missing ones are no-ops.

use async_trait::async_trait;

use super::event::{CreateEvent, DeleteEvent, UpdateEvent};
use super::queue::WorkQueue;
use crate::object::{ObjectKey, Resource};

/// Reconcile request: the namespace and name of the object to reconcile.
pub type Request = ObjectKey;

/// Consumer logic mapping typed events onto a work queue.
#[async_trait]
pub trait EventHandler<K, Q>: Send + Sync + 'static
where
    K: Send + Sync + 'static,
    Q: Send + Sync + 'static,
{
    async fn on_create(&self, queue: &Q, event: CreateEvent<K>);

    async fn on_update(&self, queue: &Q, event: UpdateEvent<K>);

    async fn on_delete(&self, queue: &Q, event: DeleteEvent<K>);
}

/// Enqueues a [`Request`] for the object of every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnqueueRequestForObject;

#[async_trait]
impl<K, Q> EventHandler<K, Q> for EnqueueRequestForObject
where
    K: Resource,
    Q: WorkQueue<Request> + 'static,
{
    async fn on_create(&self, queue: &Q, event: CreateEvent<K>) {
        queue.add(event.meta.key());
    }

    async fn on_update(&self, queue: &Q, event: UpdateEvent<K>) {
        queue.add(event.meta_new.key());
    }

    async fn on_delete(&self, queue: &Q, event: DeleteEvent<K>) {
        queue.add(event.meta.key());
    }
}

type CreateFn<K, Q> = Box<dyn Fn(&Q, CreateEvent<K>) + Send + Sync>;
type UpdateFn<K, Q> = Box<dyn Fn(&Q, UpdateEvent<K>) + Send + Sync>;
type DeleteFn<K, Q> = Box<dyn Fn(&Q, DeleteEvent<K>) + Send + Sync>;

/// Closure-backed [`EventHandler`].
///
/// ```rust
/// use kindsource::{HandlerFns, ObjectKey, WorkQueue};
/// # use kindsource::{GroupVersionKind, ObjectMeta, Resource};
/// # #[derive(Clone, serde::Deserialize)]
/// # struct Pod { metadata: ObjectMeta }
/// # impl Resource for Pod {
/// #     fn gvk() -> GroupVersionKind { GroupVersionKind::new("", "v1", "Pod") }
/// #     fn meta(&self) -> &ObjectMeta { &self.metadata }
/// #     fn meta_mut(&mut self) -> &mut ObjectMeta { &mut self.metadata }
/// # }
/// use tokio::sync::mpsc::UnboundedSender;
///
/// let handler = HandlerFns::<Pod, UnboundedSender<ObjectKey>>::new()
///     .with_create(|q, evt| q.add(evt.meta.key()))
///     .with_delete(|q, evt| q.add(evt.meta.key()));
/// ```
pub struct HandlerFns<K, Q> {
    create: Option<CreateFn<K, Q>>,
    update: Option<UpdateFn<K, Q>>,
    delete: Option<DeleteFn<K, Q>>,
}

impl<K, Q> HandlerFns<K, Q> {
    pub fn new() -> Self {
        Self {
            create: None,
            update: None,
            delete: None,
        }
    }

    #[must_use]
    pub fn with_create(mut self, f: impl Fn(&Q, CreateEvent<K>) + Send + Sync + 'static) -> Self {
        self.create = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_update(mut self, f: impl Fn(&Q, UpdateEvent<K>) + Send + Sync + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_delete(mut self, f: impl Fn(&Q, DeleteEvent<K>) + Send + Sync + 'static) -> Self {
        self.delete = Some(Box::new(f));
        self
    }
}

impl<K, Q> Default for HandlerFns<K, Q> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, Q> EventHandler<K, Q> for HandlerFns<K, Q>
where
    K: Send + Sync + 'static,
    Q: Send + Sync + 'static,
{
    async fn on_create(&self, queue: &Q, event: CreateEvent<K>) {
        if let Some(f) = &self.create {
            f(queue, event);
        }
    }

    async fn on_update(&self, queue: &Q, event: UpdateEvent<K>) {
        if let Some(f) = &self.update {
            f(queue, event);
        }
    }

    async fn on_delete(&self, queue: &Q, event: DeleteEvent<K>) {
        if let Some(f) = &self.delete {
            f(queue, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Widget, widget};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_enqueue_request_for_object() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Request>();
        let w = widget("default", "w1");

        let handler = EnqueueRequestForObject;
        EventHandler::<Widget, _>::on_create(
            &handler,
            &tx,
            CreateEvent {
                meta: w.metadata.clone(),
                object: w.clone(),
            },
        )
        .await;
        EventHandler::<Widget, _>::on_delete(
            &handler,
            &tx,
            DeleteEvent {
                meta: w.metadata.clone(),
                object: None,
            },
        )
        .await;

        let expected = ObjectKey::namespaced("default", "w1");
        assert_eq!(rx.try_recv().unwrap(), expected);
        assert_eq!(rx.try_recv().unwrap(), expected);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handler_fns_skip_missing_closures() {
        let seen: std::sync::Arc<Mutex<Vec<String>>> = Default::default();
        let handler = HandlerFns::<Widget, std::sync::Arc<Mutex<Vec<String>>>>::new()
            .with_create(|q, evt| q.lock().unwrap().push(format!("create:{}", evt.meta.name)));

        let w = widget("default", "w1");
        handler
            .on_create(
                &seen,
                CreateEvent {
                    meta: w.metadata.clone(),
                    object: w.clone(),
                },
            )
            .await;
        handler
            .on_update(
                &seen,
                UpdateEvent {
                    meta_old: w.metadata.clone(),
                    object_old: w.clone(),
                    meta_new: w.metadata.clone(),
                    object_new: w,
                },
            )
            .await;

        assert_eq!(*seen.lock().unwrap(), vec!["create:w1"]);
    }
}
