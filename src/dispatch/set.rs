//! # Loss-free fan-out of notifications to callbacks.
//!
//! [`CallbackSet`] replicates every notification of one cache entry to every
//! registered callback.
//!
//! ```text
//! dispatch(n)            (Arc-clone per callback)
//!     │
//!     ├──► [queue C1] ──► worker C1 ──► c1.on_notification()
//!     ├──► [queue C2] ──► worker C2 ──► c2.on_notification()
//!     └──► [queue CN] ──► worker CN ──► cN.on_notification()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `dispatch()` never awaits; queues are unbounded so the
//!   listener cannot be stalled by a callback.
//! - **Per-callback FIFO**: each callback sees notifications in dispatch order.
//! - **No loss**: nothing is dropped for a slow callback; its backlog grows and
//!   `CallbackBacklog` is published each time it crosses the threshold.
//! - **Isolation**: panics are caught, published as `CallbackPanicked`, and the
//!   worker moves on.
//! - **Stop**: once the token is cancelled a worker finishes the notification it
//!   is handling and starts no other.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{Callback, Notification, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::object::GroupVersionKind;

static CALLBACK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identifier of a registered callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    fn next() -> Self {
        Self(CALLBACK_SEQ.fetch_add(1, Ordering::Relaxed))
    }
}

struct CallbackChannel {
    id: CallbackId,
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Arc<Notification>>,
    pending: Arc<AtomicUsize>,
}

/// Per-entry set of callbacks with one queue and worker each.
pub(crate) struct CallbackSet {
    gvk: GroupVersionKind,
    channels: Vec<CallbackChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
    token: CancellationToken,
    backlog_warn: Option<usize>,
}

impl CallbackSet {
    pub(crate) fn new(
        gvk: GroupVersionKind,
        bus: Bus,
        token: CancellationToken,
        backlog_warn: Option<usize>,
    ) -> Self {
        Self {
            gvk,
            channels: Vec::new(),
            workers: Vec::new(),
            bus,
            token,
            backlog_warn,
        }
    }

    /// Registers `callback` and spawns its worker.
    ///
    /// `replay` is queued ahead of any later dispatch, so the callback first
    /// catches up with the existing state and then follows live changes.
    pub(crate) fn add(
        &mut self,
        callback: Arc<dyn Callback>,
        replay: Vec<Notification>,
    ) -> CallbackId {
        let id = CallbackId::next();
        let name: Arc<str> = callback.name().into();
        let (tx, rx) = mpsc::unbounded_channel::<Arc<Notification>>();
        let pending = Arc::new(AtomicUsize::new(0));

        let channel = CallbackChannel {
            id,
            name: Arc::clone(&name),
            sender: tx,
            pending: Arc::clone(&pending),
        };
        for n in replay {
            self.send(&channel, Arc::new(n));
        }

        let worker = Worker {
            gvk: self.gvk.clone(),
            name,
            callback,
            pending,
            bus: self.bus.clone(),
            token: self.token.clone(),
        };
        self.workers.push(tokio::spawn(worker.run(rx)));
        self.channels.push(channel);
        id
    }

    /// Fans one notification out to every callback.
    pub(crate) fn dispatch(&self, notification: Notification) {
        let notification = Arc::new(notification);
        for channel in &self.channels {
            self.send(channel, Arc::clone(&notification));
        }
        trace!(
            gvk = %self.gvk,
            op = notification.op(),
            object = %notification.key(),
            callbacks = self.channels.len(),
            "notification dispatched"
        );
    }

    fn send(&self, channel: &CallbackChannel, notification: Arc<Notification>) {
        // Counted before the send: the worker may take the item and decrement
        // before this call returns.
        let pending = channel.pending.fetch_add(1, Ordering::Relaxed) + 1;
        // A closed queue means the worker stopped on cancellation.
        if channel.sender.send(notification).is_err() {
            channel.pending.fetch_sub(1, Ordering::Relaxed);
            return;
        }
        if self.backlog_warn == Some(pending) {
            self.bus.publish(
                Event::new(EventKind::CallbackBacklog)
                    .with_gvk(&self.gvk)
                    .with_source(Arc::clone(&channel.name))
                    .with_count(pending),
            );
        }
    }

    pub(crate) fn contains(&self, id: CallbackId) -> bool {
        self.channels.iter().any(|c| c.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.channels.len()
    }

    /// Takes the worker handles so shutdown can await them.
    pub(crate) fn take_workers(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.workers)
    }
}

struct Worker {
    gvk: GroupVersionKind,
    name: Arc<str>,
    callback: Arc<dyn Callback>,
    pending: Arc<AtomicUsize>,
    bus: Bus,
    token: CancellationToken,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Arc<Notification>>) {
        loop {
            let notification = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(n) => n,
                    None => break,
                },
            };
            self.pending.fetch_sub(1, Ordering::Relaxed);

            let fut = self.callback.on_notification(notification.as_ref());
            if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                self.bus.publish(
                    Event::new(EventKind::CallbackPanicked)
                        .with_gvk(&self.gvk)
                        .with_source(Arc::clone(&self.name))
                        .with_object(&notification.key())
                        .with_reason(panic_message(panic_err.as_ref())),
                );
            }
        }
        trace!(gvk = %self.gvk, callback = %self.name, "callback worker stopped");
    }
}
