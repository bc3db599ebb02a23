//! # Work queue seam.
//!
//! Handlers push reconcile requests into a [`WorkQueue`]; the queue itself
//! (rate limiting, de-duplication, workers) belongs to the consumer.

use std::sync::Arc;

use tokio::sync::mpsc;

/// Destination for items produced by event handlers.
pub trait WorkQueue<T>: Send + Sync {
    fn add(&self, item: T);
}

impl<T: Send> WorkQueue<T> for mpsc::UnboundedSender<T> {
    fn add(&self, item: T) {
        // Receiver gone means the consumer stopped; nothing left to notify.
        let _ = self.send(item);
    }
}

impl<T, Q> WorkQueue<T> for Arc<Q>
where
    Q: WorkQueue<T> + ?Sized,
{
    fn add(&self, item: T) {
        (**self).add(item);
    }
}
