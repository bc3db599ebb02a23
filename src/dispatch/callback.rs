//! # Raw notification callback.
//!
//! A [`Callback`] is registered on a [`CacheEntry`](crate::CacheEntry) and
//! receives every [`Notification`] the entry applies, on its own worker task.
//! [`KindSource`](crate::KindSource) registers one per start; other consumers
//! may register their own.

use async_trait::async_trait;

use super::Notification;

/// Receiver of raw notifications for one cache entry.
///
/// Notifications arrive one at a time, in the order the entry applied them.
/// A slow implementation only delays its own queue.
#[async_trait]
pub trait Callback: Send + Sync + 'static {
    async fn on_notification(&self, notification: &Notification);

    /// Name used in runtime events and logs.
    fn name(&self) -> &str;
}
