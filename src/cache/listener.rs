//! # Watch listener: keeps one cache entry in step with the transport.
//!
//! ```text
//! loop {
//!   list(gvk) ──► decode metadata ──► entry.replace(diff) ──► first time: CacheSynced
//!     │ Err → ListFailed, sleep(rewatch_delay), retry
//!   watch(gvk, rv)
//!     │ Err → WatchFailed, sleep(rewatch_delay), re-list
//!   consume:
//!     ├─ item Ok   → decode metadata → entry.apply(change)
//!     │              (undecodable → TranslationFailed, dropped)
//!     ├─ item Err  → WatchFailed
//!     ├─ end       → WatchClosed
//!     └─ resync tick → entry.resync() → Resynced
//!   sleep(rewatch_delay), re-list
//! }
//! ```
//!
//! Cancellation is observed at every await point; in-flight store mutations
//! finish before the task returns.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::{Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::entry::CacheEntry;
use super::store::Change;
use crate::error::TransportError;
use crate::events::{Bus, Event, EventKind};
use crate::object::RawObject;
use crate::transport::{Transport, WatchNotification, WatchStream};

/// Why a watch stopped being consumed.
enum WatchOutcome {
    Cancelled,
    Failed(TransportError),
    Closed,
}

pub(crate) struct Listener {
    pub(crate) entry: Arc<CacheEntry>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) bus: Bus,
    pub(crate) token: CancellationToken,
    pub(crate) rewatch_delay: Duration,
    pub(crate) resync_period: Option<Duration>,
}

impl Listener {
    pub(crate) async fn run(self) {
        let gvk = self.entry.gvk().clone();
        debug!(gvk = %gvk, "listener started");

        loop {
            let Some(rv) = self.relist().await else {
                if self.token.is_cancelled() || !self.pause().await {
                    break;
                }
                continue;
            };

            let opened = tokio::select! {
                _ = self.token.cancelled() => break,
                res = self.transport.watch(&gvk, rv) => res,
            };
            let outcome = match opened {
                Ok(stream) => self.consume(stream).await,
                Err(e) => WatchOutcome::Failed(e),
            };

            match outcome {
                WatchOutcome::Cancelled => break,
                WatchOutcome::Failed(e) => {
                    warn!(gvk = %gvk, error = %e, "watch failed, re-listing");
                    self.bus.publish(
                        Event::new(EventKind::WatchFailed)
                            .with_gvk(&gvk)
                            .with_reason(e.to_string()),
                    );
                }
                WatchOutcome::Closed => {
                    debug!(gvk = %gvk, "watch closed, re-listing");
                    self.bus
                        .publish(Event::new(EventKind::WatchClosed).with_gvk(&gvk));
                }
            }
            if !self.pause().await {
                break;
            }
        }
        debug!(gvk = %gvk, "listener stopped");
    }

    /// Lists the kind and applies the difference; returns the version to watch from.
    ///
    /// `None` when the list failed or the cache stopped.
    async fn relist(&self) -> Option<Option<String>> {
        let gvk = self.entry.gvk();
        let listed = tokio::select! {
            _ = self.token.cancelled() => return None,
            res = self.transport.list(gvk) => res,
        };
        let snapshot = match listed {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(gvk = %gvk, error = %e, "list failed, retrying");
                self.bus.publish(
                    Event::new(EventKind::ListFailed)
                        .with_gvk(gvk)
                        .with_reason(e.to_string()),
                );
                return None;
            }
        };

        let objects: Vec<RawObject> = snapshot
            .items
            .into_iter()
            .filter_map(|value| self.decode(value))
            .collect();
        let count = objects.len();
        let changed = self.entry.replace(objects).await;

        if self.entry.mark_synced() {
            debug!(gvk = %gvk, objects = count, "cache synced");
            self.bus.publish(
                Event::new(EventKind::CacheSynced)
                    .with_gvk(gvk)
                    .with_count(count),
            );
        } else {
            debug!(gvk = %gvk, objects = count, changed, "re-listed");
        }
        Some(snapshot.resource_version)
    }

    async fn consume(&self, mut stream: WatchStream) -> WatchOutcome {
        let mut resync = self
            .resync_period
            .map(|period| tokio::time::interval_at(Instant::now() + period, period));

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return WatchOutcome::Cancelled,
                _ = tick(&mut resync) => {
                    let n = self.entry.resync().await;
                    self.bus.publish(
                        Event::new(EventKind::Resynced)
                            .with_gvk(self.entry.gvk())
                            .with_count(n),
                    );
                }
                item = stream.next() => match item {
                    Some(Ok(notification)) => self.apply(notification).await,
                    Some(Err(e)) => return WatchOutcome::Failed(e),
                    None => return WatchOutcome::Closed,
                },
            }
        }
    }

    async fn apply(&self, notification: WatchNotification) {
        let change = match notification {
            WatchNotification::Added(v) | WatchNotification::Modified(v) => {
                self.decode(v).map(Change::Upsert)
            }
            WatchNotification::Deleted(v) => self.decode(v).map(Change::Remove),
        };
        if let Some(change) = change {
            self.entry.apply(change).await;
        }
    }

    /// Decodes identity metadata; undecodable payloads are reported and dropped.
    fn decode(&self, value: serde_json::Value) -> Option<RawObject> {
        match RawObject::from_value(value) {
            Ok(object) => Some(object),
            Err(e) => {
                let gvk = self.entry.gvk();
                warn!(gvk = %gvk, error = %e, "dropping undecodable notification");
                self.bus.publish(
                    Event::new(EventKind::TranslationFailed)
                        .with_gvk(gvk)
                        .with_reason(e.to_string()),
                );
                None
            }
        }
    }

    /// Sleeps `rewatch_delay`; `false` if cancelled meanwhile.
    async fn pause(&self) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(self.rewatch_delay) => true,
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
