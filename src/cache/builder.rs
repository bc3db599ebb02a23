use std::sync::Arc;

use super::{CacheConfig, ObjectCache};
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::transport::Transport;

/// Builder for an [`ObjectCache`].
pub struct ObjectCacheBuilder {
    transport: Arc<dyn Transport>,
    cfg: CacheConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ObjectCacheBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cfg: CacheConfig::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn with_config(mut self, cfg: CacheConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets runtime event subscribers.
    ///
    /// Subscribers receive watch, dispatch and shutdown events through
    /// dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the cache and starts forwarding runtime events to subscribers.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Arc<ObjectCache> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        Arc::new(ObjectCache::new_internal(self.cfg, self.transport, bus, subs))
    }
}
