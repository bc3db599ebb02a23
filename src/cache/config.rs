//! # Object cache configuration.
//!
//! ## Sentinel values
//! - `resync_period = 0s` → periodic resync disabled
//! - `backlog_warn_threshold = 0` → backlog events disabled
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Settings shared by every entry of an [`ObjectCache`](crate::ObjectCache).
///
/// All fields are public; prefer the accessors over sentinel checks.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Capacity of the runtime event bus ring buffer.
    pub bus_capacity: usize,

    /// Fixed pause before re-listing after a watch or list failure.
    pub rewatch_delay: Duration,

    /// Interval at which every cached object is re-delivered as an update.
    ///
    /// `Duration::ZERO` disables resync.
    pub resync_period: Duration,

    /// Pending notifications for one callback at which `CallbackBacklog` is published.
    ///
    /// `0` disables the signal.
    pub backlog_warn_threshold: usize,

    /// Maximum time `shutdown` waits for listeners and handler workers.
    pub grace: Duration,
}

impl CacheConfig {
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the resync interval, `None` when disabled.
    #[inline]
    pub fn resync_period(&self) -> Option<Duration> {
        if self.resync_period == Duration::ZERO {
            None
        } else {
            Some(self.resync_period)
        }
    }

    /// Returns the backlog threshold, `None` when disabled.
    #[inline]
    pub fn backlog_warn(&self) -> Option<usize> {
        match self.backlog_warn_threshold {
            0 => None,
            n => Some(n),
        }
    }
}

impl Default for CacheConfig {
    /// - `bus_capacity = 1024`
    /// - `rewatch_delay = 1s`
    /// - `resync_period = 0s` (disabled)
    /// - `backlog_warn_threshold = 1024`
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            rewatch_delay: Duration::from_secs(1),
            resync_period: Duration::ZERO,
            backlog_warn_threshold: 1024,
            grace: Duration::from_secs(30),
        }
    }
}
