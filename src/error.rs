//! Error types used by the cache, the sources and the transport boundary.
//!
//! - [`RuntimeError`] — failures of the runtime itself (shutdown).
//! - [`CacheError`] — failures of the shared object cache.
//! - [`SourceError`] — programming errors when binding/starting a [`KindSource`](crate::KindSource).
//! - [`TranslateError`] — a single notification could not be interpreted; it is dropped.
//! - [`TransportError`] — the external list/watch transport failed.
//!
//! Every type provides `as_label` for logs/metrics.

use std::time::Duration;

use thiserror::Error;

use crate::object::GroupVersionKind;

/// # Errors produced by the runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some watches or handlers were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Kinds whose listener or handler workers did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kindsource::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced by the object cache.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache received its stop signal; no new watches are created.
    #[error("object cache is stopped")]
    Stopped,
}

impl CacheError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kindsource::CacheError;
    ///
    /// assert_eq!(CacheError::Stopped.as_label(), "cache_stopped");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CacheError::Stopped => "cache_stopped",
        }
    }
}

/// # Errors returned when binding or starting a kind source.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// `start` was called before `bind`.
    #[error("source for {kind} must be bound to a cache before it is started")]
    NotBound { kind: GroupVersionKind },

    /// `bind` was called on a source that already has a cache.
    #[error("source for {kind} is already bound")]
    AlreadyBound { kind: GroupVersionKind },

    /// `start` was called on a source that is already running.
    #[error("source for {kind} is already started")]
    AlreadyStarted { kind: GroupVersionKind },

    /// The cache refused to provide an entry.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl SourceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kindsource::{GroupVersionKind, SourceError};
    ///
    /// let err = SourceError::AlreadyStarted { kind: GroupVersionKind::new("apps", "v1", "Deployment") };
    /// assert_eq!(err.as_label(), "source_already_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceError::NotBound { .. } => "source_not_bound",
            SourceError::AlreadyBound { .. } => "source_already_bound",
            SourceError::AlreadyStarted { .. } => "source_already_started",
            SourceError::Cache(e) => e.as_label(),
        }
    }
}

/// # Errors raised while interpreting a single notification.
///
/// Never fatal for the stream: the offending notification is reported and dropped.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TranslateError {
    /// The object carries no decodable `metadata` block.
    #[error("object has no valid metadata: {reason}")]
    MissingMetadata { reason: String },

    /// The object metadata has an empty name.
    #[error("object metadata has no name")]
    MissingName,

    /// The payload does not match the shape of the expected kind.
    #[error("object does not decode as {kind}: {source}")]
    Decode {
        kind: GroupVersionKind,
        #[source]
        source: serde_json::Error,
    },
}

impl TranslateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kindsource::TranslateError;
    ///
    /// assert_eq!(TranslateError::MissingName.as_label(), "translate_missing_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TranslateError::MissingMetadata { .. } => "translate_missing_metadata",
            TranslateError::MissingName => "translate_missing_name",
            TranslateError::Decode { .. } => "translate_decode",
        }
    }
}

/// # Errors produced by the external list/watch transport.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The backing store cannot be reached right now.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The remote side closed the watch.
    #[error("watch closed by remote: {0}")]
    Closed(String),

    /// The object does not exist in the backing store.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write conflicts with the stored object (exists, or stale version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store rejected the object.
    #[error("invalid object: {0}")]
    Invalid(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kindsource::TransportError;
    ///
    /// let err = TransportError::Unavailable("connection refused".into());
    /// assert_eq!(err.as_label(), "transport_unavailable");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Unavailable(_) => "transport_unavailable",
            TransportError::Closed(_) => "transport_closed",
            TransportError::NotFound(_) => "transport_not_found",
            TransportError::Conflict(_) => "transport_conflict",
            TransportError::Invalid(_) => "transport_invalid",
            TransportError::Other(_) => "transport_other",
        }
    }
}
