//! # Typed resource contract.
//!
//! Consumers describe each object type they watch by implementing [`Resource`].
//! Sources decode cached payloads into that type, so it must also implement
//! `serde::de::DeserializeOwned`.
//!
//! ## Example
//! ```rust
//! use kindsource::{GroupVersionKind, ObjectMeta, Resource};
//! use serde::Deserialize;
//!
//! #[derive(Clone, Debug, PartialEq, Deserialize)]
//! struct ConfigMap {
//!     metadata: ObjectMeta,
//!     #[serde(default)]
//!     data: std::collections::BTreeMap<String, String>,
//! }
//!
//! impl Resource for ConfigMap {
//!     fn gvk() -> GroupVersionKind { GroupVersionKind::new("", "v1", "ConfigMap") }
//!     fn meta(&self) -> &ObjectMeta { &self.metadata }
//!     fn meta_mut(&mut self) -> &mut ObjectMeta { &mut self.metadata }
//! }
//! ```

use super::{GroupVersionKind, ObjectMeta};

/// A typed remote object of a fixed kind.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Kind served by this type.
    fn gvk() -> GroupVersionKind;

    /// Object metadata.
    fn meta(&self) -> &ObjectMeta;

    /// Mutable object metadata.
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}
