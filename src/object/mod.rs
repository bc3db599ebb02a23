//! Object model shared by the cache, the translator and the sources.
//!
//! ## Contents
//! - [`GroupVersionKind`] identifies a class of remote objects (the cache key)
//! - [`ObjectMeta`], [`ObjectKey`] identity and versioning fields of an object
//! - [`Resource`] typed view implemented by consumer object types
//! - [`RawObject`] untyped payload as stored in a cache entry

mod kind;
mod meta;
mod raw;
mod resource;

pub use kind::GroupVersionKind;
pub use meta::{ObjectKey, ObjectMeta};
pub use raw::RawObject;
pub use resource::Resource;
