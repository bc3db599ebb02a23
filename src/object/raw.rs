//! # Untyped cached object.
//!
//! [`RawObject`] is what a cache entry stores: the full payload as delivered by
//! the transport plus its decoded metadata. Only identity is checked here; the
//! shape of the kind is checked later, per source, by the translator.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{GroupVersionKind, ObjectKey, ObjectMeta};
use crate::error::TranslateError;

/// Full payload of an object at one point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct RawObject {
    meta: ObjectMeta,
    value: Value,
}

impl RawObject {
    /// Decodes the metadata block of a transport payload.
    ///
    /// Fails when `metadata` is absent, malformed, or has an empty name.
    pub fn from_value(value: Value) -> Result<Self, TranslateError> {
        let meta_value = value
            .get("metadata")
            .ok_or_else(|| TranslateError::MissingMetadata {
                reason: "field `metadata` is absent".to_string(),
            })?;
        let meta = ObjectMeta::deserialize(meta_value).map_err(|e| {
            TranslateError::MissingMetadata {
                reason: e.to_string(),
            }
        })?;
        if meta.name.is_empty() {
            return Err(TranslateError::MissingName);
        }
        Ok(Self { meta, value })
    }

    pub fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn key(&self) -> ObjectKey {
        self.meta.key()
    }

    /// Resource version, if the store set one.
    pub fn resource_version(&self) -> Option<&str> {
        self.meta.resource_version.as_deref()
    }

    /// Decodes the payload as `K`.
    pub fn decode<K: DeserializeOwned>(&self, kind: &GroupVersionKind) -> Result<K, TranslateError> {
        K::deserialize(&self.value).map_err(|source| TranslateError::Decode {
            kind: kind.clone(),
            source,
        })
    }
}
