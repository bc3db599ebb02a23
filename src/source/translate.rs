//! # Raw notification → typed event.
//!
//! ```text
//! Added   { object }            → CreateEvent { meta, object }
//! Updated { old, new }          → UpdateEvent { meta_old, object_old, meta_new, object_new }
//! Deleted { last_known, observed }
//!     last_known or observed    → DeleteEvent { meta, object }   (resource_version cleared)
//! ```
//!
//! A payload that does not decode as `K` fails with [`TranslateError::Decode`];
//! the caller reports and drops it. Only the current state decides that:
//! - an update whose old state does not decode becomes a `CreateEvent`, since
//!   the consumer never saw the earlier object;
//! - a delete whose last known state does not decode, or that the cache has no
//!   state for, yields a `DeleteEvent` from the notification's own metadata.

use serde::de::DeserializeOwned;

use super::event::{CreateEvent, DeleteEvent, ObjectEvent, UpdateEvent};
use crate::dispatch::Notification;
use crate::error::TranslateError;
use crate::object::{RawObject, Resource};

/// Translates one notification into a typed event for `K`.
pub fn translate<K>(notification: &Notification) -> Result<ObjectEvent<K>, TranslateError>
where
    K: Resource + DeserializeOwned,
{
    let gvk = K::gvk();
    match notification {
        Notification::Added { object } => {
            let object: K = object.decode(&gvk)?;
            Ok(ObjectEvent::Create(CreateEvent {
                meta: object.meta().clone(),
                object,
            }))
        }
        Notification::Updated { old, new } => {
            let object_new: K = new.decode(&gvk)?;
            let Ok(object_old) = old.decode::<K>(&gvk) else {
                return Ok(ObjectEvent::Create(CreateEvent {
                    meta: object_new.meta().clone(),
                    object: object_new,
                }));
            };
            Ok(ObjectEvent::Update(UpdateEvent {
                meta_old: object_old.meta().clone(),
                object_old,
                meta_new: object_new.meta().clone(),
                object_new,
            }))
        }
        Notification::Deleted {
            last_known: Some(last),
            observed,
        } => match last.decode::<K>(&gvk) {
            Ok(last) => {
                let object = tombstone(last);
                Ok(ObjectEvent::Delete(DeleteEvent {
                    meta: object.meta().clone(),
                    object: Some(object),
                }))
            }
            Err(_) => Ok(ObjectEvent::Delete(cache_miss_delete(observed))),
        },
        Notification::Deleted {
            last_known: None,
            observed,
        } => Ok(ObjectEvent::Delete(cache_miss_delete(observed))),
    }
}

fn tombstone<K: Resource>(mut object: K) -> K {
    object.meta_mut().clear_volatile();
    object
}

fn cache_miss_delete<K>(observed: &RawObject) -> DeleteEvent<K>
where
    K: Resource + DeserializeOwned,
{
    let mut meta = observed.meta().clone();
    meta.clear_volatile();
    DeleteEvent {
        meta,
        object: observed.decode::<K>(&K::gvk()).ok().map(tombstone),
    }
}
