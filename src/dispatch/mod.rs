//! Dispatch: fan-out of applied store changes to callbacks.
//!
//! ## Contents
//! - [`Notification`] raw add/update/delete carrying before/after state
//! - [`Callback`] receiver registered on a cache entry
//! - `CallbackSet` per-entry fan-out with one unbounded queue and worker per callback
//!
//! ```text
//! listener ── apply(change) ──► Store ──► Notification ──► CallbackSet::dispatch
//!                                                    ┌──────────┼──────────┐
//!                                                    ▼          ▼          ▼
//!                                                 worker 1   worker 2   worker N
//!                                                    ▼          ▼          ▼
//!                                           source translate + handler  (per callback)
//! ```

mod callback;
mod notification;
mod set;

use std::any::Any;

pub use callback::Callback;
pub use notification::Notification;
pub use set::CallbackId;
pub(crate) use set::CallbackSet;

/// Renders a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
