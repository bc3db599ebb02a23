//! Kind sources: typed event streams bound to the shared cache.
//!
//! ## Contents
//! - [`KindSource`] per-consumer binding to one kind (`bind` → `start`)
//! - [`EventHandler`], [`HandlerFns`], [`EnqueueRequestForObject`] handler side
//! - [`WorkQueue`] destination of handler output
//! - [`CreateEvent`], [`UpdateEvent`], [`DeleteEvent`], [`ObjectEvent`] typed events
//! - [`translate`] raw notification → typed event

mod event;
mod handler;
mod kind_source;
mod queue;
mod translate;

pub use event::{CreateEvent, DeleteEvent, ObjectEvent, UpdateEvent};
pub use handler::{EnqueueRequestForObject, EventHandler, HandlerFns, Request};
pub use kind_source::{KindSource, SourcePhase};
pub use queue::WorkQueue;
pub use translate::translate;
