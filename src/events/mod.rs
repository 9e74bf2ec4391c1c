//! Lifecycle events delivered to trigger listeners.
//!
//! ## Contents
//! - [`TriggerPhase`] the four points of an invocation listeners can hook
//! - [`ActionEvent`] payload describing the invocation at that point
//!
//! Events are produced by `core::invocation` and dispatched synchronously by
//! the trigger registry; there is no queue in between.

mod event;

pub use event::{ActionEvent, TriggerPhase};
