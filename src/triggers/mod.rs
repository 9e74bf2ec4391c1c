//! # Lifecycle triggers.
//!
//! Listeners are attached per action name and per [`TriggerPhase`](crate::TriggerPhase)
//! and called synchronously from the invocation that reaches that phase.
//!
//! ## Architecture
//! ```text
//! on_before_action(name, f) ──► TriggerRegistry ──► TriggerHandle { name, phase, id }
//!                                   │                      │
//!  invocation reaches phase ──► fire(&ActionEvent)          └─► dispose() removes id
//!                                   │
//!                     ┌─────────────┼─────────────┐
//!                     ▼             ▼             ▼
//!                 listener 1    listener 2    listener N     (registration order)
//! ```
//!
//! ## Rules
//! - Listeners of one phase fire in registration order.
//! - The listener list is snapshotted before dispatch; listeners may register,
//!   dispose, or call back into the engine.
//! - A panicking listener is logged and skipped; the remaining listeners still fire.

mod handle;
mod registry;

pub use handle::TriggerHandle;
pub use registry::Listener;

pub(crate) use registry::TriggerRegistry;
