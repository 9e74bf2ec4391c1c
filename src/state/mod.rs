//! # External state seam.
//!
//! Handlers modify shared application state only through a [`Mutator`], which
//! forwards to the host's [`StateStore::mutate`] entry point. The engine never
//! looks at the state's shape.
//!
//! ```text
//! handler ──► Mutator::mutate(|s| ...) ──► StateStore::mutate(&mut dyn FnMut(&mut S))
//! ```
//!
//! [`SharedState`] is a small mutex-backed store for hosts without one of their own
//! (and for tests).

mod store;

pub use store::{Mutator, SharedState, StateStore};
