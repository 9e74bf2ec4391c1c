//! Concurrency policies.
//!
//! This module groups the knobs that control **whether** an action invocation
//! may overlap with another invocation of the same name.
//!
//! ## Contents
//! - [`ConcurrencyPolicy`] exclusive / parallel
//! - [`ActionOptions`] per-action options passed to `define`
//!
//! ## Defaults
//! - `ConcurrencyPolicy::Exclusive` unless overridden per action or in
//!   [`EngineConfig`](crate::EngineConfig).

mod concurrency;

pub use concurrency::{ActionOptions, ConcurrencyPolicy};
