//! Engine core: registry, invocation orchestration and configuration.
//!
//! The public API from this module is [`ActionEngine`], its [`EngineBuilder`]
//! and [`EngineConfig`].
//!
//! Internal modules:
//! - [`registry`]: definitions, concurrency gate, run bookkeeping;
//! - [`invocation`]: drives one admitted call through its lifecycle;
//! - [`engine`]: composition root wiring the registries together;
//! - [`builder`], [`config`]: construction and settings.

mod builder;
mod config;
mod engine;
mod invocation;
mod registry;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use engine::ActionEngine;
pub use invocation::InvocationState;
pub use registry::ErrorEntry;
