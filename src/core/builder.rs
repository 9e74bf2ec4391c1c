use std::sync::Arc;

use crate::core::{config::EngineConfig, engine::ActionEngine};
use crate::policies::ConcurrencyPolicy;
use crate::state::StateStore;

/// Builder for constructing an [`ActionEngine`].
///
/// ## Example
/// ```
/// use actionvisor::{ActionEngine, ConcurrencyPolicy, SharedState};
///
/// let engine = ActionEngine::builder(SharedState::arc(()))
///     .with_default_policy(ConcurrencyPolicy::Parallel)
///     .with_error_log_capacity(16)
///     .build();
/// assert_eq!(engine.config().error_log_limit(), Some(16));
/// ```
pub struct EngineBuilder<S> {
    cfg: EngineConfig,
    store: Arc<dyn StateStore<S>>,
}

impl<S: Send + 'static> EngineBuilder<S> {
    /// Creates a builder over `store` with the default configuration.
    pub fn new<T: StateStore<S>>(store: Arc<T>) -> Self {
        Self {
            cfg: EngineConfig::default(),
            store,
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: EngineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Policy for actions defined without one.
    pub fn with_default_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.cfg.default_policy = policy;
        self
    }

    /// Max error entries kept per action (`0` = unbounded).
    pub fn with_error_log_capacity(mut self, capacity: usize) -> Self {
        self.cfg.error_log_capacity = capacity;
        self
    }

    /// Builds the engine.
    pub fn build(self) -> ActionEngine<S> {
        ActionEngine::from_parts(self.cfg, self.store)
    }
}
