//! # Engine configuration.
//!
//! Provides [`EngineConfig`] centralized settings for an [`ActionEngine`](crate::ActionEngine).
//!
//! ## Sentinel values
//! - `error_log_capacity = 0` → unbounded error log per action

use crate::policies::ConcurrencyPolicy;

/// Configuration for an action engine.
///
/// ## Field semantics
/// - `default_policy`: Policy for actions defined without an explicit one
/// - `error_log_capacity`: Max error entries kept per action (`0` = unbounded);
///   the oldest entries are dropped first
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Concurrency policy applied when `ActionOptions::policy` is `None`.
    pub default_policy: ConcurrencyPolicy,

    /// Maximum number of error entries retained per action.
    ///
    /// - `0` = keep every entry until the next reset
    /// - `n > 0` = keep the `n` most recent entries
    pub error_log_capacity: usize,
}

impl EngineConfig {
    /// Returns the error log bound as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` entries per action
    #[inline]
    pub fn error_log_limit(&self) -> Option<usize> {
        if self.error_log_capacity == 0 {
            None
        } else {
            Some(self.error_log_capacity)
        }
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `default_policy = ConcurrencyPolicy::Exclusive`
    /// - `error_log_capacity = 0` (unbounded)
    fn default() -> Self {
        Self {
            default_policy: ConcurrencyPolicy::Exclusive,
            error_log_capacity: 0,
        }
    }
}
