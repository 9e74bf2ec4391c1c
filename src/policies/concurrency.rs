//! # Concurrency policies for actions.
//!
//! [`ConcurrencyPolicy`] decides whether a new invocation may start while
//! another invocation of the same action is still in flight.
//!
//! - [`ConcurrencyPolicy::Exclusive`] at most one invocation at a time (default).
//! - [`ConcurrencyPolicy::Parallel`] any number of overlapping invocations.
//!
//! ```text
//! call(name) ──► Exclusive, running == 0 ─► start
//!            ──► Exclusive, running >= 1 ─► ActionError::Concurrency
//!            ──► Parallel                 ─► start
//! ```

/// Policy controlling overlapping invocations of the same action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    /// Reject a call while an invocation of the same name is running (default).
    #[default]
    Exclusive,
    /// Allow unlimited concurrent invocations.
    Parallel,
}

impl ConcurrencyPolicy {
    /// Returns `true` if a new invocation may start with `running` invocations in flight.
    #[inline]
    pub fn admits(self, running: usize) -> bool {
        match self {
            ConcurrencyPolicy::Exclusive => running == 0,
            ConcurrencyPolicy::Parallel => true,
        }
    }

    /// Returns a short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            ConcurrencyPolicy::Exclusive => "exclusive",
            ConcurrencyPolicy::Parallel => "parallel",
        }
    }
}

/// Options accepted by [`ActionEngine::define`](crate::ActionEngine::define).
///
/// `None` means "use [`EngineConfig::default_policy`](crate::EngineConfig::default_policy)".
///
/// ## Example
/// ```
/// use actionvisor::{ActionOptions, ConcurrencyPolicy};
///
/// let opts = ActionOptions::parallel();
/// assert_eq!(opts.policy, Some(ConcurrencyPolicy::Parallel));
/// assert_eq!(ActionOptions::default().policy, None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionOptions {
    /// Concurrency policy for this action.
    pub policy: Option<ConcurrencyPolicy>,
}

impl ActionOptions {
    /// Options for an action that may run concurrently with itself.
    pub fn parallel() -> Self {
        Self {
            policy: Some(ConcurrencyPolicy::Parallel),
        }
    }

    /// Options for an action that must not overlap with itself.
    pub fn exclusive() -> Self {
        Self {
            policy: Some(ConcurrencyPolicy::Exclusive),
        }
    }

    /// Sets the policy from a `parallel` flag.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.policy = Some(if parallel {
            ConcurrencyPolicy::Parallel
        } else {
            ConcurrencyPolicy::Exclusive
        });
        self
    }
}
