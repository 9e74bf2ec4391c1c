//! # Invocation lifecycle events.
//!
//! Every invocation produces, in order:
//! ```text
//! Before → Success → After     (handler resolved)
//! Before → Error   → After     (handler failed or panicked)
//! Before →           After     (aborted)
//! ```
//! Rejected calls (unknown name, busy exclusive action) produce no events.
//!
//! ## Example
//! ```rust
//! use actionvisor::{ActionEvent, InvocationState, TriggerPhase};
//!
//! let ev = ActionEvent::new(7, "load-user-info", TriggerPhase::After, InvocationState::Aborted);
//! assert_eq!(ev.invocation, 7);
//! assert_eq!(&*ev.name, "load-user-info");
//! assert!(ev.error.is_none());
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::core::InvocationState;
use crate::error::HandlerError;

/// Point in an invocation's lifecycle at which listeners fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerPhase {
    /// Before the handler starts (after the concurrency gate admitted the call).
    Before,
    /// After the invocation settled, whatever the outcome. Always last.
    After,
    /// The handler resolved.
    Success,
    /// The handler returned an error or panicked.
    Error,
}

impl TriggerPhase {
    /// Returns a short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            TriggerPhase::Before => "before",
            TriggerPhase::After => "after",
            TriggerPhase::Success => "success",
            TriggerPhase::Error => "error",
        }
    }
}

/// Snapshot of an invocation handed to trigger listeners.
///
/// - `invocation`: engine-local id, shared by all events of one invocation
/// - `state`: invocation state when the event fired
/// - `error`: set for `Error`, and for `After` following a failure
/// - `elapsed`: time since the invocation started (unset for `Before`)
#[derive(Clone, Debug)]
pub struct ActionEvent {
    /// Id of the invocation (monotonic per engine).
    pub invocation: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Action name.
    pub name: Arc<str>,
    /// Which trigger list is firing.
    pub phase: TriggerPhase,
    /// Invocation state at this point.
    pub state: InvocationState,
    /// Handler error, if the invocation failed.
    pub error: Option<HandlerError>,
    /// Time since the invocation started.
    pub elapsed: Option<Duration>,
}

impl ActionEvent {
    /// Creates an event stamped with the current time.
    pub fn new(
        invocation: u64,
        name: impl Into<Arc<str>>,
        phase: TriggerPhase,
        state: InvocationState,
    ) -> Self {
        Self {
            invocation,
            at: SystemTime::now(),
            name: name.into(),
            phase,
            state,
            error: None,
            elapsed: None,
        }
    }

    /// Attaches the handler error.
    #[inline]
    pub fn with_error(mut self, error: HandlerError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attaches the elapsed time.
    #[inline]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    /// True if the invocation failed.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self.state, InvocationState::Failed)
    }

    /// True if the invocation was aborted.
    #[inline]
    pub fn is_abort(&self) -> bool {
        matches!(self.state, InvocationState::Aborted)
    }
}
