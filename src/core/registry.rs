//! # Action registry and run bookkeeping.
//!
//! [`ActionRegistry`] maps names to handlers and policies. Live bookkeeping sits in a
//! separate [`RunTable`] so that re-defining a name replaces the handler without
//! touching its history.
//!
//! ## Architecture
//! ```text
//! define(name) ──► defs: name → Definition { action, policy }
//!
//! admit(name)  ──► defs lookup  ──► UnknownAction / SignatureMismatch
//!              └─► RunTable lock: policy.admits(running)?
//!                     ├─ no  ──► Concurrency
//!                     └─ yes ──► running += 1 ──► RunningSlot (released on drop)
//!
//! settle       ──► record_success (has_run = true) / record_failure (push ErrorEntry)
//! ```
//!
//! ## Rules
//! - The gate check and the slot claim happen under one lock, so an exclusive
//!   action never has more than one running invocation.
//! - A slot is released exactly once, when the invocation drops it.
//! - Reset clears `has_run` and error logs; running counts of in-flight
//!   invocations are left alone.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use crate::error::{ActionError, HandlerError};
use crate::policies::ConcurrencyPolicy;
use crate::tasks::{ErasedAction, Signature};

/// One recorded handler failure.
#[derive(Clone, Debug)]
pub struct ErrorEntry {
    /// Action name.
    pub name: Arc<str>,
    /// The handler's error.
    pub error: HandlerError,
    /// When the failure was recorded.
    pub timestamp: SystemTime,
}

impl ErrorEntry {
    pub(crate) fn new(name: Arc<str>, error: HandlerError) -> Self {
        Self {
            name,
            error,
            timestamp: SystemTime::now(),
        }
    }
}

/// Per-name bookkeeping.
#[derive(Default)]
struct RunState {
    has_run: bool,
    running: usize,
    errors: VecDeque<ErrorEntry>,
}

/// Run flags, running counts and error logs for every name.
pub(crate) struct RunTable {
    states: Mutex<HashMap<String, RunState>>,
    error_log_limit: Option<usize>,
}

impl RunTable {
    fn new(error_log_limit: Option<usize>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            error_log_limit,
        }
    }

    fn claim(&self, name: &str, policy: ConcurrencyPolicy) -> bool {
        let mut states = self.states.lock();
        let state = states.entry(name.to_string()).or_default();
        if !policy.admits(state.running) {
            return false;
        }
        state.running += 1;
        true
    }

    fn release(&self, name: &str) {
        if let Some(state) = self.states.lock().get_mut(name) {
            state.running = state.running.saturating_sub(1);
        }
    }

    pub(crate) fn record_success(&self, name: &str) {
        self.states
            .lock()
            .entry(name.to_string())
            .or_default()
            .has_run = true;
    }

    pub(crate) fn record_failure(&self, entry: ErrorEntry) {
        let mut states = self.states.lock();
        let state = states.entry(entry.name.to_string()).or_default();
        state.errors.push_back(entry);
        if let Some(limit) = self.error_log_limit {
            while state.errors.len() > limit {
                state.errors.pop_front();
            }
        }
    }

    pub(crate) fn has_run(&self, name: &str) -> bool {
        self.states.lock().get(name).is_some_and(|s| s.has_run)
    }

    pub(crate) fn running(&self, name: &str) -> usize {
        self.states.lock().get(name).map_or(0, |s| s.running)
    }

    pub(crate) fn errors(&self, name: &str) -> Vec<ErrorEntry> {
        self.states
            .lock()
            .get(name)
            .map(|s| s.errors.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn has_failed(&self, name: &str) -> bool {
        self.states
            .lock()
            .get(name)
            .is_some_and(|s| !s.errors.is_empty())
    }

    pub(crate) fn reset_all(&self) {
        let mut states = self.states.lock();
        states.retain(|_, s| {
            s.has_run = false;
            s.errors.clear();
            s.running > 0
        });
    }

    pub(crate) fn reset(&self, name: &str) {
        let mut states = self.states.lock();
        let Some(state) = states.get_mut(name) else {
            return;
        };
        state.has_run = false;
        state.errors.clear();
        if state.running == 0 {
            states.remove(name);
        }
    }
}

/// Claimed running slot of one invocation.
pub(crate) struct RunningSlot {
    runs: Arc<RunTable>,
    name: Arc<str>,
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        self.runs.release(&self.name);
    }
}

struct Definition<S> {
    name: Arc<str>,
    action: Arc<dyn ErasedAction<S>>,
    policy: ConcurrencyPolicy,
}

/// A call that passed every check and holds a running slot.
pub(crate) struct Admitted<S> {
    pub(crate) name: Arc<str>,
    pub(crate) action: Arc<dyn ErasedAction<S>>,
    pub(crate) policy: ConcurrencyPolicy,
    pub(crate) slot: RunningSlot,
}

/// Registry of action definitions.
pub(crate) struct ActionRegistry<S> {
    defs: RwLock<HashMap<String, Definition<S>>>,
    runs: Arc<RunTable>,
}

impl<S> ActionRegistry<S> {
    pub(crate) fn new(error_log_limit: Option<usize>) -> Self {
        Self {
            defs: RwLock::new(HashMap::new()),
            runs: Arc::new(RunTable::new(error_log_limit)),
        }
    }

    pub(crate) fn runs(&self) -> &Arc<RunTable> {
        &self.runs
    }

    /// Registers or replaces a definition. Returns `true` if one was replaced.
    pub(crate) fn define(
        &self,
        name: &str,
        action: Arc<dyn ErasedAction<S>>,
        policy: ConcurrencyPolicy,
    ) -> bool {
        let def = Definition {
            name: Arc::from(name),
            action,
            policy,
        };
        self.defs.write().insert(name.to_string(), def).is_some()
    }

    /// Checks name, signature and concurrency policy, then claims a running slot.
    pub(crate) fn admit(&self, name: &str, found: &Signature) -> Result<Admitted<S>, ActionError> {
        let (name, action, policy) = {
            let defs = self.defs.read();
            let def = defs.get(name).ok_or_else(|| ActionError::UnknownAction {
                name: Arc::from(name),
            })?;
            (Arc::clone(&def.name), Arc::clone(&def.action), def.policy)
        };

        let expected = action.signature();
        if !expected.matches(found) {
            return Err(expected.mismatch(name, found));
        }

        if !self.runs.claim(&name, policy) {
            return Err(ActionError::Concurrency { name });
        }

        let slot = RunningSlot {
            runs: Arc::clone(&self.runs),
            name: Arc::clone(&name),
        };
        Ok(Admitted {
            name,
            action,
            policy,
            slot,
        })
    }

    pub(crate) fn is_defined(&self, name: &str) -> bool {
        self.defs.read().contains_key(name)
    }

    pub(crate) fn policy(&self, name: &str) -> Option<ConcurrencyPolicy> {
        self.defs.read().get(name).map(|d| d.policy)
    }

    /// Returns sorted list of defined names.
    pub(crate) fn names(&self) -> Vec<String> {
        let defs = self.defs.read();
        let mut names: Vec<String> = defs.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
