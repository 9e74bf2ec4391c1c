//! # One invocation of an action.
//!
//! Drives a single admitted call from `Pending` to a terminal state, firing
//! triggers and updating bookkeeping on the way.
//!
//! ## Event flow
//!
//! ```text
//! begin():   Pending ─► fire Before ─► Running                 (synchronous, inside call)
//!
//! run():     select { handler future, token.aborted() }
//!
//! Success:   Succeeded ─► has_run = true ─► fire Success ─► fire After ─► release slot
//! Failure:   Failed    ─► push ErrorEntry ─► fire Error ─► fire After ─► release slot
//! Abort:     Aborted   ─► (cleanups already ran in abort()) ─► fire After ─► release slot
//! ```
//!
//! ## Rules
//! - Exactly one of `Success`/`Error` fires, except on abort where neither does.
//! - `After` fires exactly once per invocation.
//! - The running slot is released after the last trigger, so code running inside
//!   a trigger still sees the invocation as running.
//! - A handler result that arrives after abort is discarded.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::core::registry::{ErrorEntry, RunTable, RunningSlot};
use crate::error::{ActionError, BoxError, HandlerError, HandlerPanic};
use crate::events::{ActionEvent, TriggerPhase};
use crate::tasks::{AbortToken, AnyBox};
use crate::triggers::TriggerRegistry;

/// State of an invocation.
///
/// `Pending → Running → {Succeeded | Failed | Aborted}`; the last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    /// Admitted; `Before` triggers are firing.
    Pending,
    /// Handler is executing.
    Running,
    /// Handler resolved.
    Succeeded,
    /// Handler returned an error or panicked.
    Failed,
    /// Aborted before the handler settled.
    Aborted,
}

impl InvocationState {
    /// True for `Succeeded`, `Failed` and `Aborted`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InvocationState::Succeeded | InvocationState::Failed | InvocationState::Aborted
        )
    }

    /// Returns a short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            InvocationState::Pending => "pending",
            InvocationState::Running => "running",
            InvocationState::Succeeded => "succeeded",
            InvocationState::Failed => "failed",
            InvocationState::Aborted => "aborted",
        }
    }
}

/// How the handler future ended.
enum Outcome {
    Resolved(AnyBox),
    Failed(HandlerError),
    Aborted,
}

/// Live invocation owned by its spawned task.
pub(crate) struct Invocation {
    id: u64,
    name: Arc<str>,
    started_at: Instant,
    state: InvocationState,
    token: AbortToken,
    triggers: Arc<TriggerRegistry>,
    runs: Arc<RunTable>,
    slot: RunningSlot,
}

impl Invocation {
    /// Creates the invocation, fires `Before` triggers and moves to `Running`.
    pub(crate) fn begin(
        id: u64,
        name: Arc<str>,
        token: AbortToken,
        slot: RunningSlot,
        triggers: Arc<TriggerRegistry>,
        runs: Arc<RunTable>,
    ) -> Self {
        let mut inv = Self {
            id,
            name,
            started_at: Instant::now(),
            state: InvocationState::Pending,
            token,
            triggers,
            runs,
            slot,
        };
        inv.fire(TriggerPhase::Before, None);
        inv.state = InvocationState::Running;
        debug!(action = %inv.name, invocation = inv.id, "invocation running");
        inv
    }

    /// Awaits the handler (or abort) and settles the invocation.
    pub(crate) async fn run(
        mut self,
        handler: BoxFuture<'static, Result<AnyBox, BoxError>>,
    ) -> Result<AnyBox, ActionError> {
        let token = self.token.clone();
        let finished = tokio::select! {
            biased;
            _ = token.aborted() => None,
            res = AssertUnwindSafe(handler).catch_unwind() => Some(res),
        };

        let outcome = match finished {
            Some(res) if self.token.try_settle() => match res {
                Ok(Ok(value)) => Outcome::Resolved(value),
                Ok(Err(err)) => Outcome::Failed(Arc::from(err)),
                Err(payload) => Outcome::Failed(Arc::new(HandlerPanic::from_payload(&*payload))),
            },
            _ => Outcome::Aborted,
        };

        match outcome {
            Outcome::Resolved(value) => {
                self.state = InvocationState::Succeeded;
                self.runs.record_success(&self.name);
                self.fire(TriggerPhase::Success, None);
                self.finish(None);
                Ok(value)
            }
            Outcome::Failed(error) => {
                self.state = InvocationState::Failed;
                self.runs
                    .record_failure(ErrorEntry::new(Arc::clone(&self.name), Arc::clone(&error)));
                self.fire(TriggerPhase::Error, Some(&error));
                let name = Arc::clone(&self.name);
                self.finish(Some(&error));
                Err(ActionError::Failed {
                    name,
                    source: error,
                })
            }
            Outcome::Aborted => {
                self.state = InvocationState::Aborted;
                let name = Arc::clone(&self.name);
                self.finish(None);
                Err(ActionError::Aborted { name })
            }
        }
    }

    /// Fires `After`, then releases the running slot.
    fn finish(self, error: Option<&HandlerError>) {
        self.fire(TriggerPhase::After, error);
        debug!(
            action = %self.name,
            invocation = self.id,
            state = self.state.as_label(),
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            "invocation settled"
        );
        drop(self.slot);
    }

    fn fire(&self, phase: TriggerPhase, error: Option<&HandlerError>) {
        let mut ev = ActionEvent::new(self.id, Arc::clone(&self.name), phase, self.state);
        if phase != TriggerPhase::Before {
            ev = ev.with_elapsed(self.started_at.elapsed());
        }
        if let Some(error) = error {
            ev = ev.with_error(Arc::clone(error));
        }
        self.triggers.fire(&ev);
    }
}
