//! # Awaitable handle for one `call`.
//!
//! [`ActionTask`] is what [`ActionEngine::call`](crate::ActionEngine::call) returns.
//! Awaiting it yields the handler's value or an [`ActionError`]; [`ActionTask::abort`]
//! cancels the invocation.
//!
//! Dropping the handle does not cancel anything: the invocation keeps running
//! and its bookkeeping and triggers still happen.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::ActionError;
use crate::tasks::token::AbortToken;

enum TaskState<R> {
    /// Rejected before an invocation started (unknown name, busy, signature).
    Rejected(ActionError),
    /// Invocation is running on the runtime.
    Spawned(JoinHandle<Result<R, ActionError>>),
    /// Output already taken.
    Done,
}

/// Cancellable, awaitable handle to an action invocation.
pub struct ActionTask<R> {
    name: Arc<str>,
    token: Option<AbortToken>,
    state: TaskState<R>,
}

impl<R> ActionTask<R> {
    pub(crate) fn spawned(
        name: Arc<str>,
        token: AbortToken,
        join: JoinHandle<Result<R, ActionError>>,
    ) -> Self {
        Self {
            name,
            token: Some(token),
            state: TaskState::Spawned(join),
        }
    }

    pub(crate) fn rejected(err: ActionError) -> Self {
        Self {
            name: Arc::from(err.action()),
            token: None,
            state: TaskState::Rejected(err),
        }
    }

    /// Name of the called action.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aborts the invocation.
    ///
    /// Returns `true` if this call performed the abort. A no-op (returning `false`)
    /// for rejected calls, repeated aborts, and invocations that already settled.
    pub fn abort(&self) -> bool {
        self.token.as_ref().is_some_and(AbortToken::abort)
    }

    /// The invocation's abort token, `None` for rejected calls.
    pub fn token(&self) -> Option<&AbortToken> {
        self.token.as_ref()
    }

    /// True if the call was rejected without starting an invocation.
    pub fn is_rejected(&self) -> bool {
        matches!(self.state, TaskState::Rejected(_))
    }
}

impl<R> Unpin for ActionTask<R> {}

impl<R> Future for ActionTask<R> {
    type Output = Result<R, ActionError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match std::mem::replace(&mut this.state, TaskState::Done) {
            TaskState::Rejected(err) => Poll::Ready(Err(err)),
            TaskState::Spawned(mut join) => match Pin::new(&mut join).poll(cx) {
                Poll::Pending => {
                    this.state = TaskState::Spawned(join);
                    Poll::Pending
                }
                Poll::Ready(Ok(res)) => Poll::Ready(res),
                Poll::Ready(Err(join_err)) => {
                    // Only reachable when the runtime drops the invocation mid-flight.
                    warn!(action = %this.name, %join_err, "invocation lost by runtime");
                    Poll::Ready(Err(ActionError::Aborted {
                        name: Arc::clone(&this.name),
                    }))
                }
            },
            TaskState::Done => panic!("ActionTask polled after completion"),
        }
    }
}

impl<R> std::fmt::Debug for ActionTask<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            TaskState::Rejected(_) => "rejected",
            TaskState::Spawned(_) => "spawned",
            TaskState::Done => "done",
        };
        f.debug_struct("ActionTask")
            .field("name", &self.name)
            .field("state", &state)
            .finish()
    }
}
