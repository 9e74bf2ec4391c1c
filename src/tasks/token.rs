//! # Abort token handed to every invocation.
//!
//! [`AbortToken`] is shared by the caller's [`ActionTask`](crate::ActionTask) and the running
//! handler. The caller side aborts; the handler side registers cleanups and observes
//! cancellation.
//!
//! ## Settle state machine
//! ```text
//!            abort()              ┌──────────┐
//!   Running ─────────────────────►│ Aborted  │  cleanups run here, in order
//!      │                          └──────────┘
//!      │ try_settle() (handler finished first)
//!      ▼
//!   ┌──────────┐
//!   │ Settled  │  abort() is a no-op, cleanups are discarded
//!   └──────────┘
//! ```
//!
//! Exactly one transition out of `Running` wins. If the handler finishes in the
//! same instant `abort()` is called, whichever reaches the state first decides
//! the outcome; a handler result arriving after abort is discarded.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::error;

const RUNNING: u8 = 0;
const SETTLED: u8 = 1;
const ABORTED: u8 = 2;

type Cleanup = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    state: AtomicU8,
    cleanups: Mutex<Vec<Cleanup>>,
    cancel: CancellationToken,
}

/// Cancellation capability for one invocation.
///
/// Cloning is cheap; all clones refer to the same invocation.
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use actionvisor::AbortToken;
///
/// let token = AbortToken::new();
/// let released = Arc::new(AtomicBool::new(false));
/// let flag = released.clone();
/// token.on_abort(move || flag.store(true, Ordering::SeqCst));
///
/// assert!(token.abort());
/// assert!(released.load(Ordering::SeqCst));
/// assert!(!token.abort()); // idempotent
/// ```
#[derive(Clone)]
pub struct AbortToken {
    inner: Arc<Inner>,
}

impl AbortToken {
    /// Creates a token in the running state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(RUNNING),
                cleanups: Mutex::new(Vec::new()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Aborts the invocation.
    ///
    /// Runs every registered cleanup synchronously, in registration order, then
    /// wakes the invocation so it settles as aborted.
    ///
    /// Returns `true` only for the call that performed the abort. Calling it again,
    /// or after the invocation settled on its own, does nothing and returns `false`.
    pub fn abort(&self) -> bool {
        if self
            .inner
            .state
            .compare_exchange(RUNNING, ABORTED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let cleanups = std::mem::take(&mut *self.inner.cleanups.lock());
        for cleanup in cleanups {
            run_cleanup(cleanup);
        }
        self.inner.cancel.cancel();
        true
    }

    /// Registers a cleanup to run when the invocation is aborted.
    ///
    /// - Before abort: queued, runs inside [`abort`](Self::abort).
    /// - After abort: runs immediately.
    /// - After natural settlement: dropped without running.
    pub fn on_abort<F>(&self, cleanup: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut cleanups = self.inner.cleanups.lock();
        match self.inner.state.load(Ordering::Acquire) {
            RUNNING => cleanups.push(Box::new(cleanup)),
            ABORTED => {
                drop(cleanups);
                run_cleanup(Box::new(cleanup));
            }
            _ => {}
        }
    }

    /// True once [`abort`](Self::abort) has taken effect.
    pub fn is_aborted(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == ABORTED
    }

    /// True once the invocation settled without being aborted.
    pub fn is_settled(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == SETTLED
    }

    /// Completes when the invocation is aborted.
    ///
    /// Never completes for an invocation that settled on its own.
    pub async fn aborted(&self) {
        self.inner.cancel.cancelled().await;
    }

    /// Returns a `tokio_util` token cancelled together with this one.
    ///
    /// Cancelling the returned token does not abort the invocation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.child_token()
    }

    /// Marks the invocation as naturally settled.
    ///
    /// Returns `false` if abort already won, in which case the result must be discarded.
    pub(crate) fn try_settle(&self) -> bool {
        let won = self
            .inner
            .state
            .compare_exchange(RUNNING, SETTLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.inner.cleanups.lock().clear();
        }
        won
    }
}

impl Default for AbortToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AbortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.state.load(Ordering::Acquire) {
            RUNNING => "running",
            SETTLED => "settled",
            _ => "aborted",
        };
        f.debug_struct("AbortToken").field("state", &state).finish()
    }
}

fn run_cleanup(cleanup: Cleanup) {
    if let Err(panic_err) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
        error!(?panic_err, "abort cleanup panicked");
    }
}
