//! # ActionEngine: registry, gate, triggers and invocations in one place.
//!
//! The [`ActionEngine`] owns every registry an action needs: definitions,
//! run bookkeeping, and trigger lists. Each engine is independent; two engines
//! never share state.
//!
//! ## High-level architecture
//! ```text
//! call(name, args)
//!   ├─► Handle::try_current()                        → NoRuntime → rejected ActionTask
//!   ├─► ActionRegistry::admit(name, signature)
//!   │       ├─ UnknownAction / SignatureMismatch      → rejected ActionTask
//!   │       ├─ Exclusive && running >= 1 → Concurrency → rejected ActionTask
//!   │       └─ running += 1 (RunningSlot)
//!   ├─► Invocation::begin   → fire Before (synchronous, caller's thread)
//!   ├─► runtime.spawn(Invocation::run(handler future))
//!   │       └─► Success/Error → After → release slot
//!   └─► ActionTask { JoinHandle, AbortToken }
//!
//! ActionTask::abort()
//!   └─► AbortToken::abort → cleanups (in order) → wake invocation → After → ActionError::Aborted
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use actionvisor::{AbortToken, ActionEngine, ActionOptions, BoxError, Mutator, SharedState};
//!
//! #[derive(Clone, Default)]
//! struct Counter { hits: u32 }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = SharedState::arc(Counter::default());
//!     let engine = ActionEngine::new(state.clone());
//!
//!     engine.define_fn("hit", |by: u32, mutate: Mutator<Counter>, _token: AbortToken| async move {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         mutate.mutate(|c| c.hits += by);
//!         Ok::<_, BoxError>(())
//!     }, ActionOptions::default());
//!
//!     engine.call::<u32, ()>("hit", 2).await?;
//!     assert_eq!(state.get().hits, 2);
//!     assert!(engine.has_action_run("hit"));
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::core::builder::EngineBuilder;
use crate::core::config::EngineConfig;
use crate::core::invocation::Invocation;
use crate::core::registry::{ActionRegistry, ErrorEntry};
use crate::error::{ActionError, BoxError};
use crate::events::{ActionEvent, TriggerPhase};
use crate::policies::{ActionOptions, ConcurrencyPolicy};
use crate::state::{Mutator, StateStore};
use crate::tasks::{erase, AbortToken, Action, ActionFn, ActionTask, Signature};
use crate::triggers::{TriggerHandle, TriggerRegistry};

struct EngineInner<S> {
    cfg: EngineConfig,
    store: Arc<dyn StateStore<S>>,
    registry: ActionRegistry<S>,
    triggers: Arc<TriggerRegistry>,
    next_invocation: AtomicU64,
}

/// Named action engine over host state `S`.
///
/// Cheap to clone; clones share the same registries.
pub struct ActionEngine<S> {
    inner: Arc<EngineInner<S>>,
}

impl<S> Clone for ActionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Send + 'static> ActionEngine<S> {
    /// Creates an engine with the default [`EngineConfig`].
    pub fn new<T: StateStore<S>>(store: Arc<T>) -> Self {
        Self::builder(store).build()
    }

    /// Starts building an engine over `store`.
    pub fn builder<T: StateStore<S>>(store: Arc<T>) -> EngineBuilder<S> {
        EngineBuilder::new(store)
    }

    pub(crate) fn from_parts(cfg: EngineConfig, store: Arc<dyn StateStore<S>>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                registry: ActionRegistry::new(cfg.error_log_limit()),
                cfg,
                store,
                triggers: TriggerRegistry::new(),
                next_invocation: AtomicU64::new(1),
            }),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.cfg
    }

    // ---------------------------
    // Definitions
    // ---------------------------

    /// Registers `action` under `name`.
    ///
    /// Re-defining a name replaces the handler and policy; run history and error
    /// log are kept.
    ///
    /// Invocations already in flight keep running under the old definition and
    /// keep their running slots. Redefining a parallel action as exclusive while
    /// `n > 1` invocations are in flight therefore leaves `running_count == n`
    /// until they settle; the new policy only gates calls made after `define`,
    /// and every such call is rejected until the count drops to zero.
    pub fn define<T>(&self, name: &str, action: T, options: ActionOptions)
    where
        T: Action<S>,
    {
        let policy = options.policy.unwrap_or(self.inner.cfg.default_policy);
        let replaced = self.inner.registry.define(name, erase(action), policy);
        debug!(
            action = name,
            policy = policy.as_label(),
            replaced,
            "action defined"
        );
    }

    /// Registers a closure `f(args, mutate, token)` under `name`.
    pub fn define_fn<A, R, F, Fut>(&self, name: &str, f: F, options: ActionOptions)
    where
        F: Fn(A, Mutator<S>, AbortToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
        A: Send + 'static,
        R: Send + 'static,
    {
        self.define(name, ActionFn::new(f), options);
    }

    /// True if an action is registered under `name`.
    pub fn is_defined(&self, name: &str) -> bool {
        self.inner.registry.is_defined(name)
    }

    /// Policy of the action registered under `name`.
    pub fn policy(&self, name: &str) -> Option<ConcurrencyPolicy> {
        self.inner.registry.policy(name)
    }

    /// Sorted names of all registered actions.
    pub fn action_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    // ---------------------------
    // Invocation
    // ---------------------------

    /// Calls the action registered under `name`.
    ///
    /// Never fails synchronously: a rejected call (unknown name, signature
    /// mismatch, busy exclusive action, no runtime) returns a task that resolves
    /// to the rejection immediately.
    ///
    /// The invocation is spawned on the current tokio runtime; outside one the
    /// call is rejected with [`ActionError::NoRuntime`] before anything is claimed.
    pub fn call<A, R>(&self, name: &str, args: A) -> ActionTask<R>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        self.try_call(name, args)
            .unwrap_or_else(ActionTask::rejected)
    }

    /// Like [`call`](Self::call), but returns rejections as `Err`.
    ///
    /// On `Err` no handler ran, no trigger fired and no bookkeeping changed.
    pub fn try_call<A, R>(&self, name: &str, args: A) -> Result<ActionTask<R>, ActionError>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!(action = name, "call rejected: no tokio runtime");
            return Err(ActionError::NoRuntime {
                name: Arc::from(name),
            });
        };

        let found = Signature::of::<A, R>();
        let admitted = match self.inner.registry.admit(name, &found) {
            Ok(admitted) => admitted,
            Err(err) => {
                if err.is_concurrency() {
                    warn!(action = name, "call rejected: action already running");
                } else {
                    debug!(action = name, reason = err.as_label(), "call rejected");
                }
                return Err(err);
            }
        };

        let expected = admitted.action.signature();
        let token = AbortToken::new();
        let handler = admitted
            .action
            .start(
                Box::new(args),
                Mutator::new(Arc::clone(&self.inner.store)),
                token.clone(),
            )
            .map_err(|_args| expected.mismatch(Arc::clone(&admitted.name), &found))?;

        let id = self.inner.next_invocation.fetch_add(1, Ordering::Relaxed);
        debug!(
            action = %admitted.name,
            invocation = id,
            policy = admitted.policy.as_label(),
            "invocation admitted"
        );

        let invocation = Invocation::begin(
            id,
            Arc::clone(&admitted.name),
            token.clone(),
            admitted.slot,
            Arc::clone(&self.inner.triggers),
            Arc::clone(self.inner.registry.runs()),
        );

        let name = admitted.name;
        let task_name = Arc::clone(&name);
        let join = runtime.spawn(async move {
            let value = invocation.run(handler).await?;
            value
                .downcast::<R>()
                .map(|v| *v)
                .map_err(|_| expected.mismatch(task_name, &found))
        });

        Ok(ActionTask::spawned(name, token, join))
    }

    // ---------------------------
    // Bookkeeping
    // ---------------------------

    /// True if an invocation of `name` succeeded since the last reset.
    pub fn has_action_run(&self, name: &str) -> bool {
        self.inner.registry.runs().has_run(name)
    }

    /// True while at least one invocation of `name` is in flight.
    pub fn is_action_running(&self, name: &str) -> bool {
        self.running_count(name) > 0
    }

    /// Number of in-flight invocations of `name`.
    pub fn running_count(&self, name: &str) -> usize {
        self.inner.registry.runs().running(name)
    }

    /// True if the error log of `name` is non-empty.
    pub fn has_action_failed(&self, name: &str) -> bool {
        self.inner.registry.runs().has_failed(name)
    }

    /// Recorded failures of `name`, oldest first.
    pub fn get_action_errors(&self, name: &str) -> Vec<ErrorEntry> {
        self.inner.registry.runs().errors(name)
    }

    /// Clears run flags and error logs of every action.
    ///
    /// In-flight invocations are not cancelled and still count as running; when
    /// they settle they update bookkeeping as usual.
    pub fn reset_action_state(&self) {
        self.inner.registry.runs().reset_all();
        debug!("action state reset");
    }

    /// Clears the run flag and error log of one action.
    pub fn reset_action(&self, name: &str) {
        self.inner.registry.runs().reset(name);
        debug!(action = name, "action state reset");
    }

    // ---------------------------
    // Triggers
    // ---------------------------

    /// Registers a listener for `phase` of `name`.
    pub fn on_action<F>(&self, name: &str, phase: TriggerPhase, listener: F) -> TriggerHandle
    where
        F: Fn(&ActionEvent) + Send + Sync + 'static,
    {
        self.inner.triggers.add(name, phase, Arc::new(listener))
    }

    /// Fires before the handler of each admitted invocation starts.
    pub fn on_before_action<F>(&self, name: &str, listener: F) -> TriggerHandle
    where
        F: Fn(&ActionEvent) + Send + Sync + 'static,
    {
        self.on_action(name, TriggerPhase::Before, listener)
    }

    /// Fires once per invocation after it settled, whatever the outcome.
    pub fn on_after_action<F>(&self, name: &str, listener: F) -> TriggerHandle
    where
        F: Fn(&ActionEvent) + Send + Sync + 'static,
    {
        self.on_action(name, TriggerPhase::After, listener)
    }

    /// Fires when a handler resolves.
    pub fn on_action_success<F>(&self, name: &str, listener: F) -> TriggerHandle
    where
        F: Fn(&ActionEvent) + Send + Sync + 'static,
    {
        self.on_action(name, TriggerPhase::Success, listener)
    }

    /// Fires when a handler fails; not fired for aborted invocations.
    pub fn on_action_error<F>(&self, name: &str, listener: F) -> TriggerHandle
    where
        F: Fn(&ActionEvent) + Send + Sync + 'static,
    {
        self.on_action(name, TriggerPhase::Error, listener)
    }

    /// Number of listeners attached to `phase` of `name`.
    pub fn trigger_count(&self, name: &str, phase: TriggerPhase) -> usize {
        self.inner.triggers.count(name, phase)
    }
}

impl<S> std::fmt::Debug for ActionEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionEngine")
            .field("cfg", &self.inner.cfg)
            .finish_non_exhaustive()
    }
}
