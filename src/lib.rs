//! # actionvisor
//!
//! **Actionvisor** is a named-action execution engine for async Rust.
//!
//! Register async handlers under a name; the engine decides whether a call may
//! start (concurrency policy), runs it as an abortable task, notifies lifecycle
//! listeners, and keeps per-name bookkeeping: has it ever succeeded, is it running,
//! which errors has it produced.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     define("load-user", handler, ActionOptions)       on_before_action / on_after_action
//!                     │                                 on_action_success / on_action_error
//!                     ▼                                               │
//! ┌───────────────────────────────────────────────────────────────────┼──────┐
//! │  ActionEngine<S>                                                  ▼      │
//! │  - ActionRegistry (name → handler, policy)             TriggerRegistry   │
//! │  - RunTable (has_run, running, error log)              (per name/phase)  │
//! │  - StateStore<S> (host state, reached via Mutator<S>)                    │
//! └──────┬───────────────────────────────────────────────────────────────────┘
//!        │ call(name, args)
//!        ▼
//!   admit ──► Before ──► tokio::spawn(handler(args, Mutator, AbortToken))
//!                               │
//!               ┌───────────────┼──────────────────┐
//!               ▼               ▼                  ▼
//!           resolved          failed            aborted
//!           Success           Error               │
//!               └───────────────┴────► After ◄────┘
//!                                        │
//!                                  release running slot
//! ```
//!
//! ### Lifecycle
//! ```text
//! Pending ──► Running ──► Succeeded   has_run = true
//!                    ├──► Failed      error log += entry, caller gets ActionError::Failed
//!                    └──► Aborted     cleanups ran, caller gets ActionError::Aborted
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Actions**       | Define handlers as trait impls or closures.                  | [`Action`], [`ActionFn`]                    |
//! | **Calls**         | Awaitable, abortable handles with ordered abort cleanups.    | [`ActionTask`], [`AbortToken`]              |
//! | **Policies**      | Exclusive or parallel invocations per name.                  | [`ConcurrencyPolicy`], [`ActionOptions`]    |
//! | **Triggers**      | Before/after/success/error listeners with disposal handles.  | [`TriggerHandle`], [`ActionEvent`]          |
//! | **Bookkeeping**   | Has-run flags, running counts, error logs, reset.            | [`ErrorEntry`]                              |
//! | **State**         | Host state reached only through a mutation callback.         | [`StateStore`], [`Mutator`], [`SharedState`]|
//! | **Errors**        | Typed errors separating abort, policy and handler failures.  | [`ActionError`]                             |
//! | **Configuration** | Engine-wide defaults.                                        | [`EngineConfig`], [`EngineBuilder`]         |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use actionvisor::{AbortToken, ActionEngine, ActionOptions, BoxError, Mutator, SharedState};
//!
//! #[derive(Clone, Debug, Default)]
//! struct UserInfo { first_name: String, age: u32 }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = SharedState::arc(UserInfo::default());
//!     let engine = ActionEngine::new(state.clone());
//!
//!     engine.define_fn(
//!         "load-user-info",
//!         |(): (), mutate: Mutator<UserInfo>, token: AbortToken| async move {
//!             let timer = tokio::spawn(tokio::time::sleep(Duration::from_millis(50)));
//!             let abort = timer.abort_handle();
//!             token.on_abort(move || abort.abort());
//!             timer.await?;
//!             mutate.mutate(|u| { u.first_name = "Jane".into(); u.age = 32; });
//!             Ok::<_, BoxError>(())
//!         },
//!         ActionOptions::default(),
//!     );
//!
//!     let task = engine.call::<(), ()>("load-user-info", ());
//!     task.await?;
//!     assert_eq!(state.get().first_name, "Jane");
//!     assert!(engine.has_action_run("load-user-info"));
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod state;
mod tasks;
mod triggers;

// ---- Public re-exports ----

pub use crate::core::{ActionEngine, EngineBuilder, EngineConfig, ErrorEntry, InvocationState};
pub use error::{ActionError, BoxError, HandlerError, HandlerPanic};
pub use events::{ActionEvent, TriggerPhase};
pub use policies::{ActionOptions, ConcurrencyPolicy};
pub use state::{Mutator, SharedState, StateStore};
pub use tasks::{AbortToken, Action, ActionFn, ActionTask};
pub use triggers::{Listener, TriggerHandle};
