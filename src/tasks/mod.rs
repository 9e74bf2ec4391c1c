//! # Action handlers, abort tokens and call handles.
//!
//! This module provides the task-related types:
//! - [`Action`] - trait for implementing async, abortable handlers
//! - [`ActionFn`] - closure-backed handler
//! - [`AbortToken`] - abort signal plus abort-time cleanups for one invocation
//! - [`ActionTask`] - awaitable, abortable handle returned by `call`

mod action;
mod handle;
mod token;

pub use action::{Action, ActionFn};
pub use handle::ActionTask;
pub use token::AbortToken;

pub(crate) use action::{erase, AnyBox, ErasedAction, Signature};
