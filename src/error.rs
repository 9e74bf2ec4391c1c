//! Error types used by the action engine and action handlers.
//!
//! - [`ActionError`]: every way a call can end other than success.
//! - [`HandlerError`]: the shared, opaque error a handler produced.
//! - [`HandlerPanic`]: stands in for the error when a handler panics.
//!
//! [`ActionError`] provides helper methods (`as_label`, `as_message`) for logging
//! plus predicates so callers can tell cancellation apart from genuine failure.

use std::sync::Arc;

use thiserror::Error;

/// Error type returned by action handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Handler error as stored in the error log and surfaced to callers.
///
/// Shared so that [`ErrorEntry`](crate::ErrorEntry) and the rejected call hold the same value.
pub type HandlerError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by calling an action.
///
/// `UnknownAction`, `NoRuntime`, `SignatureMismatch` and `Concurrency` are raised before an
/// invocation starts: no handler runs, no trigger fires, no bookkeeping changes.
/// `Aborted` and `Failed` are raised after the invocation has been recorded.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ActionError {
    /// The invocation was aborted before it settled.
    #[error("action '{name}' aborted")]
    Aborted {
        /// Action name.
        name: Arc<str>,
    },

    /// An exclusive action was called while another invocation is in flight.
    #[error("action '{name}' is already running")]
    Concurrency {
        /// Action name.
        name: Arc<str>,
    },

    /// No action is registered under this name.
    #[error("unknown action '{name}'")]
    UnknownAction {
        /// Requested name.
        name: Arc<str>,
    },

    /// The call was made outside a tokio runtime, so no invocation could be spawned.
    #[error("action '{name}' called outside a tokio runtime")]
    NoRuntime {
        /// Action name.
        name: Arc<str>,
    },

    /// The call's argument or result type does not match the registered handler.
    #[error("action '{name}' expects {expected}, called with {found}")]
    SignatureMismatch {
        /// Action name.
        name: Arc<str>,
        /// Signature of the registered handler (`args -> output`).
        expected: String,
        /// Signature requested by the caller.
        found: String,
    },

    /// The handler returned an error (or panicked).
    #[error("action '{name}' failed: {source}")]
    Failed {
        /// Action name.
        name: Arc<str>,
        /// The handler's own error, not reinterpreted.
        #[source]
        source: HandlerError,
    },
}

impl ActionError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use actionvisor::ActionError;
    ///
    /// let err = ActionError::Concurrency { name: "sync".into() };
    /// assert_eq!(err.as_label(), "action_concurrency");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ActionError::Aborted { .. } => "action_aborted",
            ActionError::Concurrency { .. } => "action_concurrency",
            ActionError::UnknownAction { .. } => "action_unknown",
            ActionError::NoRuntime { .. } => "action_no_runtime",
            ActionError::SignatureMismatch { .. } => "action_signature_mismatch",
            ActionError::Failed { .. } => "action_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ActionError::Aborted { name } => format!("aborted: {name}"),
            ActionError::Concurrency { name } => format!("already running: {name}"),
            ActionError::UnknownAction { name } => format!("unknown: {name}"),
            ActionError::NoRuntime { name } => format!("no runtime: {name}"),
            ActionError::SignatureMismatch {
                name,
                expected,
                found,
            } => format!("signature mismatch: {name} expected={expected} found={found}"),
            ActionError::Failed { name, source } => format!("failed: {name}: {source}"),
        }
    }

    /// Name of the action this error refers to.
    pub fn action(&self) -> &str {
        match self {
            ActionError::Aborted { name }
            | ActionError::Concurrency { name }
            | ActionError::UnknownAction { name }
            | ActionError::NoRuntime { name }
            | ActionError::SignatureMismatch { name, .. }
            | ActionError::Failed { name, .. } => name,
        }
    }

    /// True if the call was cancelled through `abort()`.
    ///
    /// # Example
    /// ```
    /// use actionvisor::ActionError;
    ///
    /// assert!(ActionError::Aborted { name: "load".into() }.is_abort());
    /// assert!(!ActionError::UnknownAction { name: "load".into() }.is_abort());
    /// ```
    pub fn is_abort(&self) -> bool {
        matches!(self, ActionError::Aborted { .. })
    }

    /// True if the call was rejected by the exclusive concurrency gate.
    pub fn is_concurrency(&self) -> bool {
        matches!(self, ActionError::Concurrency { .. })
    }

    /// Returns the handler's error for [`ActionError::Failed`].
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            ActionError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Recorded in place of a handler error when the handler panics.
#[derive(Error, Debug, Clone)]
#[error("handler panicked: {message}")]
pub struct HandlerPanic {
    /// Panic payload rendered as text (when it was a string).
    pub message: String,
}

impl HandlerPanic {
    pub(crate) fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}
