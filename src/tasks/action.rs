//! # Action handlers.
//!
//! [`Action`] is the async handler behind a registered name. It receives the call's
//! arguments, a [`Mutator`] for the host state, and the invocation's [`AbortToken`].
//! [`ActionFn`] adapts a plain closure.
//!
//! The engine stores handlers of different argument and output types side by side,
//! so each one is erased behind [`ErasedAction`] together with its [`Signature`];
//! `call` checks the signature before anything runs.

use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{ActionError, BoxError};
use crate::state::Mutator;
use crate::tasks::token::AbortToken;

/// # Asynchronous, abortable action handler.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use actionvisor::{AbortToken, Action, BoxError, Mutator};
///
/// struct Increment;
///
/// #[async_trait]
/// impl Action<u64> for Increment {
///     type Args = u64;
///     type Output = ();
///
///     async fn run(&self, by: u64, mutate: Mutator<u64>, token: AbortToken) -> Result<(), BoxError> {
///         if token.is_aborted() {
///             return Ok(());
///         }
///         mutate.mutate(|n| *n += by);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Action<S: 'static>: Send + Sync + 'static {
    /// Arguments passed to [`ActionEngine::call`](crate::ActionEngine::call).
    type Args: Send + 'static;
    /// Success value the call resolves to.
    type Output: Send + 'static;

    /// Runs one invocation.
    ///
    /// Long-running handlers should register cleanups with [`AbortToken::on_abort`]
    /// or race their work against [`AbortToken::aborted`].
    async fn run(
        &self,
        args: Self::Args,
        mutate: Mutator<S>,
        token: AbortToken,
    ) -> Result<Self::Output, BoxError>;
}

/// Closure-backed [`Action`].
///
/// Wraps `F: Fn(A, Mutator<S>, AbortToken) -> Fut`, producing a fresh future per call.
pub struct ActionFn<F, A, R> {
    f: F,
    _sig: PhantomData<fn(A) -> R>,
}

impl<F, A, R> ActionFn<F, A, R> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _sig: PhantomData,
        }
    }
}

impl<F, A, R> fmt::Debug for ActionFn<F, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionFn")
            .field("args", &std::any::type_name::<A>())
            .field("output", &std::any::type_name::<R>())
            .finish()
    }
}

#[async_trait]
impl<S, F, Fut, A, R> Action<S> for ActionFn<F, A, R>
where
    S: 'static,
    F: Fn(A, Mutator<S>, AbortToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    type Args = A;
    type Output = R;

    async fn run(&self, args: A, mutate: Mutator<S>, token: AbortToken) -> Result<R, BoxError> {
        (self.f)(args, mutate, token).await
    }
}

/// Argument and output types of a handler.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Signature {
    args: TypeId,
    output: TypeId,
    args_name: &'static str,
    output_name: &'static str,
}

impl Signature {
    pub(crate) fn of<A: 'static, R: 'static>() -> Self {
        Self {
            args: TypeId::of::<A>(),
            output: TypeId::of::<R>(),
            args_name: std::any::type_name::<A>(),
            output_name: std::any::type_name::<R>(),
        }
    }

    pub(crate) fn matches(&self, other: &Signature) -> bool {
        self.args == other.args && self.output == other.output
    }

    /// Error for a call with signature `found` against this (registered) one.
    pub(crate) fn mismatch(&self, name: Arc<str>, found: &Signature) -> ActionError {
        ActionError::SignatureMismatch {
            name,
            expected: self.to_string(),
            found: found.to_string(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.args_name, self.output_name)
    }
}

pub(crate) type AnyBox = Box<dyn Any + Send>;

/// Type-erased handler stored by the registry.
pub(crate) trait ErasedAction<S>: Send + Sync {
    fn signature(&self) -> Signature;

    /// Builds the invocation future; nothing runs until it is polled.
    ///
    /// Hands `args` back if they are not the handler's argument type.
    fn start(
        &self,
        args: AnyBox,
        mutate: Mutator<S>,
        token: AbortToken,
    ) -> Result<BoxFuture<'static, Result<AnyBox, BoxError>>, AnyBox>;
}

struct Erased<T> {
    action: Arc<T>,
}

impl<S, T> ErasedAction<S> for Erased<T>
where
    S: 'static,
    T: Action<S>,
{
    fn signature(&self) -> Signature {
        Signature::of::<T::Args, T::Output>()
    }

    fn start(
        &self,
        args: AnyBox,
        mutate: Mutator<S>,
        token: AbortToken,
    ) -> Result<BoxFuture<'static, Result<AnyBox, BoxError>>, AnyBox> {
        let args = args.downcast::<T::Args>()?;
        let action = Arc::clone(&self.action);
        Ok(Box::pin(async move {
            let out = action.run(*args, mutate, token).await?;
            Ok(Box::new(out) as AnyBox)
        }))
    }
}

pub(crate) fn erase<S, T>(action: T) -> Arc<dyn ErasedAction<S>>
where
    S: 'static,
    T: Action<S>,
{
    Arc::new(Erased {
        action: Arc::new(action),
    })
}
