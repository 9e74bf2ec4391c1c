use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Mutable state container owned by the host application.
///
/// `mutate` applies `f` to the state in place. Implementations decide how
/// (and whether) concurrent mutations are serialized.
pub trait StateStore<S>: Send + Sync + 'static {
    /// Applies `f` to the current state.
    fn mutate(&self, f: &mut dyn FnMut(&mut S));
}

/// Mutation callback handed to every handler invocation.
///
/// Cheap to clone; all clones write to the same store.
pub struct Mutator<S> {
    store: Arc<dyn StateStore<S>>,
}

impl<S: 'static> Mutator<S> {
    pub(crate) fn new(store: Arc<dyn StateStore<S>>) -> Self {
        Self { store }
    }

    /// Applies `f` to the shared state.
    pub fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut S),
    {
        let mut f = Some(f);
        self.store.mutate(&mut |state| {
            if let Some(f) = f.take() {
                f(state);
            }
        });
    }
}

impl<S> Clone for Mutator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> fmt::Debug for Mutator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutator").finish_non_exhaustive()
    }
}

/// Mutex-backed [`StateStore`].
///
/// ## Example
/// ```
/// use actionvisor::{SharedState, StateStore};
///
/// let state = SharedState::new(0u32);
/// state.mutate(&mut |n| *n += 1);
/// assert_eq!(state.get(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SharedState<S> {
    inner: Mutex<S>,
}

impl<S> SharedState<S> {
    /// Wraps an initial state value.
    pub fn new(initial: S) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// Same as [`SharedState::new`], returned as an `Arc` ready for an engine.
    pub fn arc(initial: S) -> Arc<Self> {
        Arc::new(Self::new(initial))
    }

    /// Reads the state through `f` without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.inner.lock();
        f(&*guard)
    }

    /// Replaces the state, returning the previous value.
    pub fn replace(&self, next: S) -> S {
        std::mem::replace(&mut *self.inner.lock(), next)
    }
}

impl<S: Clone> SharedState<S> {
    /// Returns a copy of the current state.
    pub fn get(&self) -> S {
        self.inner.lock().clone()
    }
}

impl<S: Send + 'static> StateStore<S> for SharedState<S> {
    fn mutate(&self, f: &mut dyn FnMut(&mut S)) {
        let mut guard = self.inner.lock();
        f(&mut *guard);
    }
}
