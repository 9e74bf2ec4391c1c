use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::events::TriggerPhase;

use super::registry::TriggerRegistry;

/// Disposal handle for one trigger registration.
///
/// Dropping the handle keeps the listener registered; call [`dispose`](Self::dispose)
/// to remove it.
pub struct TriggerHandle {
    registry: Weak<TriggerRegistry>,
    name: Arc<str>,
    phase: TriggerPhase,
    id: u64,
    active: AtomicBool,
}

impl TriggerHandle {
    pub(crate) fn new(
        registry: Weak<TriggerRegistry>,
        name: Arc<str>,
        phase: TriggerPhase,
        id: u64,
    ) -> Self {
        Self {
            registry,
            name,
            phase,
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Removes this registration.
    ///
    /// Returns `true` only on the call that removed it; later calls are no-ops.
    pub fn dispose(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.registry
            .upgrade()
            .is_some_and(|reg| reg.remove(&self.name, self.phase, self.id))
    }

    /// True until [`dispose`](Self::dispose) has been called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Action name this listener is attached to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Phase this listener fires on.
    pub fn phase(&self) -> TriggerPhase {
        self.phase
    }
}

impl fmt::Debug for TriggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerHandle")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
