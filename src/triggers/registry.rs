use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::events::{ActionEvent, TriggerPhase};

use super::handle::TriggerHandle;

/// Shared trigger listener.
pub type Listener = Arc<dyn Fn(&ActionEvent) + Send + Sync + 'static>;

struct Registration {
    id: u64,
    listener: Listener,
}

/// Per-name listener lists, one per phase.
#[derive(Default)]
struct PhaseLists {
    before: Vec<Registration>,
    after: Vec<Registration>,
    success: Vec<Registration>,
    error: Vec<Registration>,
}

impl PhaseLists {
    fn slot(&self, phase: TriggerPhase) -> &Vec<Registration> {
        match phase {
            TriggerPhase::Before => &self.before,
            TriggerPhase::After => &self.after,
            TriggerPhase::Success => &self.success,
            TriggerPhase::Error => &self.error,
        }
    }

    fn slot_mut(&mut self, phase: TriggerPhase) -> &mut Vec<Registration> {
        match phase {
            TriggerPhase::Before => &mut self.before,
            TriggerPhase::After => &mut self.after,
            TriggerPhase::Success => &mut self.success,
            TriggerPhase::Error => &mut self.error,
        }
    }

    fn is_empty(&self) -> bool {
        self.before.is_empty()
            && self.after.is_empty()
            && self.success.is_empty()
            && self.error.is_empty()
    }
}

/// Registry of lifecycle listeners keyed by action name.
///
/// Names do not have to be defined as actions; listeners may be attached first.
pub(crate) struct TriggerRegistry {
    lists: Mutex<HashMap<String, PhaseLists>>,
    next_id: AtomicU64,
}

impl TriggerRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            lists: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Appends a listener and returns its disposal handle.
    pub(crate) fn add(
        self: &Arc<Self>,
        name: &str,
        phase: TriggerPhase,
        listener: Listener,
    ) -> TriggerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lists
            .lock()
            .entry(name.to_string())
            .or_default()
            .slot_mut(phase)
            .push(Registration { id, listener });
        TriggerHandle::new(Arc::downgrade(self), Arc::from(name), phase, id)
    }

    /// Removes one registration; `false` if it was already gone.
    pub(crate) fn remove(&self, name: &str, phase: TriggerPhase, id: u64) -> bool {
        let mut lists = self.lists.lock();
        let Some(phases) = lists.get_mut(name) else {
            return false;
        };
        let slot = phases.slot_mut(phase);
        let Some(pos) = slot.iter().position(|r| r.id == id) else {
            return false;
        };
        slot.remove(pos);
        if phases.is_empty() {
            lists.remove(name);
        }
        true
    }

    /// Listeners for `name`/`phase`, in registration order.
    pub(crate) fn listeners(&self, name: &str, phase: TriggerPhase) -> Vec<Listener> {
        self.lists
            .lock()
            .get(name)
            .map(|phases| {
                phases
                    .slot(phase)
                    .iter()
                    .map(|r| Arc::clone(&r.listener))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of listeners for `name`/`phase`.
    pub(crate) fn count(&self, name: &str, phase: TriggerPhase) -> usize {
        self.lists
            .lock()
            .get(name)
            .map_or(0, |phases| phases.slot(phase).len())
    }

    /// Calls every listener of `event.name`/`event.phase` synchronously.
    ///
    /// The lock is released before the first listener runs.
    pub(crate) fn fire(&self, event: &ActionEvent) {
        for listener in self.listeners(&event.name, event.phase) {
            if let Err(panic_err) = panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                error!(
                    action = %event.name,
                    phase = event.phase.as_label(),
                    invocation = event.invocation,
                    ?panic_err,
                    "trigger listener panicked"
                );
            }
        }
    }
}
