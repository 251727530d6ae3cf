use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::effects::delegate::TaskDelegate;

/// Thread-safe task id → delegate lookup table.
///
/// Reads are concurrent, writes exclusive; callbacks for unrelated tasks
/// never serialize against each other longer than the map update itself.
/// The lock is never held across I/O.
///
/// An entry corresponds to exactly one live task and is removed exactly
/// once, by the driver, on that task's completion.
#[derive(Default)]
pub struct DelegateRegistry {
    entries: RwLock<HashMap<u64, Arc<TaskDelegate>>>,
}

impl DelegateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the delegate for a task.
    pub fn get(&self, task_id: u64) -> Option<Arc<TaskDelegate>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&task_id)
            .cloned()
    }

    /// Insert (`Some`) or remove (`None`) a task's delegate.
    pub fn set(&self, task_id: u64, delegate: Option<Arc<TaskDelegate>>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match delegate {
            Some(delegate) => {
                trace!(task_id, "delegate registered");
                entries.insert(task_id, delegate);
            }
            None => {
                trace!(task_id, "delegate removed");
                entries.remove(&task_id);
            }
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
