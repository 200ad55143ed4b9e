//! Concurrent identifier -> operation map

use crate::state::{OperationId, OperationState};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Registry of every search the process knows about
#[derive(Debug, Default)]
pub struct SearchRegistry {
    operations: DashMap<OperationId, Arc<OperationState>>,
}

impl SearchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation under its own identifier
    ///
    /// The entry is visible to lookups on other threads as soon as this returns.
    pub fn insert(&self, op: Arc<OperationState>) {
        self.operations.insert(op.id().clone(), op);
    }

    pub fn get(&self, id: &str) -> Option<Arc<OperationState>> {
        self.operations.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, id: &str) -> Option<Arc<OperationState>> {
        self.operations.remove(id).map(|(_, op)| op)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Removes terminal operations that finished at least `retention` ago
    ///
    /// Active operations are never removed. Returns how many entries were dropped.
    pub fn evict_finished(&self, retention: Duration) -> usize {
        let mut evicted = 0;
        self.operations.retain(|_, op| match op.finished_for() {
            Some(age) if age >= retention => {
                evicted += 1;
                false
            }
            _ => true,
        });
        evicted
    }
}
