//! In-process hand-off queue between the feed poller and `GET /flight-plan`

use fplan_common::db::HandOff;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// FIFO of normalized items awaiting pickup by the database manager
///
/// Clones share the same underlying queue.
#[derive(Debug, Clone, Default)]
pub struct HandOffQueue {
    items: Arc<Mutex<VecDeque<HandOff>>>,
}

impl HandOffQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: HandOff) {
        self.lock().push_back(item);
    }

    /// Oldest pending item, `None` when empty
    pub fn pop(&self) -> Option<HandOff> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-modified
    fn lock(&self) -> MutexGuard<'_, VecDeque<HandOff>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
