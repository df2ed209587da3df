//! ReassemblyJob - fixed-size slot array with an exactly-once completion
//!
//! Slots are filled in any order from any task. The completion counter is a
//! single atomic `fetch_add`; exactly one filler observes the final count and
//! runs the completion callback with the slots in index order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

/// Callback receiving every slot, in index order
pub type CompletionCallback<T> = Box<dyn FnOnce(Vec<T>) + Send>;

/// One in-flight gather of `total` results
pub struct ReassemblyJob<T> {
    slots: Vec<Mutex<Option<T>>>,
    completed: AtomicUsize,
    on_complete: Mutex<Option<CompletionCallback<T>>>,
}

impl<T: Send> ReassemblyJob<T> {
    /// Create a job for `total` slots
    ///
    /// With `total == 0` the callback runs immediately with no slots.
    pub fn new(total: usize, on_complete: CompletionCallback<T>) -> Self {
        let job = Self {
            slots: (0..total).map(|_| Mutex::new(None)).collect(),
            completed: AtomicUsize::new(0),
            on_complete: Mutex::new(Some(on_complete)),
        };
        if total == 0 {
            job.complete();
        }
        job
    }

    pub fn total(&self) -> usize {
        self.slots.len()
    }

    /// Slots filled so far
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire).min(self.total())
    }

    pub fn is_complete(&self) -> bool {
        self.completed() == self.total()
    }

    /// Store the result for slot `index`
    ///
    /// Returns true for the fill that completed the job. Out-of-range and
    /// repeated fills are ignored and never count towards completion.
    pub fn fill(&self, index: usize, value: T) -> bool {
        let Some(slot) = self.slots.get(index) else {
            warn!(index, total = self.total(), "Slot index out of range");
            return false;
        };
        {
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                warn!(index, "Slot filled twice, ignoring");
                return false;
            }
            *slot = Some(value);
        }

        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        if done == self.total() {
            self.complete();
            true
        } else {
            false
        }
    }

    fn complete(&self) {
        let callback = self
            .on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(callback) = callback else {
            return;
        };

        let values = self
            .slots
            .iter()
            .filter_map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).take())
            .collect();
        callback(values);
    }
}
