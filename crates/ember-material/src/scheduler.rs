//! Pending-rebuild tracking.
//!
//! Structural edits only mark their instance dirty. The expensive key recompute and
//! cache reconciliation happen when the owner drains the scheduler during a flush.

use std::collections::VecDeque;

use ahash::AHashSet;
use ember_common::MaterialId;
use parking_lot::Mutex;

/// FIFO of instances awaiting a rebuild, without duplicates.
#[derive(Debug, Default)]
pub struct DirtyScheduler {
    queue: VecDeque<MaterialId>,
    pending: AHashSet<MaterialId>,
}

impl DirtyScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` pending. Returns `false` if it already was.
    pub fn mark_dirty(&mut self, id: MaterialId) -> bool {
        if self.pending.insert(id) {
            self.queue.push_back(id);
            true
        } else {
            false
        }
    }

    /// Removes the oldest pending instance.
    pub fn pop(&mut self) -> Option<MaterialId> {
        let id = self.queue.pop_front()?;
        self.pending.remove(&id);
        Some(id)
    }

    /// Removes `id` from the pending set. Returns `true` if it was pending.
    pub fn cancel(&mut self, id: MaterialId) -> bool {
        if self.pending.remove(&id) {
            self.queue.retain(|queued| *queued != id);
            true
        } else {
            false
        }
    }

    /// Whether `id` is pending.
    #[must_use]
    pub fn is_pending(&self, id: MaterialId) -> bool {
        self.pending.contains(&id)
    }

    /// Number of pending instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Access to the scheduler inside a larger locked state.
pub trait SchedulerState {
    /// The scheduler.
    fn scheduler(&mut self) -> &mut DirtyScheduler;
}

impl SchedulerState for DirtyScheduler {
    fn scheduler(&mut self) -> &mut DirtyScheduler {
        self
    }
}

/// Outcome of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Instances drained
    pub processed: usize,
    /// Instances whose key changed and were re-bound
    pub rebuilt: usize,
    /// Instances whose key was unchanged
    pub unchanged: usize,
    /// Instances left without a shader after a compile failure
    pub failed: usize,
}

/// Per-instance result reported by a flush callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Key changed and a variant was bound
    Rebuilt,
    /// Key unchanged, no cache interaction
    Unchanged,
    /// Compile failed, instance has no variant
    Failed,
    /// Instance vanished before it was processed
    Skipped,
}

/// Drains every pending instance, taking the lock once per item.
///
/// Marks made by other threads between items, or by `process` itself, are drained by
/// this same call. `process` runs with the lock held.
pub fn drain_pending<S, F>(state: &Mutex<S>, mut process: F) -> FlushReport
where
    S: SchedulerState,
    F: FnMut(&mut S, MaterialId) -> FlushOutcome,
{
    let mut report = FlushReport::default();
    loop {
        let mut guard = state.lock();
        let Some(id) = guard.scheduler().pop() else {
            break;
        };
        match process(&mut *guard, id) {
            FlushOutcome::Rebuilt => report.rebuilt += 1,
            FlushOutcome::Unchanged => report.unchanged += 1,
            FlushOutcome::Failed => report.failed += 1,
            FlushOutcome::Skipped => continue,
        }
        report.processed += 1;
    }
    report
}
