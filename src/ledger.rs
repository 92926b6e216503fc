//! The per-task Boost Ledger (nested-mode inheritance).
//!
//! `N_NEST == 0` degenerates [`BoostLedger`] to a permanently empty,
//! zero-capacity `ArrayVec`, so "simple mode" falls out of "nested mode" as
//! a special case rather than needing a separate type.

use arrayvec::ArrayVec;

use crate::sched::{SchedulerCore, SemId};

/// One outstanding boost contributed by a waiter on `sem_id` to the holder
/// whose ledger this entry lives in.
///
/// Multiple entries naming the same `(task, semaphore)` are permitted: when
/// several waiters have accumulated on the same semaphore, each contributes
/// its own entry (see scenario 4 in `DESIGN.md`/`tests/scenarios.rs`).
pub struct BoostEntry<S: SchedulerCore + ?Sized> {
    pub sem_id: SemId,
    pub priority: S::Priority,
}

impl<S: SchedulerCore + ?Sized> Clone for BoostEntry<S> {
    fn clone(&self) -> Self {
        Self {
            sem_id: self.sem_id,
            priority: self.priority,
        }
    }
}
impl<S: SchedulerCore + ?Sized> Copy for BoostEntry<S> {}

impl<S: SchedulerCore + ?Sized> core::fmt::Debug for BoostEntry<S>
where
    S::Priority: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoostEntry")
            .field("sem_id", &self.sem_id)
            .field("priority", &self.priority)
            .finish()
    }
}

/// A per-task bounded sequence of [`BoostEntry`], capacity `N_NEST`.
///
/// Invariant: the owning task's effective priority always equals
/// `max(base_priority, max over this ledger of entry.priority)`. The ledger
/// is unordered — entries are removed by swap-with-last, never by shifting.
pub struct BoostLedger<S: SchedulerCore + ?Sized, const N_NEST: usize> {
    entries: ArrayVec<BoostEntry<S>, N_NEST>,
}

impl<S: SchedulerCore + ?Sized, const N_NEST: usize> Default for BoostLedger<S, N_NEST> {
    fn default() -> Self {
        Self {
            entries: ArrayVec::new(),
        }
    }
}

impl<S: SchedulerCore + ?Sized, const N_NEST: usize> BoostLedger<S, N_NEST> {
    pub const fn new() -> Self {
        Self {
            entries: ArrayVec::new_const(),
        }
    }

    /// Push a new boost entry. Returns `false` (and leaves the ledger
    /// unchanged) if the ledger is already at capacity — the caller is
    /// responsible for logging this as a dropped boost (§7: "Ledger full").
    #[must_use]
    pub fn try_push(&mut self, sem_id: SemId, priority: S::Priority) -> bool {
        self.entries.try_push(BoostEntry { sem_id, priority }).is_ok()
    }

    /// Remove every entry naming `sem_id` ("holder no longer holds any count
    /// on this semaphore").
    pub fn strip_all(&mut self, sem_id: SemId) {
        self.entries.retain(|e| e.sem_id != sem_id);
    }

    /// Remove exactly the highest-priority entry naming `sem_id`, by
    /// swap-with-last. No-op if no entry names `sem_id`.
    ///
    /// Used when the holder still holds a count on the semaphore but one of
    /// several waiters was just satisfied (scenario 4).
    pub fn strip_one_highest(&mut self, sem_id: SemId) {
        let mut best: Option<usize> = None;
        for (i, e) in self.entries.iter().enumerate() {
            if e.sem_id == sem_id {
                let better = match best {
                    None => true,
                    Some(b) => e.priority > self.entries[b].priority,
                };
                if better {
                    best = Some(i);
                }
            }
        }
        if let Some(i) = best {
            self.entries.swap_remove(i);
        }
    }

    /// `max(base_priority, max over entries of entry.priority)`.
    pub fn effective_priority(&self, base_priority: S::Priority) -> S::Priority {
        self.entries
            .iter()
            .map(|e| e.priority)
            .fold(base_priority, |acc, p| if p > acc { p } else { acc })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True iff no entry in the ledger names `sem_id`. Used by the
    /// `verify_holder` debug assertion.
    pub fn has_none_for(&self, sem_id: SemId) -> bool {
        self.entries.iter().all(|e| e.sem_id != sem_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoostEntry<S>> {
        self.entries.iter()
    }
}
