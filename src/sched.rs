//! The external collaborator this crate leans on: the embedding kernel's
//! scheduler and task control blocks.
//!
//! Nothing in this crate ever dereferences a `TaskRef`. It's an opaque
//! lookup key, always re-verified through [`SchedulerCore::verify_tcb`] before a
//! holder is touched (see the cyclic-reference design note in `DESIGN.md`).

use crate::ledger::BoostLedger;

/// An opaque, pointer-derived identity for a semaphore.
///
/// Used as the ledger's cross-reference key instead of a borrowed reference,
/// so a [`crate::ledger::BoostEntry`] can outlive any particular borrow of
/// the semaphore it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemId(usize);

impl SemId {
    /// Derive a `SemId` from a semaphore's address.
    ///
    /// The address is never dereferenced through this value; it's used only
    /// for equality comparison.
    pub fn of<T>(sem: &T) -> Self {
        Self(sem as *const T as usize)
    }
}

/// The interface this crate uses to reach the embedding kernel's task control
/// blocks and ready queue.
///
/// Implementations are expected to be zero-sized (or otherwise cheap to
/// construct): every method takes `&self` and is called from within the
/// embedding kernel's own critical section, never concurrently.
///
/// Split out from [`Scheduler`] so that components which never touch a boost
/// ledger (Holder Pool, Holder Table) can bound on this alone, without being
/// forced to name an `N_NEST` they have no use for.
pub trait SchedulerCore {
    /// An opaque, `Copy + Eq` identity for a task.
    type TaskRef: Copy + Eq;

    /// A task's scheduling priority. Lower numeric values conventionally mean
    /// *higher* urgency is left to the embedding kernel; this crate only ever
    /// compares priorities with `Ord`, never interprets their magnitude.
    type Priority: Copy + Ord;

    /// True iff the task still exists.
    ///
    /// Every holder is re-verified through this method before it is
    /// dereferenced in any way; a `false` result causes the stranded holder
    /// record to be freed and skipped (see `engine::boost_priority`).
    fn verify_tcb(&self, task: Self::TaskRef) -> bool;

    /// The task's immutable base priority.
    fn base_priority(&self, task: Self::TaskRef) -> Self::Priority;

    /// The task's current effective (scheduling) priority.
    fn sched_priority(&self, task: Self::TaskRef) -> Self::Priority;

    /// Set the task's effective priority, possibly marking it
    /// pending-preemption. Used to *raise* a holder's priority to match a
    /// waiter, and (in nested mode) to set it to a freshly recomputed value.
    fn set_priority(&mut self, task: Self::TaskRef, priority: Self::Priority);

    /// Equivalent to [`Self::set_priority`] for the purpose of this crate,
    /// but named separately because an embedding kernel with its own
    /// priority sources (e.g. mutex ceilings) may want to recompute the
    /// task's effective priority from *all* sources rather than blindly
    /// assign `priority`. The default implementation just forwards.
    fn reprioritize(&mut self, task: Self::TaskRef, priority: Self::Priority) {
        self.set_priority(task, priority);
    }

    /// The task currently executing the calling entry point.
    fn current_task(&self) -> Self::TaskRef;

    /// True iff this entry point is being called from interrupt context.
    fn in_interrupt_context(&self) -> bool;
}

/// The nested-mode extension of [`SchedulerCore`]: gives the Inheritance
/// Engine access to a task's [`BoostLedger`].
///
/// Parameterized by `N_NEST` (rather than making `with_ledger` itself
/// generic over it) so that an embedding kernel, which fixes `N_NEST` to a
/// single compile-time constant for its whole build, only ever has to
/// implement this for the one capacity it actually uses — it never needs to
/// answer for an `N_NEST` it didn't configure.
pub trait Scheduler<const N_NEST: usize>: SchedulerCore {
    /// Run `f` with exclusive access to `task`'s boost ledger.
    ///
    /// Never returns a reference into the task; the ledger is reachable only
    /// for the duration of this one closure call, mirroring how `HolderView`
    /// implementations never outlive a single `PiSemaphore` method (see
    /// `DESIGN.md`).
    fn with_ledger<R>(
        &mut self,
        task: Self::TaskRef,
        f: impl FnOnce(&mut BoostLedger<Self, N_NEST>) -> R,
    ) -> R
    where
        Self: Sized;
}
