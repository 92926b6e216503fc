//! Entry Points (component E): the lifecycle hooks the semaphore layer
//! invokes on `PiSemaphore`, dispatching into `engine`.
//!
//! All of these except [`HolderPool::new`][crate::holder::HolderPool::new]
//! and [`PiSemaphore::destroy`] assume preemption is already inhibited by
//! the caller (interrupts disabled, or the scheduler's own critical-section
//! token held) — see `DESIGN.md` §5.

use core::marker::PhantomData;

use crate::{
    engine,
    flags::SemFlags,
    holder::{EmbeddedHolders, EmbeddedView, FreelistHead, FreelistView, HolderPool, HolderView},
    sched::{Scheduler, SchedulerCore, SemId},
};

/// Priority-inheritance state for one counting semaphore.
///
/// `Storage` is fixed at the embedding kernel's configuration boundary to
/// either [`FreelistHead`] (an index into a shared, externally owned
/// [`HolderPool`]) or [`EmbeddedHolders<S>`] (an inline two-slot array, no
/// shared pool). `N_NEST == 0` selects simple-mode inheritance (a single
/// unconditional boost/restore); `N_NEST > 0` selects nested-mode
/// inheritance via a per-task [`crate::ledger::BoostLedger`] of that
/// capacity.
pub struct PiSemaphore<S: SchedulerCore, Storage, const N_NEST: usize = 0> {
    storage: Storage,
    flags: SemFlags,
    _marker: PhantomData<fn() -> S>,
}

// --- Embedded-mode entry points ---------------------------------------------

impl<S: Scheduler<N_NEST>, const N_NEST: usize> PiSemaphore<S, EmbeddedHolders<S>, N_NEST> {
    pub fn new() -> Self {
        Self {
            storage: EmbeddedHolders::default(),
            flags: SemFlags::empty(),
            _marker: PhantomData,
        }
    }

    pub fn with_flags(flags: SemFlags) -> Self {
        Self {
            storage: EmbeddedHolders::default(),
            flags,
            _marker: PhantomData,
        }
    }

    fn sem_id(&self) -> SemId {
        SemId::of(self)
    }

    /// Free all holder records back to (implicitly, since they're inline)
    /// nowhere — just clear the two slots. Never adjusts any task's
    /// priority: the semaphore is assumed dead.
    pub fn destroy(&mut self) {
        #[cfg(debug_assertions)]
        {
            let live = self.storage.slots_for_debug().iter().filter(|s| s.holder.is_some()).count();
            debug_assert!(
                live <= 1,
                "r3_pi_sem: destroy called with {live} live holders in embedded mode"
            );
        }
        self.storage = EmbeddedHolders::default();
    }

    pub fn add_holder(&mut self, sched: &S) {
        let task = sched.current_task();
        self.add_holder_for(task);
    }

    pub fn add_holder_for(&mut self, task: S::TaskRef) {
        if self.flags.contains(SemFlags::INHERIT_DISABLED) {
            return;
        }
        let mut view = EmbeddedView::new(&mut self.storage);
        engine::add_holder(&mut view, task);
    }

    pub fn boost_priority(&mut self, sched: &mut S) {
        if self.flags.contains(SemFlags::INHERIT_DISABLED) {
            return;
        }
        let waiter = sched.current_task();
        let sem_id = self.sem_id();
        let mut view = EmbeddedView::new(&mut self.storage);
        engine::boost_priority::<S, _, N_NEST>(&mut view, sched, waiter, sem_id);
    }

    pub fn release_holder(&mut self, sched: &S) {
        let task = sched.current_task();
        let mut view = EmbeddedView::new(&mut self.storage);
        engine::release_holder(&mut view, task);
    }

    pub fn restore_baseprio(&mut self, sched: &mut S, stcb: Option<S::TaskRef>) {
        if self.flags.contains(SemFlags::INHERIT_DISABLED) {
            return;
        }
        let sem_id = self.sem_id();
        let mut view = EmbeddedView::new(&mut self.storage);
        engine::restore_baseprio::<S, _, N_NEST>(&mut view, sched, stcb, sem_id);
    }

    pub fn canceled(&mut self, sched: &mut S, stcb: S::TaskRef) {
        if self.flags.contains(SemFlags::INHERIT_DISABLED) {
            return;
        }
        let sem_id = self.sem_id();
        let mut view = EmbeddedView::new(&mut self.storage);
        engine::canceled::<S, _, N_NEST>(&mut view, sched, stcb, sem_id);
    }
}

impl<S: Scheduler<N_NEST>, const N_NEST: usize> Default for PiSemaphore<S, EmbeddedHolders<S>, N_NEST> {
    fn default() -> Self {
        Self::new()
    }
}

/// Diagnostic one-line-per-holder dump (§6), informational only. Embedded
/// mode is self-contained (no pool reference needed), so this is a plain
/// `Debug` impl; the freelist-mode equivalent is `PiSemaphore::dump` (see
/// below), since resolving its handles needs the pool threaded in.
#[cfg(feature = "dump")]
impl<S: SchedulerCore, const N_NEST: usize> core::fmt::Debug for PiSemaphore<S, EmbeddedHolders<S>, N_NEST>
where
    S::TaskRef: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "PiSemaphore {{")?;
        for (i, slot) in self.storage.slots_for_debug().iter().enumerate() {
            crate::debug::dump_line::<S>(f, i as u32, slot.holder, slot.counts)?;
        }
        write!(f, "}}")
    }
}

// --- Freelist-mode entry points ---------------------------------------------

impl<S: Scheduler<N_NEST>, const N_NEST: usize> PiSemaphore<S, FreelistHead, N_NEST> {
    pub fn new() -> Self {
        Self {
            storage: FreelistHead::default(),
            flags: SemFlags::empty(),
            _marker: PhantomData,
        }
    }

    pub fn with_flags(flags: SemFlags) -> Self {
        Self {
            storage: FreelistHead::default(),
            flags,
            _marker: PhantomData,
        }
    }

    fn sem_id(&self) -> SemId {
        SemId::of(self)
    }

    /// Free every holder record belonging to this semaphore back to `pool`.
    /// Never adjusts any task's priority: the semaphore is assumed dead.
    pub fn destroy<const CAP: usize>(&mut self, pool: &mut HolderPool<S, CAP>) {
        let mut view = FreelistView::new(&mut self.storage, pool);
        for h in view.handles() {
            view.free(h);
        }
    }

    /// Diagnostic one-line-per-holder dump (§6), informational only. Unlike
    /// embedded mode's `Debug` impl, freelist-mode storage is just a list
    /// head — resolving it into records needs `pool` threaded in, which
    /// `core::fmt::Debug` has no way to accept, so this is a plain method
    /// rather than a trait impl.
    #[cfg(feature = "dump")]
    pub fn dump<const CAP: usize>(
        &mut self,
        f: &mut core::fmt::Formatter<'_>,
        pool: &mut HolderPool<S, CAP>,
    ) -> core::fmt::Result
    where
        S::TaskRef: core::fmt::Debug,
    {
        writeln!(f, "PiSemaphore {{")?;
        let view = FreelistView::new(&mut self.storage, pool);
        crate::debug::dump_holders(&view, f)?;
        write!(f, "}}")
    }

    pub fn add_holder<const CAP: usize>(&mut self, sched: &S, pool: &mut HolderPool<S, CAP>) {
        let task = sched.current_task();
        self.add_holder_for(task, pool);
    }

    pub fn add_holder_for<const CAP: usize>(
        &mut self,
        task: S::TaskRef,
        pool: &mut HolderPool<S, CAP>,
    ) {
        if self.flags.contains(SemFlags::INHERIT_DISABLED) {
            return;
        }
        let mut view = FreelistView::new(&mut self.storage, pool);
        engine::add_holder(&mut view, task);
    }

    pub fn boost_priority<const CAP: usize>(&mut self, sched: &mut S, pool: &mut HolderPool<S, CAP>) {
        if self.flags.contains(SemFlags::INHERIT_DISABLED) {
            return;
        }
        let waiter = sched.current_task();
        let sem_id = self.sem_id();
        let mut view = FreelistView::new(&mut self.storage, pool);
        engine::boost_priority::<S, _, N_NEST>(&mut view, sched, waiter, sem_id);
    }

    pub fn release_holder<const CAP: usize>(&mut self, sched: &S, pool: &mut HolderPool<S, CAP>) {
        let task = sched.current_task();
        let mut view = FreelistView::new(&mut self.storage, pool);
        engine::release_holder(&mut view, task);
    }

    pub fn restore_baseprio<const CAP: usize>(
        &mut self,
        sched: &mut S,
        pool: &mut HolderPool<S, CAP>,
        stcb: Option<S::TaskRef>,
    ) {
        if self.flags.contains(SemFlags::INHERIT_DISABLED) {
            return;
        }
        let sem_id = self.sem_id();
        let mut view = FreelistView::new(&mut self.storage, pool);
        engine::restore_baseprio::<S, _, N_NEST>(&mut view, sched, stcb, sem_id);
    }

    pub fn canceled<const CAP: usize>(
        &mut self,
        sched: &mut S,
        pool: &mut HolderPool<S, CAP>,
        stcb: S::TaskRef,
    ) {
        if self.flags.contains(SemFlags::INHERIT_DISABLED) {
            return;
        }
        let sem_id = self.sem_id();
        let mut view = FreelistView::new(&mut self.storage, pool);
        engine::canceled::<S, _, N_NEST>(&mut view, sched, stcb, sem_id);
    }
}

impl<S: Scheduler<N_NEST>, const N_NEST: usize> Default for PiSemaphore<S, FreelistHead, N_NEST> {
    fn default() -> Self {
        Self::new()
    }
}
