//! Holder Pool (component A) and Holder Table (component B).
//!
//! Two storage strategies, selected by which `Storage` type a [`PiSemaphore`]
//! is instantiated with — a compile-time, type-level choice, never a runtime
//! branch:
//!
//!  - [`FreelistHead`]: the semaphore stores only the head of its own
//!    holder list; the records themselves live in a process-wide
//!    [`HolderPool`] threaded in by `&mut` reference to every call that
//!    needs one.
//!  - [`EmbeddedHolders`]: the semaphore owns exactly two holder slots
//!    inline, no pool parameter needed anywhere.
//!
//! [`PiSemaphore`]: crate::semaphore::PiSemaphore

use arrayvec::ArrayVec;

use crate::sched::SchedulerCore;

/// The maximum number of distinct tasks that may simultaneously hold counts
/// on a single semaphore.
///
/// Embedded-mode storage enforces this structurally (exactly two slots).
/// Freelist-mode storage is otherwise unbounded per semaphore (bounded only
/// by the process-wide pool), so [`HolderPool`] logs and truncates a
/// semaphore's holder-list snapshot beyond this — a bounded, best-effort
/// degradation in the same spirit as ledger overflow (`DESIGN.md`).
pub const MAX_HOLDERS_PER_SEM: usize = 8;

/// An opaque handle identifying one holder record for the duration of a
/// single entry-point call. In embedded mode it's a slot position (0 or 1);
/// in freelist mode it's a pool index. Never stored beyond one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolderHandle(u32);

impl HolderHandle {
    /// The raw index this handle refers to (a pool index in freelist mode, a
    /// slot position in embedded mode). Exposed only for the `dump` feature's
    /// diagnostic formatter.
    #[cfg(feature = "dump")]
    pub(crate) fn index(&self) -> u32 {
        self.0
    }
}

/// One holder record: a task and the number of unmatched acquires it has
/// made on the semaphore this record belongs to.
///
/// `next` threads two unrelated lists depending on the record's current
/// state (never both): while the record sits on the global freelist
/// (`holder == None`), it links the next free record; once allocated and
/// attached to a semaphore (`holder == Some(_)`), it links the next holder
/// record *of that semaphore*. Embedded-mode storage never uses `next` (each
/// semaphore owns its two slots directly, no list threading needed).
pub struct HolderSlot<S: SchedulerCore> {
    pub holder: Option<S::TaskRef>,
    pub counts: u32,
    next: Option<u32>,
}

impl<S: SchedulerCore> HolderSlot<S> {
    const fn empty() -> Self {
        Self {
            holder: None,
            counts: 0,
            next: None,
        }
    }
}

impl<S: SchedulerCore> Clone for HolderSlot<S> {
    fn clone(&self) -> Self {
        Self {
            holder: self.holder,
            counts: self.counts,
            next: self.next,
        }
    }
}

#[cfg(feature = "dump")]
impl<S: SchedulerCore> core::fmt::Debug for HolderSlot<S>
where
    S::TaskRef: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HolderSlot")
            .field("holder", &self.holder)
            .field("counts", &self.counts)
            .field("next", &self.next)
            .finish()
    }
}

/// A process-wide freelist of `CAP` statically allocated [`HolderSlot`]
/// records, threaded via in-array index chaining (never raw pointers).
///
/// `alloc`/`free` are both O(1). No dynamic allocation: the backing array is
/// a plain `[HolderSlot<S>; CAP]`. Owned by the embedding kernel (e.g. behind
/// whatever cell type it already uses for its own globals) and threaded by
/// `&mut` reference into every freelist-mode entry point; this crate never
/// declares a `static` of its own.
pub struct HolderPool<S: SchedulerCore, const CAP: usize> {
    slots: [HolderSlot<S>; CAP],
    free_head: Option<u32>,
}

impl<S: SchedulerCore, const CAP: usize> HolderPool<S, CAP> {
    /// Populate the freelist: every slot starts free, chained `0 -> 1 -> ...
    /// -> CAP-1 -> None`. Call once at boot; there is no teardown API (the
    /// spec defines none — a global, init-only lifecycle).
    pub fn new() -> Self {
        let mut slots: [HolderSlot<S>; CAP] = core::array::from_fn(|_| HolderSlot::empty());
        for i in 0..CAP {
            slots[i].next = if i + 1 < CAP { Some((i + 1) as u32) } else { None };
        }
        Self {
            slots,
            free_head: if CAP > 0 { Some(0) } else { None },
        }
    }

    /// Pop a slot from the freelist. Logs an error and returns `None` if
    /// exhausted (§7 "Pool exhausted").
    pub fn alloc(&mut self) -> Option<u32> {
        match self.free_head {
            Some(idx) => {
                self.free_head = self.slots[idx as usize].next.take();
                self.slots[idx as usize].holder = None;
                self.slots[idx as usize].counts = 0;
                Some(idx)
            }
            None => {
                log::error!("r3_pi_sem: holder pool exhausted (capacity {CAP})");
                None
            }
        }
    }

    /// Push a slot back onto the freelist.
    pub fn free(&mut self, idx: u32) {
        let slot = &mut self.slots[idx as usize];
        slot.holder = None;
        slot.counts = 0;
        slot.next = self.free_head;
        self.free_head = Some(idx);
    }

    fn slot(&self, idx: u32) -> &HolderSlot<S> {
        &self.slots[idx as usize]
    }

    fn slot_mut(&mut self, idx: u32) -> &mut HolderSlot<S> {
        &mut self.slots[idx as usize]
    }
}

impl<S: SchedulerCore, const CAP: usize> Default for HolderPool<S, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-semaphore storage for freelist mode: just the head of this
/// semaphore's own holder list. The records themselves live in the
/// process-wide [`HolderPool`] threaded in alongside this at every call.
#[derive(Default)]
pub struct FreelistHead {
    head: Option<u32>,
}

/// Per-semaphore storage for embedded mode: exactly two holder slots inline,
/// no pool parameter needed by any entry point.
pub struct EmbeddedHolders<S: SchedulerCore> {
    slots: [HolderSlot<S>; 2],
}

impl<S: SchedulerCore> Default for EmbeddedHolders<S> {
    fn default() -> Self {
        Self {
            slots: [HolderSlot::empty(), HolderSlot::empty()],
        }
    }
}

impl<S: SchedulerCore> EmbeddedHolders<S> {
    /// Exposed for the `destroy` debug assertion (§7: "Destroy with live
    /// holders") and the `dump`-feature `Debug` impl on `PiSemaphore`.
    pub(crate) fn slots_for_debug(&self) -> &[HolderSlot<S>; 2] {
        &self.slots
    }
}

/// Abstracts over both storage strategies for the duration of one
/// entry-point call. Never stored: a fresh, borrow-scoped view is
/// constructed at the top of each `PiSemaphore` method and dropped before
/// the method returns (see the cyclic-reference design note in
/// `DESIGN.md`).
pub trait HolderView<S: SchedulerCore> {
    /// True for embedded-mode storage. `restore_baseprio`'s two-pass restore
    /// reclaims the poster's own zero-count slot between passes only when
    /// this is true — freelist-mode storage isn't slot-starved the way a
    /// fixed two-slot semaphore can be, so it waits until both passes are
    /// done (see `engine::restore_baseprio`).
    const EARLY_RECLAIM: bool = false;

    fn find(&self, task: S::TaskRef) -> Option<HolderHandle>;
    fn find_or_alloc(&mut self, task: S::TaskRef) -> Option<HolderHandle>;
    fn free(&mut self, h: HolderHandle);
    fn slot(&self, h: HolderHandle) -> &HolderSlot<S>;
    fn slot_mut(&mut self, h: HolderHandle) -> &mut HolderSlot<S>;

    /// Snapshot every currently-occupied handle up front, so callers
    /// (`engine::boost_priority`, `engine::restore_baseprio`) can freely
    /// `free` the handle they're currently visiting without invalidating
    /// the rest of the traversal. This is the Rust rendition of "the
    /// iterator captures the next link before invoking the handler."
    fn handles(&self) -> ArrayVec<HolderHandle, MAX_HOLDERS_PER_SEM>;

    /// `find` then, if `counts == 0`, `free`. Has no storage-specific
    /// behavior worth a dedicated trait method.
    fn find_and_free_if_zero(&mut self, task: S::TaskRef) {
        if let Some(h) = self.find(task) {
            if self.slot(h).counts == 0 {
                self.free(h);
            }
        }
    }
}

/// Borrow-scoped [`HolderView`] over freelist-mode storage: this
/// semaphore's own list head plus the shared pool.
pub struct FreelistView<'a, S: SchedulerCore, const CAP: usize> {
    head: &'a mut FreelistHead,
    pool: &'a mut HolderPool<S, CAP>,
}

impl<'a, S: SchedulerCore, const CAP: usize> FreelistView<'a, S, CAP> {
    pub fn new(head: &'a mut FreelistHead, pool: &'a mut HolderPool<S, CAP>) -> Self {
        Self { head, pool }
    }
}

impl<'a, S: SchedulerCore, const CAP: usize> HolderView<S> for FreelistView<'a, S, CAP> {
    fn find(&self, task: S::TaskRef) -> Option<HolderHandle> {
        let mut cur = self.head.head;
        while let Some(idx) = cur {
            let slot = self.pool.slot(idx);
            if slot.holder == Some(task) {
                return Some(HolderHandle(idx));
            }
            cur = slot.next;
        }
        None
    }

    fn find_or_alloc(&mut self, task: S::TaskRef) -> Option<HolderHandle> {
        if let Some(h) = self.find(task) {
            return Some(h);
        }
        let idx = self.pool.alloc()?;
        {
            let slot = self.pool.slot_mut(idx);
            slot.holder = Some(task);
            slot.counts = 0;
            slot.next = self.head.head;
        }
        self.head.head = Some(idx);
        Some(HolderHandle(idx))
    }

    fn free(&mut self, h: HolderHandle) {
        let idx = h.0;
        // Unlink from this semaphore's own list, walking by index (never a
        // stored reference) so the pool can be freely re-borrowed.
        if self.head.head == Some(idx) {
            self.head.head = self.pool.slot(idx).next;
        } else {
            let mut prev = self.head.head;
            while let Some(p) = prev {
                let next = self.pool.slot(p).next;
                if next == Some(idx) {
                    self.pool.slot_mut(p).next = self.pool.slot(idx).next;
                    break;
                }
                prev = next;
            }
        }
        self.pool.free(idx);
    }

    fn slot(&self, h: HolderHandle) -> &HolderSlot<S> {
        self.pool.slot(h.0)
    }

    fn slot_mut(&mut self, h: HolderHandle) -> &mut HolderSlot<S> {
        self.pool.slot_mut(h.0)
    }

    fn handles(&self) -> ArrayVec<HolderHandle, MAX_HOLDERS_PER_SEM> {
        let mut out = ArrayVec::new();
        let mut cur = self.head.head;
        while let Some(idx) = cur {
            if out.try_push(HolderHandle(idx)).is_err() {
                log::error!(
                    "r3_pi_sem: semaphore holder list exceeds snapshot capacity {MAX_HOLDERS_PER_SEM}, truncating"
                );
                break;
            }
            cur = self.pool.slot(idx).next;
        }
        out
    }
}

/// Borrow-scoped [`HolderView`] over embedded-mode storage.
pub struct EmbeddedView<'a, S: SchedulerCore> {
    storage: &'a mut EmbeddedHolders<S>,
}

impl<'a, S: SchedulerCore> EmbeddedView<'a, S> {
    pub fn new(storage: &'a mut EmbeddedHolders<S>) -> Self {
        Self { storage }
    }
}

impl<'a, S: SchedulerCore> HolderView<S> for EmbeddedView<'a, S> {
    const EARLY_RECLAIM: bool = true;

    fn find(&self, task: S::TaskRef) -> Option<HolderHandle> {
        self.storage
            .slots
            .iter()
            .position(|s| s.holder == Some(task))
            .map(|i| HolderHandle(i as u32))
    }

    fn find_or_alloc(&mut self, task: S::TaskRef) -> Option<HolderHandle> {
        if let Some(h) = self.find(task) {
            return Some(h);
        }
        self.storage
            .slots
            .iter()
            .position(|s| s.holder.is_none())
            .map(|i| {
                self.storage.slots[i].holder = Some(task);
                self.storage.slots[i].counts = 0;
                HolderHandle(i as u32)
            })
    }

    fn free(&mut self, h: HolderHandle) {
        let slot = &mut self.storage.slots[h.0 as usize];
        slot.holder = None;
        slot.counts = 0;
    }

    fn slot(&self, h: HolderHandle) -> &HolderSlot<S> {
        &self.storage.slots[h.0 as usize]
    }

    fn slot_mut(&mut self, h: HolderHandle) -> &mut HolderSlot<S> {
        &mut self.storage.slots[h.0 as usize]
    }

    fn handles(&self) -> ArrayVec<HolderHandle, MAX_HOLDERS_PER_SEM> {
        let mut out = ArrayVec::new();
        for (i, s) in self.storage.slots.iter().enumerate() {
            if s.holder.is_some() {
                // Can't overflow: exactly two embedded slots, well under
                // MAX_HOLDERS_PER_SEM.
                let _ = out.try_push(HolderHandle(i as u32));
            }
        }
        out
    }
}
