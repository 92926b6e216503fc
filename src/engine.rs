//! Inheritance Engine (component D): applies boosts on acquire/wait and
//! computes restorations on release/cancel.
//!
//! Every function here takes a [`HolderView`] freshly constructed by the
//! caller (`semaphore::PiSemaphore`'s methods) for the duration of one call,
//! plus a `&mut S: Scheduler`. Nothing here stores a reference past its own
//! return.

use crate::{
    holder::HolderView,
    ledger::BoostLedger,
    sched::{Scheduler, SchedulerCore, SemId},
};

/// `add_holder`: called after a task successfully acquires a count. Finds or
/// creates the holder record and increments its count. The acquirer's own
/// effective priority is never raised by its own acquire.
///
/// No-op (beyond the view lookup) if pool/slot allocation fails — the caller
/// has already logged the degradation inside `HolderView::find_or_alloc`.
pub fn add_holder<S: SchedulerCore, V: HolderView<S>>(view: &mut V, task: S::TaskRef) {
    if let Some(h) = view.find_or_alloc(task) {
        view.slot_mut(h).counts += 1;
    }
}

/// `boost_priority`: called before `waiter` blocks on `sem_id`. Applies the
/// boost rule to every live holder of the semaphore.
pub fn boost_priority<S: Scheduler<N_NEST>, V: HolderView<S>, const N_NEST: usize>(
    view: &mut V,
    sched: &mut S,
    waiter: S::TaskRef,
    sem_id: SemId,
) {
    let waiter_priority = sched.sched_priority(waiter);

    for h in view.handles() {
        let Some(htcb) = view.slot(h).holder else {
            continue;
        };
        if !sched.verify_tcb(htcb) {
            // Stale-holder handling: free the stranded record and skip it.
            log::warn!("r3_pi_sem: stale holder detected during boost_priority, freeing record");
            view.free(h);
            continue;
        }

        if N_NEST == 0 {
            // Simple mode: compare against the holder's *current* effective
            // priority, so repeated boosts compose monotonically.
            if waiter_priority > sched.sched_priority(htcb) {
                #[cfg(feature = "trace")]
                log::trace!("r3_pi_sem: boost (simple) holder to waiter priority");
                sched.set_priority(htcb, waiter_priority);
            }
        } else {
            // Nested mode: compare against base_priority (not sched_priority)
            // so the dependency is recorded even when some other boost
            // already raised the holder past the waiter's own priority.
            if waiter_priority > sched.base_priority(htcb) {
                let pushed = sched.with_ledger::<bool>(htcb, |ledger: &mut BoostLedger<S, N_NEST>| {
                    ledger.try_push(sem_id, waiter_priority)
                });
                if !pushed {
                    log::error!("r3_pi_sem: boost ledger full, dropping boost entry");
                    continue;
                }
                #[cfg(feature = "trace")]
                log::trace!("r3_pi_sem: boost (nested) pushed ledger entry");
                if waiter_priority > sched.sched_priority(htcb) {
                    sched.set_priority(htcb, waiter_priority);
                }
            }
        }
    }
}

/// `release_holder`: decrements `task`'s holder record's count. Never
/// removes the record — removal happens exclusively inside
/// `restore_baseprio`, which must observe `counts == 0` to trigger the
/// "strip all" ledger case.
pub fn release_holder<S: SchedulerCore, V: HolderView<S>>(view: &mut V, task: S::TaskRef) {
    if let Some(h) = view.find(task) {
        let slot = view.slot_mut(h);
        debug_assert!(slot.counts > 0, "release_holder on a record with zero counts");
        slot.counts = slot.counts.saturating_sub(1);
    }
}

/// Apply the restore rule to a single holder.
///
/// Simple mode: unconditional drop to `base_priority` if it differs from
/// `sched_priority`. Nested mode: strip the ledger entries named by `sem_id`
/// (all of them if the holder no longer holds any count here, else just the
/// highest-priority one) and recompute.
fn restore_one<S: Scheduler<N_NEST>, V: HolderView<S>, const N_NEST: usize>(
    view: &mut V,
    sched: &mut S,
    htcb: S::TaskRef,
    sem_id: SemId,
) {
    if N_NEST == 0 {
        let base = sched.base_priority(htcb);
        if sched.sched_priority(htcb) != base {
            #[cfg(feature = "trace")]
            log::trace!("r3_pi_sem: restore (simple) holder to base priority");
            sched.reprioritize(htcb, base);
        }
        return;
    }

    let still_holds = view
        .find(htcb)
        .map(|h| view.slot(h).counts > 0)
        .unwrap_or(false);

    let base = sched.base_priority(htcb);
    let new_priority = sched.with_ledger::<S::Priority>(htcb, |ledger| {
        if still_holds {
            ledger.strip_one_highest(sem_id);
        } else {
            ledger.strip_all(sem_id);
        }
        ledger.effective_priority(base)
    });

    if new_priority != sched.sched_priority(htcb) {
        #[cfg(feature = "trace")]
        log::trace!("r3_pi_sem: restore (nested) recomputed holder priority");
        sched.set_priority(htcb, new_priority);
    }
}

/// `restore_baseprio`: driven by the semaphore layer after a post completes.
/// `stcb` is the task that received the count, or `None` if no waiter
/// existed. Dispatches on `Scheduler::in_interrupt_context`.
pub fn restore_baseprio<S: Scheduler<N_NEST>, V: HolderView<S>, const N_NEST: usize>(
    view: &mut V,
    sched: &mut S,
    stcb: Option<S::TaskRef>,
    sem_id: SemId,
) {
    if sched.in_interrupt_context() {
        // Poster is not a participant.
        if stcb.is_some() {
            // Apply the restore rule to every holder on behalf of the
            // now-departed waiter `stcb`.
            for h in view.handles() {
                if let Some(htcb) = view.slot(h).holder {
                    restore_one::<S, V, N_NEST>(view, sched, htcb, sem_id);
                }
            }
        }
        // No waiter existed: nothing to restore (the poster isn't a holder
        // here, so there's no record of its own to reclaim either).
        #[cfg(feature = "verify_holder")]
        crate::debug::verify_holder::<S, V, N_NEST>(view, sched, sem_id);
        return;
    }

    // Task context: the poster is itself a holder. Two-pass ordering is
    // mandatory (see DESIGN.md / SPEC_FULL §5): restoring the poster mid-
    // iteration could make it preemptible, so every other holder must be
    // settled first.
    let rtcb = sched.current_task();

    if stcb.is_some() {
        // Pass 1: every holder other than `rtcb`.
        for h in view.handles() {
            if let Some(htcb) = view.slot(h).holder {
                if htcb != rtcb {
                    restore_one::<S, V, N_NEST>(view, sched, htcb, sem_id);
                }
            }
        }

        // Embedded mode only: reclaim `rtcb`'s own slot between passes if its
        // count has already reached zero, to free a slot before the
        // preemption window pass 2 may open (see `HolderView::EARLY_RECLAIM`).
        if V::EARLY_RECLAIM {
            view.find_and_free_if_zero(rtcb);
        }

        // Pass 2: the poster alone.
        restore_one::<S, V, N_NEST>(view, sched, rtcb, sem_id);
    }

    // After both passes (or when `stcb` is empty), `rtcb`'s own record is
    // reclaimed if its count has reached zero — the poster just released a
    // count on this semaphore whether or not anyone was waiting for it.
    view.find_and_free_if_zero(rtcb);

    #[cfg(feature = "verify_holder")]
    crate::debug::verify_holder::<S, V, N_NEST>(view, sched, sem_id);
}

/// `canceled`: a waiter's wait was aborted (e.g. by signal) before it ever
/// received a count. Semantically equivalent to `restore_baseprio` with that
/// waiter as `stcb`, applied to every holder regardless of context, since the
/// poster (if any) is not involved in a cancellation.
pub fn canceled<S: Scheduler<N_NEST>, V: HolderView<S>, const N_NEST: usize>(
    view: &mut V,
    sched: &mut S,
    stcb: S::TaskRef,
    sem_id: SemId,
) {
    let _ = stcb; // the departed waiter's identity carries no further data the restore rule needs
    for h in view.handles() {
        if let Some(htcb) = view.slot(h).holder {
            restore_one::<S, V, N_NEST>(view, sched, htcb, sem_id);
        }
    }
}
