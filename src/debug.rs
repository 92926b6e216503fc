//! Debug-only invariant checking and diagnostic dump format.
//!
//! Both are off by default (Cargo features `verify_holder` and `dump`
//! respectively) so they never surface as a surprise to an integrator — see
//! the Open Question writeup in `DESIGN.md`.

#[cfg(feature = "verify_holder")]
use crate::{
    holder::HolderView,
    sched::{Scheduler, SemId},
};

/// Debug assertion: when no waiters remain, every holder must satisfy
/// `sched_priority == base_priority` *and* carry zero ledger entries naming
/// `sem_id`.
///
/// The original source carried this check commented out with a note that
/// "these assumptions seem to be untrue — OR there is a bug." It's kept
/// here, gated behind the `verify_holder` feature (off by default) so
/// integrators can opt into exercising it during bring-up without it
/// becoming a surprise test failure for everyone else (§9 Open Question).
#[cfg(feature = "verify_holder")]
pub fn verify_holder<S: Scheduler<N_NEST>, V: HolderView<S>, const N_NEST: usize>(
    view: &V,
    sched: &mut S,
    sem_id: SemId,
) {
    for h in view.handles() {
        let slot = view.slot(h);
        if let Some(htcb) = slot.holder {
            if slot.counts == 0 {
                debug_assert_eq!(
                    sched.sched_priority(htcb),
                    sched.base_priority(htcb),
                    "r3_pi_sem: verify_holder: holder with zero counts is not at base priority"
                );
                debug_assert!(
                    sched.with_ledger::<bool>(htcb, |ledger| ledger.has_none_for(sem_id)),
                    "r3_pi_sem: verify_holder: holder with zero counts still has a ledger entry for this semaphore"
                );
            }
        }
    }
}

/// Diagnostic one-line-per-holder dump, for use in a `Debug` impl or a
/// logging statement. Informational only; not part of any invariant.
#[cfg(feature = "dump")]
pub fn dump_line<S: crate::sched::SchedulerCore>(
    f: &mut core::fmt::Formatter<'_>,
    handle_index: u32,
    holder: Option<S::TaskRef>,
    counts: u32,
) -> core::fmt::Result
where
    S::TaskRef: core::fmt::Debug,
{
    writeln!(f, "  ({handle_index}, holder={holder:?}, counts={counts})")
}

/// Render every currently-occupied holder handle of `view` via [`dump_line`],
/// one line each. Shared by `PiSemaphore`'s `Debug` impl (embedded mode) and
/// `PiSemaphore::dump` (freelist mode, which additionally needs the pool
/// threaded in to resolve handles into records).
#[cfg(feature = "dump")]
pub fn dump_holders<S: crate::sched::SchedulerCore, V: crate::holder::HolderView<S>>(
    view: &V,
    f: &mut core::fmt::Formatter<'_>,
) -> core::fmt::Result
where
    S::TaskRef: core::fmt::Debug,
{
    for h in view.handles() {
        let slot = view.slot(h);
        dump_line::<S>(f, h.index(), slot.holder, slot.counts)?;
    }
    Ok(())
}
