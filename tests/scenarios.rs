//! Integration tests covering the six concrete scenarios in
//! `SPEC_FULL.md` §8, plus the supporting error-handling paths from §7.

mod support;

use r3_pi_sem::{EmbeddedHolders, FreelistHead, HolderPool, PiSemaphore, SemFlags};
use support::MockSched;

/// Scenario 1: direct inheritance.
#[test]
fn direct_inheritance() {
    support::init();
    let mut sched = MockSched::<0>::new();
    let l = sched.add_task(10);
    let h = sched.add_task(30);

    let mut sem = PiSemaphore::<MockSched<0>, EmbeddedHolders<MockSched<0>>, 0>::new();

    sched.set_current(l);
    sem.add_holder(&sched);
    assert_eq!(sched.sched_priority(l), 10);

    sched.set_current(h);
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l), 30);

    sched.set_current(l);
    sem.release_holder(&sched);
    sem.restore_baseprio(&mut sched, Some(h));

    assert_eq!(sched.sched_priority(l), 10);
    assert_eq!(sched.sched_priority(h), 30);
}

/// Scenario 2: chained inheritance, simple mode. Restoring `s` drops `l`
/// straight to its base priority, ignoring that `m` (momentarily) also owes
/// its own boost to `h` via an unrelated semaphore `t` — the accepted
/// simple-mode degradation.
#[test]
fn chained_inheritance_simple_mode_drops_directly_to_base() {
    support::init();
    let mut sched = MockSched::<0>::new();
    let l = sched.add_task(10);
    let m = sched.add_task(20);
    let h = sched.add_task(30);

    let mut sem_s = PiSemaphore::<MockSched<0>, EmbeddedHolders<MockSched<0>>, 0>::new();
    let mut sem_t = PiSemaphore::<MockSched<0>, EmbeddedHolders<MockSched<0>>, 0>::new();

    sched.set_current(l);
    sem_s.add_holder(&sched);

    sched.set_current(m);
    sem_s.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l), 20);

    sched.set_current(m);
    sem_t.add_holder(&sched);

    sched.set_current(h);
    sem_t.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(m), 30);

    // L posts s; M becomes s's holder. Simple-mode restore drops L directly
    // to base, with no awareness of the t-chain.
    sched.set_current(l);
    sem_s.release_holder(&sched);
    sem_s.restore_baseprio(&mut sched, Some(m));
    assert_eq!(sched.sched_priority(l), 10);
}

/// Scenario 3: nested mode clears the holder's ledger entry for a semaphore
/// once its count on that semaphore reaches zero, restoring it to base only
/// after the post (not merely because some waiter was satisfied).
#[test]
fn nested_mode_clears_ledger_entry_on_zero_count() {
    support::init();
    let mut sched = MockSched::<4>::new();
    let l = sched.add_task(10);
    let m = sched.add_task(20);

    let mut sem = PiSemaphore::<MockSched<4>, EmbeddedHolders<MockSched<4>>, 4>::new();

    sched.set_current(l);
    sem.add_holder(&sched);

    sched.set_current(m);
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l), 20);
    assert_eq!(sched.ledger_len(l), 1);

    sched.set_current(l);
    sem.release_holder(&sched);
    sem.restore_baseprio(&mut sched, Some(m));

    assert_eq!(sched.sched_priority(l), 10);
    assert_eq!(sched.ledger_len(l), 0);
}

/// Scenario 4: multiple waiters in nested mode. Each post strips only the
/// single highest-priority ledger entry for that semaphore, until the
/// holder's count on it reaches zero, at which point every remaining entry
/// for that semaphore is stripped at once.
#[test]
fn multiple_waiters_nested_mode_strips_highest_first() {
    support::init();
    let mut sched = MockSched::<4>::new();
    let l = sched.add_task(10);
    let m = sched.add_task(20);
    let h = sched.add_task(30);

    let mut sem = PiSemaphore::<MockSched<4>, EmbeddedHolders<MockSched<4>>, 4>::new();

    sched.set_current(l);
    sem.add_holder(&sched);
    sem.add_holder(&sched); // L holds 2 counts.

    sched.set_current(m);
    sem.boost_priority(&mut sched);
    sched.set_current(h);
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l), 30);
    assert_eq!(sched.ledger_len(l), 2);

    // L posts once, H wakes: the (s, 30) entry is the one stripped.
    sched.set_current(l);
    sem.release_holder(&sched);
    sem.restore_baseprio(&mut sched, Some(h));
    assert_eq!(sched.sched_priority(l), 20);
    assert_eq!(sched.ledger_len(l), 1);

    // L posts again, M wakes: L no longer holds any count on s, so every
    // remaining entry for s is stripped.
    sched.set_current(l);
    sem.release_holder(&sched);
    sem.restore_baseprio(&mut sched, Some(m));
    assert_eq!(sched.sched_priority(l), 10);
    assert_eq!(sched.ledger_len(l), 0);
}

/// Scenario 5: cancellation is equivalent to restoring on behalf of a waiter
/// that vanished without ever receiving a count.
#[test]
fn cancellation_restores_holder_simple_mode() {
    support::init();
    let mut sched = MockSched::<0>::new();
    let l = sched.add_task(10);
    let h = sched.add_task(30);

    let mut sem = PiSemaphore::<MockSched<0>, EmbeddedHolders<MockSched<0>>, 0>::new();

    sched.set_current(l);
    sem.add_holder(&sched);

    sched.set_current(h);
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l), 30);

    sem.canceled(&mut sched, h);
    assert_eq!(sched.sched_priority(l), 10);
}

#[test]
fn cancellation_restores_holder_nested_mode() {
    support::init();
    let mut sched = MockSched::<4>::new();
    let l = sched.add_task(10);
    let h = sched.add_task(30);

    let mut sem = PiSemaphore::<MockSched<4>, EmbeddedHolders<MockSched<4>>, 4>::new();

    sched.set_current(l);
    sem.add_holder(&sched);

    sched.set_current(h);
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l), 30);
    assert_eq!(sched.ledger_len(l), 1);

    sem.canceled(&mut sched, h);
    assert_eq!(sched.sched_priority(l), 10);
    assert_eq!(sched.ledger_len(l), 0);
}

/// Scenario 6: pool exhaustion in embedded mode. A third distinct holder
/// finds both slots occupied, is silently skipped, and is therefore never
/// boosted on behalf of a later waiter; releasing it afterwards attempts no
/// restoration.
#[test]
fn pool_exhaustion_embedded_mode_skips_third_holder() {
    support::init();
    let mut sched = MockSched::<0>::new();
    let t1 = sched.add_task(10);
    let t2 = sched.add_task(11);
    let t3 = sched.add_task(12);
    let waiter = sched.add_task(30);

    let mut sem = PiSemaphore::<MockSched<0>, EmbeddedHolders<MockSched<0>>, 0>::new();

    sem.add_holder_for(t1);
    sem.add_holder_for(t2);
    sem.add_holder_for(t3); // Both slots taken: silently dropped.

    sched.set_current(waiter);
    sem.boost_priority(&mut sched);

    assert_eq!(sched.sched_priority(t1), 30);
    assert_eq!(sched.sched_priority(t2), 30);
    assert_eq!(sched.sched_priority(t3), 12); // never tracked, never boosted

    sched.set_current(t3);
    sem.release_holder(&sched);
    sem.restore_baseprio(&mut sched, None);
    assert_eq!(sched.sched_priority(t3), 12);
}

/// `inherit-disabled` suppresses the entire bookkeeping path.
#[test]
fn inherit_disabled_flag_suppresses_boosting() {
    support::init();
    let mut sched = MockSched::<0>::new();
    let l = sched.add_task(10);
    let h = sched.add_task(30);

    let mut sem =
        PiSemaphore::<MockSched<0>, EmbeddedHolders<MockSched<0>>, 0>::with_flags(SemFlags::INHERIT_DISABLED);

    sched.set_current(l);
    sem.add_holder(&sched);

    sched.set_current(h);
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l), 10);
}

/// Stale-holder handling: a holder that has died is freed and skipped
/// rather than dereferenced, and the freed slot is available afterwards.
#[test]
fn stale_holder_is_freed_and_skipped_on_boost() {
    support::init();
    let mut sched = MockSched::<0>::new();
    let l = sched.add_task(10);
    let h = sched.add_task(30);

    let mut sem = PiSemaphore::<MockSched<0>, EmbeddedHolders<MockSched<0>>, 0>::new();
    sched.set_current(l);
    sem.add_holder(&sched);
    sched.kill(l);

    sched.set_current(h);
    sem.boost_priority(&mut sched); // must not panic; frees l's stale record

    let m = sched.add_task(5);
    sem.add_holder_for(m); // l's slot is free again
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(m), 30);
}

/// Ledger overflow: a dropped boost leaves the holder's priority exactly
/// where it was, never raised by the waiter that didn't fit.
#[test]
fn ledger_full_drops_new_boost_without_raising_priority() {
    support::init();
    let mut sched = MockSched::<1>::new();
    let l = sched.add_task(10);
    let w1 = sched.add_task(20);
    let w2 = sched.add_task(25);

    let mut sem = PiSemaphore::<MockSched<1>, EmbeddedHolders<MockSched<1>>, 1>::new();
    sched.set_current(l);
    sem.add_holder(&sched);

    sched.set_current(w1);
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l), 20);

    sched.set_current(w2);
    sem.boost_priority(&mut sched); // ledger at capacity 1: dropped
    assert_eq!(sched.sched_priority(l), 20);
    assert_eq!(sched.ledger_len(l), 1);
}

/// Freelist-mode direct inheritance, plus `destroy` releasing every holder
/// record without touching any task's priority.
#[test]
fn freelist_mode_direct_inheritance_and_destroy() {
    support::init();
    let mut sched = MockSched::<0>::new();
    let l = sched.add_task(10);
    let h = sched.add_task(30);

    let mut pool = HolderPool::<MockSched<0>, 4>::new();
    let mut sem = PiSemaphore::<MockSched<0>, FreelistHead, 0>::new();

    sched.set_current(l);
    sem.add_holder(&sched, &mut pool);

    sched.set_current(h);
    sem.boost_priority(&mut sched, &mut pool);
    assert_eq!(sched.sched_priority(l), 30);

    sched.set_current(l);
    sem.release_holder(&sched, &mut pool);
    sem.restore_baseprio(&mut sched, &mut pool, Some(h));
    assert_eq!(sched.sched_priority(l), 10);

    sem.destroy(&mut pool);
    assert_eq!(sched.sched_priority(l), 10); // destroy never touches priorities
}

/// Interrupt-context restore: the poster is not itself a participant, so
/// every holder is restored on behalf of the departed waiter in one pass.
#[test]
fn interrupt_context_restore_treats_every_holder_equally() {
    support::init();
    let mut sched = MockSched::<0>::new();
    let l1 = sched.add_task(10);
    let l2 = sched.add_task(15);
    let h = sched.add_task(30);

    let mut sem = PiSemaphore::<MockSched<0>, EmbeddedHolders<MockSched<0>>, 0>::new();

    sched.set_current(l1);
    sem.add_holder(&sched);
    sched.set_current(l2);
    sem.add_holder(&sched);

    sched.set_current(h);
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l1), 30);
    assert_eq!(sched.sched_priority(l2), 30);

    sched.interrupt = true;
    sem.restore_baseprio(&mut sched, Some(h));
    assert_eq!(sched.sched_priority(l1), 10);
    assert_eq!(sched.sched_priority(l2), 15);
}

/// Load-bearing two-pass ordering (§5): in task context, `restore_baseprio`
/// must settle every other holder before touching the poster's own priority
/// — restoring the poster mid-iteration could make it preemptible. Verified
/// via `MockSched`'s call log, not just final state, since final state alone
/// can't distinguish call order.
#[test]
fn task_context_restore_settles_other_holders_before_poster() {
    support::init();
    let mut sched = MockSched::<0>::new();
    let l1 = sched.add_task(10);
    let l2 = sched.add_task(15);
    let h = sched.add_task(30);

    let mut sem = PiSemaphore::<MockSched<0>, EmbeddedHolders<MockSched<0>>, 0>::new();

    sched.set_current(l1);
    sem.add_holder(&sched);
    sched.set_current(l2);
    sem.add_holder(&sched);

    sched.set_current(h);
    sem.boost_priority(&mut sched);
    assert_eq!(sched.sched_priority(l1), 30);
    assert_eq!(sched.sched_priority(l2), 30);

    // Task context: l1 is both the poster (rtcb) and one of the two holders.
    sched.set_current(l1);
    sem.release_holder(&sched);
    let before = sched.call_log().len();
    sem.restore_baseprio(&mut sched, Some(h));

    let restore_calls = &sched.call_log()[before..];
    let l2_pos = restore_calls
        .iter()
        .position(|&(t, _)| t == l2)
        .expect("l2 must be restored");
    let l1_pos = restore_calls
        .iter()
        .position(|&(t, _)| t == l1)
        .expect("l1 (the poster) must be restored");
    assert!(
        l2_pos < l1_pos,
        "poster's own priority must never be restored before every other holder's"
    );

    assert_eq!(sched.sched_priority(l1), 10);
    assert_eq!(sched.sched_priority(l2), 10);
}
