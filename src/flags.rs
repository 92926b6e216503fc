//! Per-semaphore configuration flags.

bitflags::bitflags! {
    /// Per-semaphore configuration bits. Empty (all bits clear) by default.
    pub struct SemFlags: u8 {
        /// Suppress all PI bookkeeping for this semaphore: `add_holder`
        /// becomes a no-op, `boost_priority`/`restore_baseprio`/`canceled`
        /// never touch any task's priority, and the holder list stays empty
        /// (invariant 4 in `DESIGN.md`).
        const INHERIT_DISABLED = 1 << 0;
    }
}
