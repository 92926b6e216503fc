//! Priority-inheritance (PI) bookkeeping for a real-time kernel's counting
//! semaphore.
//!
//! This crate implements *only* the bookkeeping that prevents unbounded
//! priority inversion: the wait/post arithmetic of the semaphore itself, the
//! scheduler's run queues, and the rest of the task control block are
//! external collaborators, reached exclusively through the [`sched::Scheduler`]
//! trait. See `DESIGN.md` for how each piece here is grounded in the
//! surrounding kernel's own mutex/semaphore modules.
//!
//! The two storage strategies for holder records — a process-wide freelist
//! ([`holder::HolderPool`]) or two slots embedded in each semaphore
//! ([`holder::EmbeddedHolders`]) — and the two inheritance strategies — a
//! single unconditional boost/restore (`N_NEST == 0`) or a per-task
//! [`ledger::BoostLedger`] of `N_NEST` outstanding boosts — are all compile-time,
//! type-level choices (const generics), never runtime branches.
#![cfg_attr(not(test), no_std)]

pub mod debug;
pub mod engine;
pub mod flags;
pub mod holder;
pub mod ledger;
pub mod sched;
pub mod semaphore;

pub use flags::SemFlags;
pub use holder::{EmbeddedHolders, FreelistHead, HolderPool, HolderSlot};
pub use ledger::{BoostEntry, BoostLedger};
pub use sched::{Scheduler, SchedulerCore, SemId};
pub use semaphore::PiSemaphore;
