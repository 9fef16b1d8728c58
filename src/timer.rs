//! T200 scheduling.
//!
//! The original keeps one process-wide intrusive list of pending timers;
//! reimplemented here as an explicit [`Scheduler`] object passed into each
//! [`crate::channel::Channel`] instead of a hidden global (SPEC_FULL.md §9
//! "Global timer list"). Time itself is abstracted behind [`Clock`] so tests
//! can drive T200/N200 recovery deterministically without wall-clock sleeps
//! (SPEC_FULL.md §5d).

use heapless::Vec;

/// Monotonic time, in milliseconds, since an arbitrary epoch. Only
/// differences between two `Ticks` values are meaningful.
pub type Ticks = u64;

/// A source of monotonic time.
///
/// `T200Recovery` in `lapdm.c` reads the host's `gettimeofday`; this trait
/// is the seam that lets tests substitute [`crate::test_support::ManualClock`]
/// for it.
pub trait Clock {
    /// Current monotonic time.
    fn now(&self) -> Ticks;
}

/// Identifies which Datalink a pending T200 belongs to.
///
/// There is at most one T200 per Datalink, so `(entity, sapi)` is a unique
/// and sufficiently small key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    /// Index of the owning Entity within its Channel (0 or 1).
    pub entity: u8,
    /// SAPI of the owning Datalink.
    pub sapi: u8,
}

impl TimerId {
    /// Build a timer id for the given entity/SAPI pair.
    pub const fn new(entity: u8, sapi: u8) -> Self {
        TimerId { entity, sapi }
    }
}

/// Maximum number of timers live at once: 2 Entities × 2 SAPIs per Channel.
pub const MAX_TIMERS: usize = 4;

/// Explicit T200 scheduler, one per Channel.
///
/// Deliberately a flat `Vec` rather than a binary heap: `MAX_TIMERS` is tiny,
/// cancellation needs arbitrary removal (idempotent per SPEC_FULL.md §4.4
/// "Cancellation"), and a linear scan over 4 entries is simpler to get right
/// than heap-with-removal bookkeeping that will never be compiled against a
/// reference to check.
#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<(TimerId, Ticks), MAX_TIMERS>,
}

impl Scheduler {
    /// Build an empty scheduler.
    pub fn new() -> Self {
        Scheduler {
            pending: Vec::new(),
        }
    }

    /// Start (or restart) `id`'s timer to fire at `now + duration`.
    ///
    /// Starting an already-running timer replaces its deadline, matching
    /// "restart T200" actions in the state table (SPEC_FULL.md §4.1).
    pub fn start(&mut self, id: TimerId, now: Ticks, duration: Ticks) {
        self.cancel(id);
        // Capacity is sized to the maximum possible number of live Datalinks;
        // a full scheduler here would mean more timers than Datalinks exist.
        let _ = self.pending.push((id, now + duration));
    }

    /// Cancel `id`'s timer. A no-op if it was not running (idempotent).
    pub fn cancel(&mut self, id: TimerId) {
        if let Some(pos) = self.pending.iter().position(|(t, _)| *t == id) {
            self.pending.swap_remove(pos);
        }
    }

    /// Is `id`'s timer currently running?
    pub fn is_running(&self, id: TimerId) -> bool {
        self.pending.iter().any(|(t, _)| *t == id)
    }

    /// Pop every timer whose deadline is at or before `now`, firing
    /// earliest-deadline first. Calling this drives all due expirations;
    /// the caller re-enters the owning Datalink's state machine for each.
    pub fn expire_due(&mut self, now: Ticks) -> Vec<TimerId, MAX_TIMERS> {
        let mut due: Vec<(TimerId, Ticks), MAX_TIMERS> = Vec::new();
        let mut remaining: Vec<(TimerId, Ticks), MAX_TIMERS> = Vec::new();
        for entry in self.pending.drain(..) {
            if entry.1 <= now {
                let _ = due.push(entry);
            } else {
                let _ = remaining.push(entry);
            }
        }
        self.pending = remaining;
        due.sort_by_key(|(_, deadline)| *deadline);
        due.into_iter().map(|(id, _)| id).collect()
    }
}
