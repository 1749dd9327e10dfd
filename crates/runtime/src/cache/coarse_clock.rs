//! A coarse, tick-driven clock. Avoids a `SystemTime::now()` syscall on
//! every cache lookup the way the teacher's `coarse_clock` avoids one on
//! every cache read; backed by a `Cell` rather than an `AtomicU64` since
//! the single-threaded event loop has no concurrent writer to race against.

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

thread_local! {
    static COARSE_CLOCK: Cell<u64> = Cell::new(wall_clock_now_secs());
}

fn wall_clock_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[inline]
pub fn coarse_now_secs() -> u64 {
    COARSE_CLOCK.with(|c| c.get())
}

/// Resynchronize the coarse clock against the wall clock. The event loop
/// calls this once per iteration (or on a low-frequency timer), not per
/// cache access.
pub fn tick() {
    COARSE_CLOCK.with(|c| c.set(wall_clock_now_secs()));
}

#[cfg(test)]
pub fn set_for_test(secs: u64) {
    COARSE_CLOCK.with(|c| c.set(secs));
}
