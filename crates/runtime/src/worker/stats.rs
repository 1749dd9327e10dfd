//! Simple per-engine counters: the worker/task engine's analogue of the
//! cache's own `CacheStats` (§4.1) — how often a request led, followed,
//! timed out a nameserver, or retried.

use std::cell::Cell;

#[derive(Debug, Default)]
pub struct WorkerStats {
    pub leader: Cell<u64>,
    pub follower: Cell<u64>,
    pub timeout: Cell<u64>,
    pub retry: Cell<u64>,
    /// Leader resolutions currently in flight, engine-wide — compared
    /// against `concurrent_threshold` (§4.5) to decide whether a new leader
    /// should be throttled before it starts its own nameserver I/O.
    concurrent: Cell<u64>,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_leader(&self) {
        self.leader.set(self.leader.get() + 1);
    }

    pub fn record_follower(&self) {
        self.follower.set(self.follower.get() + 1);
    }

    pub fn record_timeout(&self) {
        self.timeout.set(self.timeout.get() + 1);
    }

    pub fn record_retry(&self) {
        self.retry.set(self.retry.get() + 1);
    }

    pub fn concurrent(&self) -> u64 {
        self.concurrent.get()
    }

    fn enter_concurrent(&self) -> u64 {
        let n = self.concurrent.get() + 1;
        self.concurrent.set(n);
        n
    }

    fn leave_concurrent(&self) {
        self.concurrent.set(self.concurrent.get().saturating_sub(1));
    }
}

/// Counts a leader resolution in `WorkerStats::concurrent` for its whole
/// lifetime, the same drop-safety-net shape as `LeaderGuard`.
pub struct ConcurrencyGuard<'a> {
    stats: &'a WorkerStats,
    pub count: u64,
}

impl<'a> ConcurrencyGuard<'a> {
    pub fn enter(stats: &'a WorkerStats) -> Self {
        let count = stats.enter_concurrent();
        Self { stats, count }
    }
}

impl Drop for ConcurrencyGuard<'_> {
    fn drop(&mut self) {
        self.stats.leave_concurrent();
    }
}
