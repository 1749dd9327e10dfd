//! The transactional KV interface the cache (C1) is specified against.
//! `tern-dns-runtime` ships the single concrete backend this crate needs
//! (`InMemoryKv`); the trait exists so the on-disk format stays an
//! implementation detail rather than part of this crate's API, per the
//! cache's own non-goal ("no guaranteed on-disk format").

use tern_dns_domain::cache_entry::{CacheEntryHeader, CachedData, Tag};
use tern_dns_domain::{Name, Rank, RecordType, ResolverError};

#[derive(Debug, Clone)]
pub enum PeekResult {
    Hit {
        header: CacheEntryHeader,
        data: CachedData,
        /// Seconds elapsed since the entry's creation timestamp; `0` when
        /// the stored timestamp is in the future (the "John Connor" branch,
        /// preserved as documented in §9 with no further tie-breaker).
        drift: u64,
    },
    /// Entry present but past its TTL. The caller still gets the rank so it
    /// can decide whether to serve stale data or re-query.
    Stale { rank: Rank },
    Miss,
}

/// One logical transaction against the cache KV. Write transactions must
/// not span a suspension point (§5) — the single-threaded model enforces
/// this structurally since a `Txn` is never held across an `.await`.
pub trait Txn {
    fn peek(&self, tag: Tag, name: &Name, rrtype: RecordType, now: u64) -> PeekResult;

    /// Replaces any existing key, subject to the rank-monotonicity policy
    /// (§4.1): suppressed (returns `Ok(())` without replacing) when the
    /// existing entry is live and outranks `header.rank`.
    fn insert(
        &mut self,
        tag: Tag,
        name: &Name,
        rrtype: RecordType,
        header: CacheEntryHeader,
        data: CachedData,
    ) -> Result<(), ResolverError>;

    fn remove(&mut self, tag: Tag, name: &Name, rrtype: RecordType);

    fn clear(&mut self);

    fn commit(self: Box<Self>) -> Result<(), ResolverError>;

    fn abort(self: Box<Self>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hit: u64,
    pub miss: u64,
    pub insert: u64,
    pub delete: u64,
    pub txn_read: u64,
    pub txn_write: u64,
}

/// `open`/`close`/`txn_begin` from §4.1. `open` and `close` are modeled as
/// construction/drop of the concrete backend rather than methods here,
/// matching how the teacher's own repositories are opened once at wiring
/// time and simply dropped at shutdown.
pub trait KvBackend {
    fn txn_begin(&self, read_only: bool) -> Result<Box<dyn Txn>, ResolverError>;
    fn stats(&self) -> CacheStats;
}
