//! `InMemoryKv`: the one concrete `KvBackend` this workspace ships (§4.1).
//! No on-disk persistence — the cache (C1) contract explicitly does not
//! require a stable on-disk format, only the transactional interface.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tern_dns_application::ports::cache_port::{CacheStats, KvBackend, PeekResult, Txn};
use tern_dns_domain::cache_entry::{CacheEntryHeader, CacheKey, CachedData, Tag};
use tern_dns_domain::config::CacheConfig;
use tern_dns_domain::{Name, Rank, RecordType, ResolverError};

use super::coarse_clock::coarse_now_secs;

/// On-disk version tag from §6 (`V\x02`). Kept here even though this
/// backend has no disk: a future backend bumping this constant is the
/// trigger for the mandated one-shot clear.
pub const CACHE_VERSION: u8 = 2;

struct StoredEntry {
    header: CacheEntryHeader,
    data: CachedData,
    hit_count: Cell<u64>,
    last_access: Cell<u64>,
}

impl StoredEntry {
    fn new(header: CacheEntryHeader, data: CachedData, now: u64) -> Self {
        Self {
            header,
            data,
            hit_count: Cell::new(0),
            last_access: Cell::new(now),
        }
    }

    fn record_hit(&self, now: u64) {
        self.hit_count.set(self.hit_count.get() + 1);
        self.last_access.set(now);
    }

    /// Hit-rate eviction score, the simplest of the teacher's three scorers
    /// (`HitRate`/`LFU`/`LFUK`) and the only one that needs no extra
    /// per-access history buffer.
    fn score(&self, now: u64) -> f64 {
        let age = now.saturating_sub(self.header.created_at).max(1) as f64;
        self.hit_count.get() as f64 / age
    }
}

type Store = Rc<RefCell<FxHashMap<CacheKey, StoredEntry>>>;

pub struct InMemoryKv {
    store: Store,
    stats: Rc<RefCell<CacheStats>>,
    config: CacheConfig,
}

impl InMemoryKv {
    /// `open`: initializes the versioned store. Since this backend never
    /// persists across process restarts there is no non-empty store to
    /// find a version mismatch in, but a fresh store always starts at
    /// `CACHE_VERSION` so the invariant holds trivially.
    pub fn open() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            store: Rc::new(RefCell::new(FxHashMap::default())),
            stats: Rc::new(RefCell::new(CacheStats::default())),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().is_empty()
    }

    /// Drops every expired or marked entry. Driven by the resolver's own
    /// timer at `compaction_interval_secs`, not on the read/write hot path.
    pub fn compact(&self) -> usize {
        let now = coarse_now_secs();
        let mut store = self.store.borrow_mut();
        let before = store.len();
        store.retain(|_, entry| {
            let drift = now.saturating_sub(entry.header.created_at);
            now < entry.header.created_at || drift <= entry.header.max_ttl as u64
        });
        before - store.len()
    }

    /// Sampling-based batch eviction (Redis-style): scores a bounded sample
    /// by hit rate and drops the lowest-scoring fraction.
    fn batch_evict(&self) {
        let now = coarse_now_secs();
        let evict_count =
            ((self.config.max_entries as f64 * self.config.batch_eviction_percentage) as usize).max(1);
        let sample_size = (evict_count * 3).clamp(16, 256);

        let mut store = self.store.borrow_mut();
        let mut candidates: Vec<(CacheKey, f64, u64)> = store
            .iter()
            .take(sample_size)
            .map(|(k, v)| (k.clone(), v.score(now), v.last_access.get()))
            .collect();
        candidates.sort_unstable_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.2.cmp(&b.2))
        });
        for (key, ..) in candidates.into_iter().take(evict_count) {
            store.remove(&key);
        }
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::open()
    }
}

impl KvBackend for InMemoryKv {
    fn txn_begin(&self, read_only: bool) -> Result<Box<dyn Txn>, ResolverError> {
        if !read_only && self.store.borrow().len() >= self.config.max_entries {
            self.batch_evict();
        }
        Ok(Box::new(InMemoryTxn {
            store: self.store.clone(),
            stats: self.stats.clone(),
            read_only,
            aborted: false,
        }))
    }

    fn stats(&self) -> CacheStats {
        *self.stats.borrow()
    }
}

struct InMemoryTxn {
    store: Store,
    stats: Rc<RefCell<CacheStats>>,
    read_only: bool,
    aborted: bool,
}

impl Txn for InMemoryTxn {
    fn peek(&self, tag: Tag, name: &Name, rrtype: RecordType, now: u64) -> PeekResult {
        let key = CacheKey::new(tag, name, rrtype);
        let store = self.store.borrow();
        let result = match store.get(&key) {
            None => PeekResult::Miss,
            Some(entry) => {
                // A stored future timestamp yields drift = 0, preserved as
                // written with no further tie-breaker between two
                // future-dated entries.
                let drift = now.saturating_sub(entry.header.created_at);
                if now < entry.header.created_at || drift <= entry.header.max_ttl as u64 {
                    entry.record_hit(now);
                    PeekResult::Hit {
                        header: entry.header,
                        data: entry.data.clone(),
                        drift: if now < entry.header.created_at { 0 } else { drift },
                    }
                } else {
                    PeekResult::Stale {
                        rank: entry.header.rank,
                    }
                }
            }
        };
        self.stats.borrow_mut().txn_read += 1;
        match &result {
            PeekResult::Hit { .. } => self.stats.borrow_mut().hit += 1,
            PeekResult::Miss | PeekResult::Stale { .. } => self.stats.borrow_mut().miss += 1,
        }
        result
    }

    fn insert(
        &mut self,
        tag: Tag,
        name: &Name,
        rrtype: RecordType,
        header: CacheEntryHeader,
        data: CachedData,
    ) -> Result<(), ResolverError> {
        if self.read_only {
            return Err(ResolverError::Invalid);
        }
        let key = CacheKey::new(tag, name, rrtype);
        let now = coarse_now_secs();
        let mut store = self.store.borrow_mut();

        if let Some(existing) = store.get(&key) {
            let drift = now.saturating_sub(existing.header.created_at);
            let is_live = now < existing.header.created_at || drift <= existing.header.max_ttl as u64;
            // Rank monotonicity: suppress a lower-ranked insert over a live entry.
            if is_live && !header.rank.may_replace(existing.header.rank) {
                return Ok(());
            }
        }

        store.insert(key, StoredEntry::new(header, data, now));
        drop(store);
        self.stats.borrow_mut().insert += 1;
        self.stats.borrow_mut().txn_write += 1;
        Ok(())
    }

    fn remove(&mut self, tag: Tag, name: &Name, rrtype: RecordType) {
        let key = CacheKey::new(tag, name, rrtype);
        self.store.borrow_mut().remove(&key);
        self.stats.borrow_mut().delete += 1;
        self.stats.borrow_mut().txn_write += 1;
    }

    fn clear(&mut self) {
        self.store.borrow_mut().clear();
        self.stats.borrow_mut().txn_write += 1;
    }

    fn commit(self: Box<Self>) -> Result<(), ResolverError> {
        // Writes already landed synchronously (no suspension points span a
        // write transaction, per §5); commit only draws the line under it.
        Ok(())
    }

    fn abort(mut self: Box<Self>) {
        self.aborted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::coarse_clock;
    use bytes::Bytes;
    use tern_dns_domain::cache_entry::RRSet;

    fn header(now: u64, ttl: u32, rank: Rank) -> CacheEntryHeader {
        CacheEntryHeader {
            created_at: now,
            max_ttl: ttl,
            record_count: 1,
            rank,
            flags: 0,
        }
    }

    fn records_payload() -> CachedData {
        CachedData::Records(RRSet::new(
            Name::parse("example.com").unwrap(),
            RecordType::A,
            300,
            vec![Bytes::from_static(&[10, 0, 0, 1])],
        ))
    }

    #[test]
    fn cache_freshness_invariant() {
        // peek(e, now) hits iff t0 <= now <= t0 + T.
        let kv = InMemoryKv::open();
        let mut txn = kv.txn_begin(false).unwrap();
        let name = Name::parse("example.com").unwrap();
        txn.insert(Tag::ResourceRecord, &name, RecordType::A, header(1000, 300, Rank::Auth), records_payload())
            .unwrap();
        txn.commit().unwrap();

        let txn = kv.txn_begin(true).unwrap();
        assert!(matches!(txn.peek(Tag::ResourceRecord, &name, RecordType::A, 999), PeekResult::Hit { .. }) == false);
        assert!(matches!(txn.peek(Tag::ResourceRecord, &name, RecordType::A, 1000), PeekResult::Hit { .. }));
        assert!(matches!(txn.peek(Tag::ResourceRecord, &name, RecordType::A, 1300), PeekResult::Hit { .. }));
        assert!(matches!(txn.peek(Tag::ResourceRecord, &name, RecordType::A, 1301), PeekResult::Stale { .. }));
    }

    #[test]
    fn rank_monotonicity_suppresses_lower_rank_on_live_entry() {
        let kv = InMemoryKv::open();
        let name = Name::parse("example.com").unwrap();

        coarse_clock::set_for_test(1000);
        let mut txn = kv.txn_begin(false).unwrap();
        txn.insert(Tag::ResourceRecord, &name, RecordType::A, header(1000, 300, Rank::Secure), records_payload())
            .unwrap();
        txn.commit().unwrap();

        coarse_clock::set_for_test(1001);
        let mut txn = kv.txn_begin(false).unwrap();
        txn.insert(Tag::ResourceRecord, &name, RecordType::A, header(1001, 300, Rank::Insecure), records_payload())
            .unwrap();
        txn.commit().unwrap();

        let txn = kv.txn_begin(true).unwrap();
        match txn.peek(Tag::ResourceRecord, &name, RecordType::A, 1001) {
            PeekResult::Hit { header, .. } => assert_eq!(header.rank, Rank::Secure),
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn expired_entries_are_always_overwritten() {
        let kv = InMemoryKv::open();
        let name = Name::parse("example.com").unwrap();

        coarse_clock::set_for_test(1000);
        let mut txn = kv.txn_begin(false).unwrap();
        txn.insert(Tag::ResourceRecord, &name, RecordType::A, header(1000, 10, Rank::Secure), records_payload())
            .unwrap();
        txn.commit().unwrap();

        coarse_clock::set_for_test(2000);
        let mut txn = kv.txn_begin(false).unwrap();
        txn.insert(Tag::ResourceRecord, &name, RecordType::A, header(2000, 300, Rank::Bad), records_payload())
            .unwrap();
        txn.commit().unwrap();

        let txn = kv.txn_begin(true).unwrap();
        match txn.peek(Tag::ResourceRecord, &name, RecordType::A, 2000) {
            PeekResult::Hit { header, .. } => assert_eq!(header.rank, Rank::Bad),
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn future_timestamp_yields_zero_drift() {
        let kv = InMemoryKv::open();
        let name = Name::parse("example.com").unwrap();
        let mut txn = kv.txn_begin(false).unwrap();
        txn.insert(Tag::ResourceRecord, &name, RecordType::A, header(5000, 300, Rank::Auth), records_payload())
            .unwrap();
        txn.commit().unwrap();

        let txn = kv.txn_begin(true).unwrap();
        match txn.peek(Tag::ResourceRecord, &name, RecordType::A, 100) {
            PeekResult::Hit { drift, .. } => assert_eq!(drift, 0),
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn compact_removes_only_expired_entries() {
        let kv = InMemoryKv::open();
        let fresh = Name::parse("fresh.example.com").unwrap();
        let expired = Name::parse("expired.example.com").unwrap();

        coarse_clock::set_for_test(1000);
        let mut txn = kv.txn_begin(false).unwrap();
        txn.insert(Tag::ResourceRecord, &fresh, RecordType::A, header(1000, 300, Rank::Auth), records_payload())
            .unwrap();
        txn.insert(Tag::ResourceRecord, &expired, RecordType::A, header(100, 50, Rank::Auth), records_payload())
            .unwrap();
        txn.commit().unwrap();

        coarse_clock::set_for_test(1000);
        let removed = kv.compact();
        assert_eq!(removed, 1);
        assert_eq!(kv.len(), 1);
    }

    #[test]
    fn insert_over_capacity_triggers_batch_eviction() {
        let config = tern_dns_domain::config::CacheConfig {
            max_entries: 4,
            shard_amount: 1,
            batch_eviction_percentage: 0.5,
            compaction_interval_secs: 300,
        };
        let kv = InMemoryKv::with_config(config);
        for i in 0..4 {
            let name = Name::parse(&format!("host{i}.example.com")).unwrap();
            let mut txn = kv.txn_begin(false).unwrap();
            txn.insert(Tag::ResourceRecord, &name, RecordType::A, header(1000, 300, Rank::Auth), records_payload())
                .unwrap();
            txn.commit().unwrap();
        }
        assert_eq!(kv.len(), 4);

        let name = Name::parse("overflow.example.com").unwrap();
        let mut txn = kv.txn_begin(false).unwrap();
        txn.insert(Tag::ResourceRecord, &name, RecordType::A, header(1000, 300, Rank::Auth), records_payload())
            .unwrap();
        txn.commit().unwrap();

        assert!(kv.len() < 5, "batch eviction should have made room before the insert");
    }
}
