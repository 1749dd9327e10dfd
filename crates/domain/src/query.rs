//! A single node in a resolution plan: the sought triple, its flags, the
//! elected nameserver/zone cut, and the query's place in the parent chain.

use crate::cache_entry::{CachedData, RRSet};
use crate::name::{CaseSecret, Name};
use crate::record_type::RecordType;
use std::net::IpAddr;
use std::time::Duration;

/// Minimal inline bitflags, used instead of the `bitflags` crate because this
/// is the single flag set in the whole workspace and pulling in the macro
/// crate for one five-bit set would be the tail wagging the dog.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $ty:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name($ty);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            pub fn empty() -> Self {
                $name(0)
            }

            pub fn contains(&self, other: $name) -> bool {
                (self.0 & other.0) == other.0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: $name) {
                self.0 &= !other.0;
            }

            pub fn bits(&self) -> $ty {
                self.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }
    };
}

bitflags_like! {
    /// Per-query flags. Plain bits rather than a `bitflags!`-generated type:
    /// the set is small and fixed, and callers read/write single flags far
    /// more often than the whole set.
    pub struct QueryFlags: u16 {
        const AWAIT_ADDR = 0x0001;
        const TCP = 0x0002;
        const NO_CACHE = 0x0004;
        const NO_THROTTLE = 0x0008;
        const RESOLVED = 0x0010;
    }
}

/// A nameserver candidate inside a zone cut: its name and whatever
/// addresses have been harvested for it (empty until an `AWAIT_ADDR`
/// sub-query resolves, or until glue records populate it directly).
#[derive(Debug, Clone)]
pub struct NsCandidate {
    pub name: Name,
    pub addresses: Vec<IpAddr>,
    /// Negative score means invalid/unusable; see nameserver election.
    pub score: i64,
    pub cached_rtt: Option<Duration>,
}

impl NsCandidate {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            addresses: Vec::new(),
            score: 0,
            cached_rtt: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.score >= 0
    }

    pub fn invalidate(&mut self) {
        self.score = -1;
    }
}

/// The authoritative delegation point governing a query: owner name, the
/// DNSKEY set if validated, and the NS set with whatever addresses are
/// currently known for each.
#[derive(Debug, Clone)]
pub struct ZoneCut {
    pub owner: Name,
    pub dnskey: Option<RRSet>,
    pub nameservers: Vec<NsCandidate>,
}

impl ZoneCut {
    pub fn empty(owner: Name) -> Self {
        Self {
            owner,
            dnskey: None,
            nameservers: Vec::new(),
        }
    }

    pub fn valid_nameservers(&self) -> impl Iterator<Item = &NsCandidate> {
        self.nameservers.iter().filter(|ns| ns.is_valid())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryId(pub u64);

/// A node on the resolution plan.
#[derive(Debug, Clone)]
pub struct Query {
    pub id: QueryId,
    pub parent: Option<QueryId>,
    pub name: Name,
    pub rrtype: RecordType,
    pub flags: QueryFlags,
    pub elected_ns: Option<usize>,
    pub elected_address: Option<IpAddr>,
    pub cut: ZoneCut,
    pub created_at: Duration,
    pub case_secret: CaseSecret,
    /// Set by the cache layer on a hit, or by the iterator layer once this
    /// query's own answer is assembled. Lets a parent query read its child's
    /// result back out of the plan without a separate side channel.
    pub result: Option<CachedData>,
    /// Wire message id and 0x20 secret copied in from a leader task when this
    /// query's request was coalesced as a follower (§4.5 dedup).
    pub msg_id: Option<u16>,
}

impl Query {
    pub fn new(
        id: QueryId,
        parent: Option<QueryId>,
        name: Name,
        rrtype: RecordType,
        created_at: Duration,
        case_secret: CaseSecret,
    ) -> Self {
        let cut = ZoneCut::empty(Name::root());
        Self {
            id,
            parent,
            name,
            rrtype,
            flags: QueryFlags::empty(),
            elected_ns: None,
            elected_address: None,
            cut,
            created_at,
            case_secret,
            result: None,
            msg_id: None,
        }
    }

    pub fn triple(&self) -> (Name, RecordType) {
        (self.name.clone(), self.rrtype)
    }

    pub fn is_resolved(&self) -> bool {
        self.flags.contains(QueryFlags::RESOLVED)
    }

    pub fn mark_resolved(&mut self) {
        self.flags.insert(QueryFlags::RESOLVED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn mk_query() -> Query {
        Query::new(
            QueryId(1),
            None,
            Name::parse("example.com").unwrap(),
            RecordType::A,
            Duration::from_secs(0),
            CaseSecret(42),
        )
    }

    #[test]
    fn flags_set_and_clear() {
        let mut q = mk_query();
        assert!(!q.flags.contains(QueryFlags::TCP));
        q.flags.insert(QueryFlags::TCP);
        assert!(q.flags.contains(QueryFlags::TCP));
        q.flags.remove(QueryFlags::TCP);
        assert!(!q.flags.contains(QueryFlags::TCP));
    }

    #[test]
    fn mark_resolved_is_idempotent() {
        let mut q = mk_query();
        q.mark_resolved();
        q.mark_resolved();
        assert!(q.is_resolved());
    }

    #[test]
    fn ns_candidate_invalidate_makes_score_negative() {
        let mut ns = NsCandidate::new(Name::parse("ns1.example.com").unwrap());
        assert!(ns.is_valid());
        ns.invalidate();
        assert!(!ns.is_valid());
    }
}
