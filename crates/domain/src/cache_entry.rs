//! Cache entry key/value types: the tagged, time-stamped, ranked record the
//! cache stores under `(tag, reversed-label name, rrtype)`.

use crate::name::Name;
use crate::rank::Rank;
use crate::record_type::RecordType;
use bytes::Bytes;
use compact_str::CompactString;

/// Cache entry category. `UserExtended` reserves the top half of the byte
/// range (≥ 0x80) for layers added outside this crate, the way the source
/// format leaves room for caller-defined tags without a schema bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    ResourceRecord,
    Packet,
    Signature,
    UserExtended(u8),
}

impl Tag {
    pub fn to_byte(self) -> u8 {
        match self {
            Tag::ResourceRecord => 0,
            Tag::Packet => 1,
            Tag::Signature => 2,
            Tag::UserExtended(n) => n,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Tag::ResourceRecord),
            1 => Some(Tag::Packet),
            2 => Some(Tag::Signature),
            n if n >= 0x80 => Some(Tag::UserExtended(n)),
            _ => None,
        }
    }
}

/// `tag(1) || label-reverse(name) || rrtype(2)` as described for the
/// underlying KV; the in-process backend keys on this struct directly
/// rather than a serialized byte string, but `encode` exists so any future
/// on-disk backend can reproduce the same ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tag: Tag,
    pub reversed_name: CompactString,
    pub rrtype: RecordType,
}

impl CacheKey {
    pub fn new(tag: Tag, name: &Name, rrtype: RecordType) -> Self {
        Self {
            tag,
            reversed_name: name.label_reverse_key(),
            rrtype,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.reversed_name.len() + 2);
        out.push(self.tag.to_byte());
        out.extend_from_slice(self.reversed_name.as_bytes());
        out.extend_from_slice(&self.rrtype.to_u16().to_be_bytes());
        out
    }

    pub fn name(&self) -> Name {
        Name::from_label_reverse_key(&self.reversed_name)
    }
}

/// Header stored alongside every cache entry value.
#[derive(Debug, Clone, Copy)]
pub struct CacheEntryHeader {
    /// Absolute creation timestamp, seconds since the resolver's epoch.
    pub created_at: u64,
    /// `max(rdata_ttl[i])`, enforced by the inserter.
    pub max_ttl: u32,
    pub record_count: u32,
    pub rank: Rank,
    pub flags: u8,
}

/// An immutable, ordered resource-record set.
#[derive(Debug, Clone)]
pub struct RRSet {
    pub owner: Name,
    pub rrtype: RecordType,
    pub ttl: u32,
    pub rdata: Vec<Bytes>,
}

impl RRSet {
    pub fn new(owner: Name, rrtype: RecordType, ttl: u32, rdata: Vec<Bytes>) -> Self {
        Self {
            owner,
            rrtype,
            ttl,
            rdata,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rdata.is_empty()
    }

    /// Clone this RRSet with every record's TTL dropped by `drift` seconds,
    /// discarding any record whose remaining TTL would be `<= 0`. An empty
    /// result is a valid RRSet, not an error.
    pub fn materialize(&self, drift: u32) -> RRSet {
        if drift >= self.ttl {
            return RRSet {
                owner: self.owner.clone(),
                rrtype: self.rrtype,
                ttl: 0,
                rdata: Vec::new(),
            };
        }
        RRSet {
            owner: self.owner.clone(),
            rrtype: self.rrtype,
            ttl: self.ttl - drift,
            rdata: self.rdata.clone(),
        }
    }
}

/// The payload of a cache entry: either a positive RRSet, a CNAME chain
/// pointer, or a negative marker recording NODATA vs. NXDOMAIN so that a
/// later re-query of the same name can answer from cache without
/// re-deriving the distinction.
#[derive(Debug, Clone)]
pub enum CachedData {
    Records(RRSet),
    Cname(Name),
    Negative { nxdomain: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_including_user_extended() {
        for t in [Tag::ResourceRecord, Tag::Packet, Tag::Signature, Tag::UserExtended(0x80)] {
            assert_eq!(Tag::from_byte(t.to_byte()), Some(t));
        }
    }

    #[test]
    fn user_extended_requires_high_bit() {
        assert_eq!(Tag::from_byte(0x7f), None);
        assert!(matches!(Tag::from_byte(0x80), Some(Tag::UserExtended(0x80))));
    }

    #[test]
    fn materialize_drops_expired_records_to_empty_rrset() {
        let owner = Name::parse("example.com").unwrap();
        let rr = RRSet::new(owner, RecordType::A, 10, vec![Bytes::from_static(&[1, 2, 3, 4])]);
        let drifted = rr.materialize(20);
        assert!(drifted.is_empty());
        assert_eq!(drifted.ttl, 0);
    }

    #[test]
    fn materialize_subtracts_drift_when_ttl_remains() {
        let owner = Name::parse("example.com").unwrap();
        let rr = RRSet::new(owner, RecordType::A, 300, vec![Bytes::from_static(&[1, 2, 3, 4])]);
        let drifted = rr.materialize(100);
        assert_eq!(drifted.ttl, 200);
        assert_eq!(drifted.rdata.len(), 1);
    }

    #[test]
    fn cache_key_round_trips_through_label_reverse() {
        let name = Name::parse("www.example.com").unwrap();
        let key = CacheKey::new(Tag::ResourceRecord, &name, RecordType::A);
        assert_eq!(key.name(), name);
    }
}
