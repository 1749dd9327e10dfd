//! The cache layer (§4.3): first in the pipeline on both `produce` and
//! `consume`. On `produce` it short-circuits the current query with a cache
//! hit; on `consume` it stores whatever the iterator layer's response
//! handed back, and never claims to be the one that finished the request.

use std::rc::Rc;

use tern_dns_application::ports::{ConsumeSignal, KvBackend, Layer, LayerOutcome, PeekResult, Txn};
use tern_dns_domain::cache_entry::{CacheEntryHeader, CachedData, Tag};
use tern_dns_domain::{Name, QueryFlags, RRSet, Rank, RecordType, ResolutionPlan, ResolverError};

use crate::cache::coarse_clock::coarse_now_secs;
use crate::wire;

pub struct CacheLayer {
    kv: Rc<dyn KvBackend>,
}

impl CacheLayer {
    pub fn new(kv: Rc<dyn KvBackend>) -> Self {
        Self { kv }
    }
}

impl Layer for CacheLayer {
    fn begin(&mut self, _plan: &mut ResolutionPlan) {}
    fn reset(&mut self, _plan: &mut ResolutionPlan) {}
    fn finish(&mut self, _plan: &mut ResolutionPlan) {}
    fn fail(&mut self, _plan: &mut ResolutionPlan, _err: ResolverError) {}

    fn produce(&mut self, plan: &mut ResolutionPlan) -> LayerOutcome {
        let Some(current) = plan.current() else {
            return LayerOutcome::Noop;
        };
        if current.is_resolved() || current.flags.contains(QueryFlags::NO_CACHE) {
            return LayerOutcome::Noop;
        }
        let id = current.id;
        let name = current.name.clone();
        let rrtype = current.rrtype;

        let txn = match self.kv.txn_begin(true) {
            Ok(t) => t,
            // Cache unavailable degrades to a miss, never a hard failure.
            Err(_) => return LayerOutcome::Noop,
        };

        match txn.peek(Tag::ResourceRecord, &name, rrtype, coarse_now_secs()) {
            PeekResult::Hit { data, drift, .. } => {
                let materialized = match data {
                    CachedData::Records(rrset) => CachedData::Records(rrset.materialize(drift as u32)),
                    other => other,
                };
                if let Some(q) = plan.get_mut(id) {
                    q.result = Some(materialized);
                    q.mark_resolved();
                }
                plan.pop(id);
                if plan.is_empty() {
                    LayerOutcome::Done
                } else {
                    LayerOutcome::Consume
                }
            }
            PeekResult::Stale { .. } | PeekResult::Miss => LayerOutcome::Noop,
        }
    }

    fn consume(&mut self, plan: &mut ResolutionPlan, signal: ConsumeSignal<'_>) -> LayerOutcome {
        let Some(bytes) = signal.response() else {
            return LayerOutcome::Noop;
        };
        let Some(current) = plan.current() else {
            return LayerOutcome::Noop;
        };
        if current.flags.contains(QueryFlags::NO_CACHE) {
            return LayerOutcome::Noop;
        }
        let name = current.name.clone();
        let rrtype = current.rrtype;

        let Ok(message) = wire::parse_message(bytes) else {
            return LayerOutcome::Noop;
        };
        let Ok(owner) = wire::to_hickory_name(&name) else {
            return LayerOutcome::Noop;
        };

        let mut txn = match self.kv.txn_begin(false) {
            Ok(t) => t,
            Err(_) => return LayerOutcome::Noop,
        };

        let now = coarse_now_secs();

        if let Some(rrset) = wire::answer_rrset(&message, &owner, rrtype) {
            store(txn.as_mut(), &name, rrtype, rrset, Rank::Auth, now);
        } else {
            let rcode = wire::response_code(&message);
            let nxdomain = rcode == hickory_proto::op::ResponseCode::NXDomain;
            let nodata = rcode == hickory_proto::op::ResponseCode::NoError && message.answers().is_empty();
            if nxdomain || nodata {
                let ttl = wire::negative_ttl(&message);
                let header = CacheEntryHeader {
                    created_at: now,
                    max_ttl: ttl,
                    record_count: 0,
                    rank: Rank::Auth,
                    flags: 0,
                };
                let _ = txn.insert(Tag::ResourceRecord, &name, rrtype, header, CachedData::Negative { nxdomain });
            }
        }

        // Glue and referral NS names are worth remembering even when they
        // aren't this query's own answer, so the next query under the same
        // zone doesn't have to re-walk from root.
        for (ns_owner, ns_name) in wire::referral_nameservers(&message) {
            let rrset = RRSet::new(
                ns_owner.clone(),
                RecordType::NS,
                message.name_servers().iter().map(|r| r.ttl()).max().unwrap_or(3600),
                vec![bytes::Bytes::from(ns_name.as_str().as_bytes().to_vec())],
            );
            store(txn.as_mut(), &ns_owner, RecordType::NS, rrset, Rank::NonAuth, now);
        }

        let _ = txn.commit();
        LayerOutcome::Noop
    }
}

fn store(
    txn: &mut dyn Txn,
    name: &Name,
    rrtype: RecordType,
    rrset: RRSet,
    rank: Rank,
    now: u64,
) {
    let header = CacheEntryHeader {
        created_at: now,
        max_ttl: rrset.ttl,
        record_count: rrset.rdata.len() as u32,
        rank,
        flags: 0,
    };
    let _ = txn.insert(Tag::ResourceRecord, name, rrtype, header, CachedData::Records(rrset));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::coarse_clock;
    use crate::cache::InMemoryKv;
    use hickory_proto::op::{Message, MessageType, OpCode, Query as HQuery, ResponseCode};
    use hickory_proto::rr::rdata::SOA;
    use hickory_proto::rr::{Name as HName, RData, Record, RecordType as HRecordType};
    use std::str::FromStr;
    use std::time::Duration;
    use tern_dns_domain::{CaseSecret, ResolutionPlan};

    fn nxdomain_message_with_soa(owner: &HName, soa_ttl: u32, soa_minimum: u32) -> Message {
        let mut message = Message::new();
        message.set_message_type(MessageType::Response);
        message.set_op_code(OpCode::Query);
        message.set_response_code(ResponseCode::NXDomain);
        message.add_query(HQuery::query(owner.clone(), HRecordType::A));
        message.add_name_server(Record::from_rdata(
            owner.clone(),
            soa_ttl,
            RData::SOA(SOA::new(owner.clone(), owner.clone(), 1, 7200, 3600, 1_209_600, soa_minimum)),
        ));
        message
    }

    #[test]
    fn nxdomain_response_is_cached_as_a_negative_entry_with_soa_minimum_ttl() {
        coarse_clock::set_for_test(1000);
        let kv: Rc<dyn KvBackend> = Rc::new(InMemoryKv::open());
        let mut layer = CacheLayer::new(Rc::clone(&kv));

        let name = Name::parse("missing.example.com").unwrap();
        let mut plan = ResolutionPlan::new();
        plan.push(None, name.clone(), RecordType::A, Duration::ZERO, CaseSecret::fresh()).unwrap();

        let owner = HName::from_str("missing.example.com.").unwrap();
        let message = nxdomain_message_with_soa(&owner, 3600, 120);
        let bytes = message.to_vec().unwrap();

        let outcome = layer.consume(&mut plan, ConsumeSignal::Response(&bytes));
        assert!(matches!(outcome, LayerOutcome::Noop));

        let txn = kv.txn_begin(true).unwrap();
        match txn.peek(Tag::ResourceRecord, &name, RecordType::A, 1000) {
            PeekResult::Hit { header, data, .. } => {
                assert_eq!(header.max_ttl, 120, "must take the lesser of SOA ttl and minimum field");
                assert!(matches!(data, CachedData::Negative { nxdomain: true }));
            }
            other => panic!("expected a cached negative hit, got {other:?}"),
        }
    }

    #[test]
    fn negative_entry_expires_after_its_soa_minimum_ttl() {
        coarse_clock::set_for_test(1000);
        let kv: Rc<dyn KvBackend> = Rc::new(InMemoryKv::open());
        let mut layer = CacheLayer::new(Rc::clone(&kv));

        let name = Name::parse("missing.example.com").unwrap();
        let mut plan = ResolutionPlan::new();
        plan.push(None, name.clone(), RecordType::A, Duration::ZERO, CaseSecret::fresh()).unwrap();

        let owner = HName::from_str("missing.example.com.").unwrap();
        let message = nxdomain_message_with_soa(&owner, 3600, 60);
        let bytes = message.to_vec().unwrap();
        layer.consume(&mut plan, ConsumeSignal::Response(&bytes));

        let txn = kv.txn_begin(true).unwrap();
        match txn.peek(Tag::ResourceRecord, &name, RecordType::A, 1061) {
            PeekResult::Stale { .. } => {}
            other => panic!("expected the negative entry to have expired, got {other:?}"),
        }
    }
}
