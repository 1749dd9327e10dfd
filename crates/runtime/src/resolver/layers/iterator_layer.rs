//! The iterator layer (§4.3/§4.4): the resolver's core C4 logic. Elects a
//! nameserver from the current query's zone cut, builds the outgoing
//! packet, and on the matching response re-anchors the cut on a referral,
//! follows a CNAME, or finishes the query on an answer/NXDOMAIN/NODATA.
//!
//! Grounded on the referral/answer/CNAME dispatch of a plain recursive
//! resolver core (`is_final`/`Answer`/`Referral` matching over
//! `message.answers()`/`name_servers()`/`additionals()`), generalized here
//! to operate over a `ResolutionPlan` instead of a single recursive call
//! stack, and to the zone-cut/`AWAIT_ADDR` bookkeeping §4.4 specifies.

use std::cell::Cell;
use std::time::Duration;

use hickory_proto::op::ResponseCode;

use tern_dns_application::ports::{ConsumeSignal, Layer, LayerOutcome, Transport};
use tern_dns_domain::query::{NsCandidate, ZoneCut};
use tern_dns_domain::{CachedData, CaseSecret, QueryFlags, QueryId, RecordType, ResolutionPlan, ResolverError};

use crate::resolver::root_hints::root_zone_cut;
use crate::wire;

pub struct IteratorLayer {
    k_addresses: usize,
    max_pending: usize,
    next_msg_id: Cell<u16>,
}

impl IteratorLayer {
    pub fn new(k_addresses: usize, max_pending: usize) -> Self {
        Self {
            k_addresses: k_addresses.max(1),
            max_pending: max_pending.max(1),
            next_msg_id: Cell::new(1),
        }
    }

    fn next_id(&self) -> u16 {
        let id = self.next_msg_id.get();
        self.next_msg_id.set(id.wrapping_add(1));
        id
    }

    /// Move a just-finished query (answer, CNAME, NXDOMAIN, or exhausted
    /// nameservers) from pending to resolved, reconciling any `AWAIT_ADDR`
    /// parent waiting on it, and report whether the whole plan is done.
    fn finish(&self, plan: &mut ResolutionPlan, id: QueryId) -> LayerOutcome {
        reconcile_await_addr(plan, id);
        plan.pop(id);
        if plan.is_empty() {
            LayerOutcome::Done
        } else {
            LayerOutcome::Consume
        }
    }
}

impl Layer for IteratorLayer {
    fn begin(&mut self, _plan: &mut ResolutionPlan) {}
    fn reset(&mut self, _plan: &mut ResolutionPlan) {}
    fn finish(&mut self, _plan: &mut ResolutionPlan) {}
    fn fail(&mut self, _plan: &mut ResolutionPlan, _err: ResolverError) {}

    fn produce(&mut self, plan: &mut ResolutionPlan) -> LayerOutcome {
        let Some(current_id) = plan.current().map(|q| q.id) else {
            return LayerOutcome::Done;
        };

        // Lazily seed root hints the first time any query (root query or an
        // `AWAIT_ADDR` child pushed for a nameserver name) needs a cut.
        if let Some(q) = plan.get_mut(current_id) {
            if q.cut.nameservers.is_empty() {
                q.cut = root_zone_cut();
            }
        }

        let elected = {
            let query = plan.get_mut(current_id).expect("current id is valid");
            elect_nameserver(&query.cut)
        };

        let Some(ns_index) = elected else {
            // No reachable nameserver left for this zone cut: the query
            // cannot make further progress.
            return self.finish(plan, current_id);
        };

        let has_addr = {
            let query = plan.get(current_id).expect("current id is valid");
            !query.cut.nameservers[ns_index].addresses.is_empty()
        };

        if !has_addr {
            let query = plan.get(current_id).expect("current id is valid");
            if query.flags.contains(QueryFlags::AWAIT_ADDR) {
                // Address sub-queries already outstanding; nothing new to do
                // until they resolve and reconcile_await_addr runs.
                return LayerOutcome::Noop;
            }
            if plan.pending_len() >= self.max_pending {
                // §4.5: max_pending bounds this request's own fan-out of
                // address sub-queries. At the cap, treat this nameserver the
                // same as one that can never be reached rather than growing
                // the plan further — the next elected nameserver gets a
                // chance instead.
                if let Some(q) = plan.get_mut(current_id) {
                    q.cut.nameservers[ns_index].invalidate();
                }
                return LayerOutcome::Consume;
            }

            let ns_name = query.cut.nameservers[ns_index].name.clone();
            let now = query.created_at;

            let a_pushed = plan.push(Some(current_id), ns_name.clone(), RecordType::A, now, CaseSecret::fresh());
            let aaaa_pushed = plan.push(Some(current_id), ns_name, RecordType::AAAA, now, CaseSecret::fresh());

            if a_pushed.is_err() && aaaa_pushed.is_err() {
                // Both address lookups would loop back onto an ancestor:
                // this nameserver can never be reached, try the next one.
                if let Some(q) = plan.get_mut(current_id) {
                    q.cut.nameservers[ns_index].invalidate();
                }
                return LayerOutcome::Consume;
            }

            if let Some(q) = plan.get_mut(current_id) {
                q.flags.insert(QueryFlags::AWAIT_ADDR);
                q.elected_ns = Some(ns_index);
            }
            return LayerOutcome::Consume;
        }

        let (packet, addresses, tcp, msg_id) = {
            let query = plan.get(current_id).expect("current id is valid");
            let tcp = query.flags.contains(QueryFlags::TCP);
            let id = self.next_id();
            let packet = match wire::build_query_packet(
                id,
                &query.name,
                query.rrtype,
                query.case_secret,
                wire::DEFAULT_EDNS_PAYLOAD,
                tcp,
            ) {
                Ok(p) => p,
                Err(e) => return LayerOutcome::Fail(e),
            };
            let addresses: Vec<_> = query.cut.nameservers[ns_index]
                .addresses
                .iter()
                .take(self.k_addresses)
                .copied()
                .collect();
            (packet, addresses, tcp, id)
        };

        if let Some(q) = plan.get_mut(current_id) {
            q.elected_ns = Some(ns_index);
            q.msg_id = Some(msg_id);
        }

        LayerOutcome::Produce {
            packet,
            addresses,
            transport: if tcp { Transport::Stream } else { Transport::Datagram },
        }
    }

    fn consume(&mut self, plan: &mut ResolutionPlan, signal: ConsumeSignal<'_>) -> LayerOutcome {
        let Some(current_id) = plan.current().map(|q| q.id) else {
            return LayerOutcome::Done;
        };

        let bytes = match signal {
            ConsumeSignal::Timeout => {
                // Timeout: the elected nameserver didn't answer in time.
                // Drop it from contention and clear any TCP fallback so the
                // next attempt starts fresh over UDP.
                if let Some(q) = plan.get_mut(current_id) {
                    if let Some(idx) = q.elected_ns {
                        q.cut.nameservers[idx].invalidate();
                    }
                    q.flags.remove(QueryFlags::TCP);
                }
                return LayerOutcome::Consume;
            }
            ConsumeSignal::NetworkError => {
                // Every attempt in the retry budget failed at the transport
                // level rather than merely timing out (§4.4): escalate to
                // TCP and re-elect the same nameserver on the next produce,
                // without invalidating it the way a timeout does.
                if let Some(q) = plan.get_mut(current_id) {
                    q.flags.insert(QueryFlags::TCP);
                }
                return LayerOutcome::Consume;
            }
            ConsumeSignal::Response(bytes) => bytes,
        };

        let message = match wire::parse_message(bytes) {
            Ok(m) => m,
            Err(_) => {
                if let Some(q) = plan.get_mut(current_id) {
                    if let Some(idx) = q.elected_ns {
                        q.cut.nameservers[idx].invalidate();
                    }
                }
                return LayerOutcome::Consume;
            }
        };

        if wire::is_truncated(&message) {
            let already_tcp = plan
                .get(current_id)
                .map(|q| q.flags.contains(QueryFlags::TCP))
                .unwrap_or(true);
            if !already_tcp {
                if let Some(q) = plan.get_mut(current_id) {
                    q.flags.insert(QueryFlags::TCP);
                }
                return LayerOutcome::Consume;
            }
        }

        let (name, rrtype, parent) = {
            let query = plan.get(current_id).expect("current id is valid");
            (query.name.clone(), query.rrtype, query.parent)
        };
        let owner = match wire::to_hickory_name(&name) {
            Ok(o) => o,
            Err(e) => return LayerOutcome::Fail(e),
        };
        let rcode = wire::response_code(&message);

        if rcode == ResponseCode::NXDomain {
            if let Some(q) = plan.get_mut(current_id) {
                q.result = Some(CachedData::Negative { nxdomain: true });
                q.mark_resolved();
            }
            return self.finish(plan, current_id);
        }

        if let Some(cname) = wire::cname_target(&message, &owner) {
            if let Some(q) = plan.get_mut(current_id) {
                q.result = Some(CachedData::Cname(cname.clone()));
                q.mark_resolved();
            }
            let now = plan.get(current_id).map(|q| q.created_at).unwrap_or(Duration::ZERO);
            let outcome = self.finish(plan, current_id);
            // Chase the alias under the same parent the original query had,
            // so a loop back onto an ancestor's triple is still caught.
            let _ = plan.push(parent, cname, rrtype, now, CaseSecret::fresh());
            return match outcome {
                LayerOutcome::Done => LayerOutcome::Consume,
                other => other,
            };
        }

        if let Some(rrset) = wire::answer_rrset(&message, &owner, rrtype) {
            if let Some(q) = plan.get_mut(current_id) {
                q.result = Some(CachedData::Records(rrset));
                q.mark_resolved();
            }
            return self.finish(plan, current_id);
        }

        if !message.name_servers().is_empty() {
            let referrals = wire::referral_nameservers(&message);
            if referrals.is_empty() {
                if let Some(q) = plan.get_mut(current_id) {
                    if let Some(idx) = q.elected_ns {
                        q.cut.nameservers[idx].invalidate();
                    }
                }
                return LayerOutcome::Consume;
            }
            let new_owner = referrals[0].0.clone();
            let mut cut = ZoneCut::empty(new_owner);
            for (_, ns_name) in &referrals {
                let mut candidate = NsCandidate::new(ns_name.clone());
                if let Ok(hname) = wire::to_hickory_name(ns_name) {
                    let mut addrs = wire::addresses_for(&message, &hname, false);
                    addrs.extend(wire::addresses_for(&message, &hname, true));
                    candidate.addresses = addrs;
                }
                cut.nameservers.push(candidate);
            }
            if let Some(q) = plan.get_mut(current_id) {
                q.cut = cut;
                q.elected_ns = None;
                q.flags.remove(QueryFlags::AWAIT_ADDR);
            }
            return LayerOutcome::Consume;
        }

        // No answer, no referral, no error: authoritative NODATA.
        if let Some(q) = plan.get_mut(current_id) {
            q.result = Some(CachedData::Negative { nxdomain: false });
            q.mark_resolved();
        }
        self.finish(plan, current_id)
    }
}

/// `(reachability, cached RTT, preference)` election (§4.4): skip invalid
/// candidates, prefer the higher preference score, break ties on the lower
/// cached RTT, and prefer any candidate with a known RTT over one with none.
fn elect_nameserver(cut: &ZoneCut) -> Option<usize> {
    let mut best: Option<(usize, i64, Option<Duration>)> = None;
    for (i, ns) in cut.nameservers.iter().enumerate() {
        if !ns.is_valid() {
            continue;
        }
        let candidate_is_better = match best {
            None => true,
            Some((_, best_score, best_rtt)) => {
                if ns.score != best_score {
                    ns.score > best_score
                } else {
                    match (ns.cached_rtt, best_rtt) {
                        (Some(rtt), Some(best_rtt)) => rtt < best_rtt,
                        (Some(_), None) => true,
                        _ => false,
                    }
                }
            }
        };
        if candidate_is_better {
            best = Some((i, ns.score, ns.cached_rtt));
        }
    }
    best.map(|(i, ..)| i)
}

/// Once a child (address) query finishes, harvest any A/AAAA records it
/// found onto its `AWAIT_ADDR` parent's matching nameserver candidate, and
/// clear the flag once no sibling address query is still pending.
fn reconcile_await_addr(plan: &mut ResolutionPlan, child_id: QueryId) {
    let Some(child) = plan.get(child_id) else { return };
    let Some(parent_id) = child.parent else { return };
    let (child_name, child_rrtype, child_result) = (child.name.clone(), child.rrtype, child.result.clone());

    if let Some(CachedData::Records(rrset)) = child_result {
        if let Some(parent) = plan.get_mut(parent_id) {
            if parent.flags.contains(QueryFlags::AWAIT_ADDR) {
                for ns in parent.cut.nameservers.iter_mut() {
                    if ns.name == child_name {
                        for raw in &rrset.rdata {
                            if let Some(addr) = wire::decode_ip_rdata(child_rrtype, raw) {
                                ns.addresses.push(addr);
                            }
                        }
                    }
                }
            }
        }
    }

    let still_waiting = plan.pending_with_parent(parent_id).any(|q| q.id != child_id);
    if !still_waiting {
        if let Some(parent) = plan.get_mut(parent_id) {
            parent.flags.remove(QueryFlags::AWAIT_ADDR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tern_dns_domain::Name;

    fn plan_with_elected_ns() -> (ResolutionPlan, QueryId) {
        let mut plan = ResolutionPlan::new();
        let id = plan
            .push(None, Name::parse("example.com").unwrap(), RecordType::A, Duration::ZERO, CaseSecret::fresh())
            .unwrap();
        let query = plan.get_mut(id).unwrap();
        let mut ns = NsCandidate::new(Name::parse("ns1.example.com").unwrap());
        ns.addresses.push(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
        query.cut.nameservers.push(ns);
        query.elected_ns = Some(0);
        (plan, id)
    }

    #[test]
    fn timeout_invalidates_the_elected_nameserver_and_clears_tcp() {
        let (mut plan, id) = plan_with_elected_ns();
        if let Some(q) = plan.get_mut(id) {
            q.flags.insert(QueryFlags::TCP);
        }
        let mut layer = IteratorLayer::new(4, 32);

        let outcome = layer.consume(&mut plan, ConsumeSignal::Timeout);

        assert!(matches!(outcome, LayerOutcome::Consume));
        let query = plan.get(id).unwrap();
        assert!(!query.cut.nameservers[0].is_valid());
        assert!(!query.flags.contains(QueryFlags::TCP));
    }

    #[test]
    fn network_error_sets_tcp_without_invalidating_the_nameserver() {
        let (mut plan, id) = plan_with_elected_ns();
        let mut layer = IteratorLayer::new(4, 32);

        let outcome = layer.consume(&mut plan, ConsumeSignal::NetworkError);

        assert!(matches!(outcome, LayerOutcome::Consume));
        let query = plan.get(id).unwrap();
        assert!(query.cut.nameservers[0].is_valid(), "a network error must not invalidate the nameserver");
        assert!(query.flags.contains(QueryFlags::TCP));
    }
}
