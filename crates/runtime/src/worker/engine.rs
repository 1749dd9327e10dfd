//! `ResolverEngine`: the `DnsEngine` implementation the worker/task engine
//! (C5) provides. Drives one request's `ResolutionPlan` through its
//! pipeline, performing nameserver I/O between `produce` and `consume`
//! (retransmission every `RETRY_MS` across up to `K` round-robin addresses,
//! bounded by `RTT_MAX_MS` total), and coalesces concurrent requests for the
//! same `(qname, qtype)` through `InflightTable` the way the teacher's
//! `CachedResolver::resolve` does with its own inflight `DashMap`.

use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, Query as HQuery, ResponseCode};
use tracing::{debug, warn};

use tern_dns_application::ports::{ConsumeSignal, DnsAnswer, DnsEngine, LayerOutcome, Transport};
use tern_dns_domain::query::Query as PlanQuery;
use tern_dns_domain::{CachedData, CaseSecret, ResolutionPlan, ResolverError};

use crate::cache::coarse_clock::coarse_now_secs;
use crate::network;
use crate::resolver::core::ResolverCore;
use crate::wire;

use super::dedup::{InflightTable, LeaderGuard};
use super::stats::{ConcurrencyGuard, WorkerStats};

/// What `send_with_retry` came back with once its attempt budget ended.
enum SendOutcome {
    Response(Vec<u8>),
    Timeout,
    NetworkError,
}

pub struct ResolverEngine {
    core: Rc<ResolverCore>,
    inflight: InflightTable,
    stats: WorkerStats,
}

impl ResolverEngine {
    pub fn new(core: Rc<ResolverCore>) -> Self {
        Self { core, inflight: InflightTable::new(), stats: WorkerStats::new() }
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Retransmit `packet` every `retry_ms` across `addresses`, round-robin,
    /// until one attempt succeeds or the cumulative budget `rtt_max_ms`
    /// elapses (§4.4/§4.6). Distinguishes a budget that ran out on plain
    /// timeouts from one where every attempt actually failed at the
    /// transport level (connection refused, send/recv error, …): only the
    /// latter should escalate the query to TCP.
    async fn send_with_retry(&self, packet: &[u8], addresses: &[std::net::IpAddr], transport: Transport) -> SendOutcome {
        if addresses.is_empty() {
            return SendOutcome::Timeout;
        }
        let retry = Duration::from_millis(self.core.config().retry_ms);
        let budget = Duration::from_millis(self.core.config().rtt_max_ms);
        let deadline = tokio::time::Instant::now() + budget;

        let mut attempt = 0usize;
        let mut last_was_network_error = false;
        loop {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                self.stats.record_timeout();
                return if last_was_network_error {
                    SendOutcome::NetworkError
                } else {
                    SendOutcome::Timeout
                };
            }
            if attempt > 0 {
                self.stats.record_retry();
            }
            let addr = addresses[attempt % addresses.len()];
            attempt += 1;
            let sock = SocketAddr::new(addr, 53);
            let remaining = deadline.saturating_duration_since(now);
            let attempt_timeout = retry.min(remaining);

            let result = match transport {
                Transport::Datagram => network::send_datagram(sock, packet, attempt_timeout).await,
                Transport::Stream => network::send_stream(sock, packet, attempt_timeout).await,
            };
            match result {
                Ok(bytes) => return SendOutcome::Response(bytes),
                Err(ResolverError::Timeout) => {
                    last_was_network_error = false;
                    debug!(%addr, "nameserver attempt timed out, retrying");
                    continue;
                }
                Err(err) => {
                    last_was_network_error = true;
                    debug!(%addr, ?err, "nameserver attempt failed, retrying");
                    continue;
                }
            }
        }
    }

    /// Drive `plan` through `pipeline`'s produce/I-O/consume cycle until the
    /// plan is empty (`Done`) or a layer reports a fatal `Fail`. Returns
    /// whether any network I/O actually happened, so the caller can report
    /// an honest `cache_hit`.
    async fn drive(
        &self,
        plan: &mut ResolutionPlan,
        pipeline: &mut crate::resolver::pipeline::Pipeline,
    ) -> Result<bool, ResolverError> {
        pipeline.begin(plan);
        let iter_limit = self.core.config().iter_limit;
        let mut iterations = 0u32;
        let mut used_network = false;

        loop {
            if iterations >= iter_limit {
                pipeline.fail(plan, ResolverError::ELimit);
                return Err(ResolverError::ELimit);
            }
            iterations += 1;

            match pipeline.produce(plan) {
                LayerOutcome::Done => {
                    pipeline.finish(plan);
                    return Ok(used_network);
                }
                LayerOutcome::Fail(err) => {
                    pipeline.fail(plan, err);
                    return Err(err);
                }
                LayerOutcome::Consume => continue,
                LayerOutcome::Noop => {
                    pipeline.fail(plan, ResolverError::NoEnt);
                    return Err(ResolverError::NoEnt);
                }
                LayerOutcome::Produce { packet, addresses, transport } => {
                    used_network = true;
                    let outcome = self.send_with_retry(&packet, &addresses, transport).await;
                    let signal = match &outcome {
                        SendOutcome::Response(bytes) => ConsumeSignal::Response(bytes),
                        SendOutcome::Timeout => ConsumeSignal::Timeout,
                        SendOutcome::NetworkError => ConsumeSignal::NetworkError,
                    };
                    match pipeline.consume(plan, signal) {
                        LayerOutcome::Done => {
                            pipeline.finish(plan);
                            return Ok(used_network);
                        }
                        LayerOutcome::Fail(err) => {
                            pipeline.fail(plan, err);
                            return Err(err);
                        }
                        _ => continue,
                    }
                }
            }
        }
    }

    async fn resolve_as_leader(
        &self,
        key: (tern_dns_domain::Name, tern_dns_domain::RecordType),
        question: &HQuery,
        wire_id: u16,
    ) -> Result<Message, ResolverError> {
        self.stats.record_leader();
        let guard = LeaderGuard::new(&self.inflight, key.clone());

        // §4.5: concurrent_threshold is a throttling trigger, not an
        // admission-control limit — a leader over the threshold still runs,
        // just after a brief retry_ms-sized backoff, giving in-flight
        // leaders a chance to finish and free capacity instead of piling
        // every new request's nameserver I/O on top of them at once.
        let concurrency = ConcurrencyGuard::enter(&self.stats);
        if concurrency.count > self.core.config().concurrent_threshold as u64 {
            debug!(concurrent = concurrency.count, "throttling leader resolution");
            tokio::time::sleep(Duration::from_millis(self.core.config().retry_ms)).await;
        }

        let mut plan = ResolutionPlan::new();
        let now = Duration::from_secs(coarse_now_secs());
        let root_id = plan
            .push(None, key.0.clone(), key.1, now, CaseSecret::fresh())
            .map_err(|_| ResolverError::ELoop)?;

        let mut pipeline = self.core.build_pipeline();
        let outcome = self.drive(&mut plan, &mut pipeline).await;

        let message = outcome.and_then(|_| {
            let resolved = plan.last_resolved().ok_or(ResolverError::NoEnt)?;
            build_answer_message(question, wire_id, resolved)
        });

        match &message {
            Ok(msg) => self.inflight.complete(&key, Some(Rc::new(msg.clone()))),
            Err(_) => self.inflight.complete(&key, None),
        }
        drop(guard);
        let _ = root_id;
        message
    }
}

#[async_trait(?Send)]
impl DnsEngine for ResolverEngine {
    async fn resolve(&self, query: &Message) -> Result<DnsAnswer, ResolverError> {
        let question = query.queries().first().cloned().ok_or(ResolverError::Invalid)?;
        let name = wire::from_hickory_name(question.name())?;
        let rrtype = wire::from_hickory_type(question.query_type()).ok_or(ResolverError::Invalid)?;
        let key = (name, rrtype);

        let tsig = wire::inbound_tsig(query);

        let (is_leader, mut rx) = self.inflight.register_or_join(key.clone());
        if is_leader {
            let mut message = self.resolve_as_leader(key, &question, query.id()).await?;
            if let Some(tsig) = tsig {
                wire::append_tsig(&mut message, tsig);
            }
            return Ok(DnsAnswer { message, cache_hit: false, truncated: false });
        }

        self.stats.record_follower();
        if rx.changed().await.is_ok() {
            if let Some(leader_msg) = rx.borrow().clone() {
                let mut message = (*leader_msg).clone();
                message.set_id(query.id());
                // TSIG isn't part of the leader's cached result (§6: never
                // propagated to sub-queries, and a follower's own inbound
                // TSIG is specific to its own client connection), so each
                // follower attaches its own rather than inheriting the
                // leader's.
                if let Some(tsig) = tsig {
                    wire::append_tsig(&mut message, tsig);
                }
                return Ok(DnsAnswer { message, cache_hit: true, truncated: false });
            }
        }

        // The leader we joined dropped without broadcasting a result (a
        // panic, or a bail before `complete`). Re-register: the entry is
        // gone, so this call becomes the new leader rather than waiting
        // forever on a channel nobody will ever send on again.
        warn!(?key, "leader vanished without a result, re-resolving");
        let mut message = self.resolve_as_leader(key, &question, query.id()).await?;
        if let Some(tsig) = tsig {
            wire::append_tsig(&mut message, tsig);
        }
        Ok(DnsAnswer { message, cache_hit: false, truncated: false })
    }
}

fn build_answer_message(question: &HQuery, wire_id: u16, resolved: &PlanQuery) -> Result<Message, ResolverError> {
    match &resolved.result {
        Some(CachedData::Records(rrset)) => {
            let records = wire::record_from_rrset(rrset)?;
            Ok(wire::build_answer(wire_id, question, ResponseCode::NoError, records))
        }
        Some(CachedData::Negative { nxdomain: true }) => {
            Ok(wire::build_answer(wire_id, question, ResponseCode::NXDomain, vec![]))
        }
        Some(CachedData::Negative { nxdomain: false }) => {
            Ok(wire::build_answer(wire_id, question, ResponseCode::NoError, vec![]))
        }
        Some(CachedData::Cname(_)) | None => Err(ResolverError::NoEnt),
    }
}
