//! The layer pipeline capability contract (C3): "a tagged variant with
//! per-variant dispatch, not virtual inheritance" (§9).

use std::net::IpAddr;
use tern_dns_domain::{ResolutionPlan, ResolverError};

/// Transport a produced query should go out over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Datagram,
    Stream,
}

/// What a layer wants the iterator to do next.
#[derive(Debug)]
pub enum LayerOutcome {
    /// This layer has nothing to add; the iterator asks the next layer.
    Noop,
    /// The layer consumed the current response; re-enter the consume loop.
    Consume,
    /// The layer produced a packet to send. Carries the wire bytes, the
    /// candidate address list (already capped to K), and the transport.
    Produce {
        packet: Vec<u8>,
        addresses: Vec<IpAddr>,
        transport: Transport,
    },
    /// The whole request is finished (cache hit, final answer assembled).
    Done,
    Fail(ResolverError),
}

/// What the engine's I/O attempt for the last `produce`d packet came back
/// with (§4.4): an answer, a plain timeout, or a network-level failure that
/// persisted across every address/retry in the budget. The two failure
/// kinds are distinguished because only the latter should escalate a query
/// to TCP — a timeout just means the elected nameserver never answered.
#[derive(Debug, Clone, Copy)]
pub enum ConsumeSignal<'a> {
    Response(&'a [u8]),
    Timeout,
    NetworkError,
}

impl<'a> ConsumeSignal<'a> {
    pub fn response(self) -> Option<&'a [u8]> {
        match self {
            ConsumeSignal::Response(bytes) => Some(bytes),
            ConsumeSignal::Timeout | ConsumeSignal::NetworkError => None,
        }
    }
}

/// One handler in the pipeline. Produce/consume are plain synchronous calls
/// over the plan — any actual I/O happens one level up, in the worker/task
/// engine, which is the only place that awaits anything (§4.3: iteration
/// "yields control to C5 to do I/O").
pub trait Layer {
    fn begin(&mut self, plan: &mut ResolutionPlan);
    fn reset(&mut self, plan: &mut ResolutionPlan);
    fn finish(&mut self, plan: &mut ResolutionPlan);

    fn produce(&mut self, plan: &mut ResolutionPlan) -> LayerOutcome;

    fn consume(&mut self, plan: &mut ResolutionPlan, signal: ConsumeSignal<'_>) -> LayerOutcome;

    fn fail(&mut self, plan: &mut ResolutionPlan, err: ResolverError);
}
