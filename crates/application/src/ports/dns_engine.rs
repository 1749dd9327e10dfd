//! The top-level port the worker/task engine (C5) drives per client
//! request: hand it the parsed query message, get back a wire-ready answer.
//! `?Send` because every implementation here lives behind `Rc<RefCell<_>>`
//! under the single-threaded concurrency model — there is no executor that
//! could move this future to another thread in the first place.

use async_trait::async_trait;
use hickory_proto::op::Message;
use tern_dns_domain::ResolverError;

#[derive(Debug, Clone)]
pub struct DnsAnswer {
    pub message: Message,
    pub cache_hit: bool,
    /// Outbound transport the final answer should use if it doesn't fit a
    /// single UDP datagram's advertised size.
    pub truncated: bool,
}

#[async_trait(?Send)]
pub trait DnsEngine {
    /// Drive a single client request to completion: `resolve_begin` ->
    /// repeated `produce`/I/O/`consume` -> `DONE`/`FAIL`. Sub-query I/O is
    /// performed internally by the engine's worker/task machinery; this
    /// port only exposes the request-level boundary C6 needs.
    async fn resolve(&self, query: &Message) -> Result<DnsAnswer, ResolverError>;
}
