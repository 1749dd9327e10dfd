//! The resolver core (C4): owns the cache/trust-anchor/verifier handles a
//! fresh pipeline needs and assembles one per request. Actually driving the
//! produce/I-O/consume loop — the only place that ever awaits anything
//! (§4.3, §5) — lives in the worker/task engine; this module only knows how
//! to build the three stock layers in the right order.

use std::rc::Rc;

use tern_dns_application::ports::{DnssecVerifier, KvBackend, TrustAnchorPort};
use tern_dns_domain::config::ResolverConfig;

use super::layers::{CacheLayer, IteratorLayer, ValidatorLayer};
use super::pipeline::Pipeline;

pub struct ResolverCore {
    kv: Rc<dyn KvBackend>,
    trust_anchors: Rc<dyn TrustAnchorPort>,
    verifier: Option<Rc<dyn DnssecVerifier>>,
    config: ResolverConfig,
}

impl ResolverCore {
    pub fn new(
        kv: Rc<dyn KvBackend>,
        trust_anchors: Rc<dyn TrustAnchorPort>,
        verifier: Option<Rc<dyn DnssecVerifier>>,
        config: ResolverConfig,
    ) -> Self {
        Self { kv, trust_anchors, verifier, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// A fresh three-layer pipeline for one client request: cache first
    /// (short-circuits on a hit), then the iterator (does the actual
    /// network-facing work), then the validator (DNSSEC, currently inert
    /// without a configured verifier).
    pub fn build_pipeline(&self) -> Pipeline {
        let cache_layer = CacheLayer::new(Rc::clone(&self.kv));
        let iterator_layer = IteratorLayer::new(self.config.k_addresses as usize, self.config.max_pending as usize);
        let validator_layer = ValidatorLayer::new(Rc::clone(&self.trust_anchors), self.verifier.clone());
        Pipeline::new(vec![Box::new(cache_layer), Box::new(iterator_layer), Box::new(validator_layer)])
    }
}
