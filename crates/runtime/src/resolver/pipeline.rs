//! Drives the layer pipeline (C3) on behalf of the iterator/resolver core
//! (C4): `begin` once, a `produce` loop that asks each layer in turn until
//! one yields something other than `Noop`, and a `consume` pass that lets
//! every layer see a response in order before the plan's current query is
//! re-examined.

use tern_dns_application::ports::layer::{ConsumeSignal, Layer, LayerOutcome};
use tern_dns_domain::{ResolutionPlan, ResolverError};

pub struct Pipeline {
    layers: Vec<Box<dyn Layer>>,
}

impl Pipeline {
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Self {
        Self { layers }
    }

    pub fn begin(&mut self, plan: &mut ResolutionPlan) {
        for layer in &mut self.layers {
            layer.begin(plan);
        }
    }

    pub fn reset(&mut self, plan: &mut ResolutionPlan) {
        for layer in &mut self.layers {
            layer.reset(plan);
        }
    }

    pub fn finish(&mut self, plan: &mut ResolutionPlan) {
        for layer in &mut self.layers {
            layer.finish(plan);
        }
    }

    pub fn fail(&mut self, plan: &mut ResolutionPlan, err: ResolverError) {
        for layer in &mut self.layers {
            layer.fail(plan, err);
        }
    }

    /// Cache layer is conventionally first and short-circuits on a hit;
    /// the iterator layer is the one that actually builds an outbound
    /// packet. First layer to answer with something other than `Noop`
    /// wins; if every layer passes, the plan has nothing left to produce.
    pub fn produce(&mut self, plan: &mut ResolutionPlan) -> LayerOutcome {
        for layer in &mut self.layers {
            match layer.produce(plan) {
                LayerOutcome::Noop => continue,
                other => return other,
            }
        }
        LayerOutcome::Noop
    }

    /// Every layer gets a chance to react to the same response: the cache
    /// layer records new data (and reports `Noop`, deferring a verdict),
    /// the iterator layer resolves referrals/CNAME/NXDOMAIN against the
    /// current query, the validator layer checks signatures where it
    /// applies. The first layer to report a terminal outcome wins.
    pub fn consume(&mut self, plan: &mut ResolutionPlan, signal: ConsumeSignal<'_>) -> LayerOutcome {
        for layer in &mut self.layers {
            match layer.consume(plan, signal) {
                LayerOutcome::Noop => continue,
                other => return other,
            }
        }
        LayerOutcome::Noop
    }
}
