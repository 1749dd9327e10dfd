pub mod cache_port;
pub mod dns_engine;
pub mod layer;
pub mod trust_anchor_port;

pub use cache_port::{CacheStats, KvBackend, PeekResult, Txn};
pub use dns_engine::{DnsAnswer, DnsEngine};
pub use layer::{ConsumeSignal, Layer, LayerOutcome, Transport};
pub use trust_anchor_port::{DnssecVerifier, TrustAnchorPort};
