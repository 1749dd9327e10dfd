//! The three stock layers (§4.3): cache (first on produce/consume),
//! iterator (referrals/glue/CNAME/NXDOMAIN), and validator (a no-op outside
//! trust-anchor-covered ancestries).

pub mod cache_layer;
pub mod iterator_layer;
pub mod validator_layer;

pub use cache_layer::CacheLayer;
pub use iterator_layer::IteratorLayer;
pub use validator_layer::ValidatorLayer;
