//! Pure value types and logic shared by the resolver: names, cache entry
//! keys, ranks, resolution-plan nodes, endpoints, the error taxonomy, and
//! configuration. No I/O, no async runtime — that lives in
//! `tern-dns-application` (ports/use-cases) and `tern-dns-runtime`
//! (infrastructure).

pub mod cache_entry;
pub mod config;
pub mod endpoint;
pub mod errors;
pub mod name;
pub mod plan;
pub mod query;
pub mod rank;
pub mod record_type;

pub use cache_entry::{CacheEntryHeader, CacheKey, CachedData, RRSet, Tag};
pub use config::Config;
pub use endpoint::{EndpointDescriptor, ProtocolFlags};
pub use errors::ResolverError;
pub use name::{CaseSecret, Name};
pub use plan::{PlanError, ResolutionPlan};
pub use query::{NsCandidate, Query, QueryFlags, QueryId, ZoneCut};
pub use rank::Rank;
pub use record_type::RecordType;
