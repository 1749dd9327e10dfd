//! Port over the trust-anchor store (C7), so the validator layer depends on
//! a capability rather than the concrete RFC 5011 state machine.

use tern_dns_domain::{Name, RRSet, ResolverError};

pub trait TrustAnchorPort {
    fn add(&mut self, name: &Name, rrset: RRSet) -> Result<(), ResolverError>;
    fn get(&self, name: &Name) -> Option<RRSet>;
    /// True iff the store has an entry at `name` or any of its ancestors.
    fn covers(&self, name: &Name) -> bool;
    fn del(&mut self, name: &Name);
    fn clear(&mut self);
}

/// DNSSEC signature verification itself is out of scope (§1): only the
/// layer contract is specified. A real crypto backend implements this
/// trait; the validator layer depends only on the trait.
pub trait DnssecVerifier {
    fn verify_rrsig(&self, rrset_wire: &[u8], rrsig_wire: &[u8], dnskey_wire: &[u8]) -> bool;
}
