//! Trust-anchor store (C7): `add/get/covers/del/clear` over a per-name
//! DS/DNSKEY RRSet map, plus the external RFC 5011 state machine that drives
//! those calls as side effects (§9). Grounded on the teacher's
//! `TrustAnchorStore`/`TrustAnchor` (including its baked-in root KSK-2017
//! anchor and `base64` decoding idiom), generalized from a single hardcoded
//! anchor list to the full lifecycle.

mod rfc5011;
mod root_anchor;

pub use rfc5011::{AnchorState, Rfc5011Machine};

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tern_dns_application::ports::TrustAnchorPort;
use tern_dns_domain::{Name, RRSet, ResolverError};

/// In-process `TrustAnchorPort`: a flat map keyed on owner name. `covers`
/// walks the name's ancestor chain the same way `ResolutionPlan::satisfies`
/// walks a query's parent chain, reusing `Name::parent()`.
pub struct TrustAnchorStore {
    anchors: RefCell<FxHashMap<Name, RRSet>>,
}

impl TrustAnchorStore {
    pub fn empty() -> Self {
        Self { anchors: RefCell::new(FxHashMap::default()) }
    }

    /// Seed the store with the compiled-in root KSK-2017 anchor, matching
    /// the teacher's `TrustAnchorStore::new`/`default_root_anchors`.
    pub fn with_root_anchor() -> Self {
        let store = Self::empty();
        let (name, rrset) = root_anchor::root_ksk_2017();
        store.anchors.borrow_mut().insert(name, rrset);
        store
    }

    pub fn into_rc(self) -> Rc<dyn TrustAnchorPort> {
        Rc::new(self)
    }
}

impl TrustAnchorPort for TrustAnchorStore {
    fn add(&mut self, name: &Name, rrset: RRSet) -> Result<(), ResolverError> {
        self.anchors.borrow_mut().insert(name.clone(), rrset);
        Ok(())
    }

    fn get(&self, name: &Name) -> Option<RRSet> {
        self.anchors.borrow().get(name).cloned()
    }

    fn covers(&self, name: &Name) -> bool {
        let anchors = self.anchors.borrow();
        if anchors.contains_key(name) {
            return true;
        }
        let mut cursor = name.clone();
        while let Some(parent) = cursor.parent() {
            if anchors.contains_key(&parent) {
                return true;
            }
            cursor = parent;
        }
        false
    }

    fn del(&mut self, name: &Name) {
        self.anchors.borrow_mut().remove(name);
    }

    fn clear(&mut self) {
        self.anchors.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_dns_domain::RecordType;

    #[test]
    fn covers_matches_the_anchor_itself_and_its_descendants() {
        let mut store = TrustAnchorStore::empty();
        let owner = Name::parse("example.com").unwrap();
        let rrset = RRSet::new(owner.clone(), RecordType::DS, 3600, vec![]);
        store.add(&owner, rrset).unwrap();

        assert!(store.covers(&Name::parse("example.com").unwrap()));
        assert!(store.covers(&Name::parse("www.example.com").unwrap()));
        assert!(!store.covers(&Name::parse("example.org").unwrap()));
    }

    #[test]
    fn del_removes_the_anchor() {
        let mut store = TrustAnchorStore::empty();
        let owner = Name::parse("example.com").unwrap();
        store.add(&owner, RRSet::new(owner.clone(), RecordType::DS, 3600, vec![])).unwrap();
        store.del(&owner);
        assert!(!store.covers(&owner));
    }

    #[test]
    fn with_root_anchor_covers_everything() {
        let store = TrustAnchorStore::with_root_anchor();
        assert!(store.covers(&Name::parse("example.com").unwrap()));
        assert!(store.covers(&Name::root()));
    }
}
