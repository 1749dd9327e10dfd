//! Resolution plan (C2): the pending/resolved query queues for one request.
//!
//! Pure value-level logic, no I/O — the way the teacher keeps logic like
//! `RecordType::is_trust_anchor_material` or conditional-forward matching in
//! `domain` rather than `infrastructure`.

use crate::name::Name;
use crate::query::{Query, QueryId};
use crate::record_type::RecordType;
use std::time::Duration;

#[derive(Debug)]
pub enum PlanError {
    /// (I-RP2) an ancestor already seeks the same `(name, type)` triple.
    Loop,
}

/// Stack of outstanding sub-queries plus a history of resolved ones, for a
/// single client request.
#[derive(Debug, Default)]
pub struct ResolutionPlan {
    pending: Vec<Query>,
    resolved: Vec<Query>,
    next_id: u64,
}

impl ResolutionPlan {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            resolved: Vec::new(),
            next_id: 1,
        }
    }

    /// (I-RP1) every non-root query has a parent in either list.
    fn has_query(&self, id: QueryId) -> bool {
        self.pending.iter().any(|q| q.id == id) || self.resolved.iter().any(|q| q.id == id)
    }

    /// `satisfies(ancestor_chain, name, class, type)`: walk the parent chain
    /// starting at `start`, returning true if any ancestor's sought triple
    /// matches `(name, rrtype)`. Class is fixed to IN throughout this crate
    /// (the only class the wire layer constructs), so it is not threaded
    /// through separately.
    pub fn satisfies(&self, start: Option<QueryId>, name: &Name, rrtype: RecordType) -> bool {
        let mut cursor = start;
        while let Some(id) = cursor {
            let Some(q) = self.find(id) else { break };
            if &q.name == name && q.rrtype == rrtype {
                return true;
            }
            cursor = q.parent;
        }
        false
    }

    fn find(&self, id: QueryId) -> Option<&Query> {
        self.pending
            .iter()
            .chain(self.resolved.iter())
            .find(|q| q.id == id)
    }

    /// Allocate a query under `parent`, link it, and push it on `pending`.
    /// Fails with `PlanError::Loop` if an ancestor already seeks the same
    /// triple (I-RP2) — checked here rather than left to the caller, so the
    /// plan itself cannot be pushed into a cycle.
    pub fn push(
        &mut self,
        parent: Option<QueryId>,
        name: Name,
        rrtype: RecordType,
        now: Duration,
        case_secret: crate::name::CaseSecret,
    ) -> Result<QueryId, PlanError> {
        if self.satisfies(parent, &name, rrtype) {
            return Err(PlanError::Loop);
        }
        let id = QueryId(self.next_id);
        self.next_id += 1;
        let query = Query::new(id, parent, name, rrtype, now, case_secret);
        self.pending.push(query);
        Ok(id)
    }

    /// Unlink `id` from `pending` and append it to `resolved`.
    pub fn pop(&mut self, id: QueryId) {
        if let Some(pos) = self.pending.iter().position(|q| q.id == id) {
            let q = self.pending.remove(pos);
            self.resolved.push(q);
        }
    }

    pub fn current(&self) -> Option<&Query> {
        self.pending.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Query> {
        self.pending.last_mut()
    }

    pub fn last_resolved(&self) -> Option<&Query> {
        self.resolved.last()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn get(&self, id: QueryId) -> Option<&Query> {
        self.find(id)
    }

    pub fn get_mut(&mut self, id: QueryId) -> Option<&mut Query> {
        self.pending
            .iter_mut()
            .chain(self.resolved.iter_mut())
            .find(|q| q.id == id)
    }

    /// Every still-pending query whose `parent` is `parent` — used by the
    /// iterator layer to tell whether an `AWAIT_ADDR` query still has
    /// outstanding address sub-queries before clearing the flag.
    pub fn pending_with_parent(&self, parent: QueryId) -> impl Iterator<Item = &Query> {
        self.pending.iter().filter(move |q| q.parent == Some(parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::CaseSecret;

    fn secret() -> CaseSecret {
        CaseSecret(7)
    }

    #[test]
    fn push_root_then_child_links_parent() {
        let mut plan = ResolutionPlan::new();
        let root = plan
            .push(None, Name::parse("example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
            .unwrap();
        let child = plan
            .push(Some(root), Name::parse("ns1.example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
            .unwrap();
        assert_eq!(plan.get(child).unwrap().parent, Some(root));
        assert_eq!(plan.pending_len(), 2);
    }

    #[test]
    fn push_same_triple_as_ancestor_fails_with_loop() {
        let mut plan = ResolutionPlan::new();
        let root = plan
            .push(None, Name::parse("example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
            .unwrap();
        let err = plan.push(Some(root), Name::parse("example.com").unwrap(), RecordType::A, Duration::ZERO, secret());
        assert!(matches!(err, Err(PlanError::Loop)));
    }

    #[test]
    fn pop_moves_query_from_pending_to_resolved() {
        let mut plan = ResolutionPlan::new();
        let root = plan
            .push(None, Name::parse("example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
            .unwrap();
        plan.pop(root);
        assert!(plan.is_empty());
        assert_eq!(plan.last_resolved().unwrap().id, root);
    }

    #[test]
    fn current_is_the_pending_tail() {
        let mut plan = ResolutionPlan::new();
        let root = plan
            .push(None, Name::parse("example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
            .unwrap();
        let child = plan
            .push(Some(root), Name::parse("ns1.example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
            .unwrap();
        assert_eq!(plan.current().unwrap().id, child);
    }
}
