use std::time::Duration;

use tern_dns_domain::name::CaseSecret;
use tern_dns_domain::{Name, PlanError, RecordType, ResolutionPlan};

fn secret() -> CaseSecret {
    CaseSecret(99)
}

#[test]
fn plan_loop_freedom_after_arbitrary_push_sequence() {
    let mut plan = ResolutionPlan::new();
    let root = plan
        .push(None, Name::parse("example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
        .unwrap();
    let ns = plan
        .push(Some(root), Name::parse("ns1.example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
        .unwrap();
    let cname_target = plan
        .push(Some(ns), Name::parse("cdn.example.net").unwrap(), RecordType::CNAME, Duration::ZERO, secret())
        .unwrap();

    // Invariant 4 (§8): satisfies(tail.parent, tail.triple) must be false
    // for the current tail at every point in the sequence.
    let tail = plan.current().unwrap();
    assert!(!plan.satisfies(tail.parent, &tail.name, tail.rrtype));
    let _ = cname_target;
}

#[test]
fn repeating_an_ancestor_triple_is_rejected_as_a_loop() {
    let mut plan = ResolutionPlan::new();
    let root = plan
        .push(None, Name::parse("a.example.com").unwrap(), RecordType::CNAME, Duration::ZERO, secret())
        .unwrap();
    let child = plan
        .push(Some(root), Name::parse("b.example.com").unwrap(), RecordType::CNAME, Duration::ZERO, secret())
        .unwrap();
    let err = plan.push(Some(child), Name::parse("a.example.com").unwrap(), RecordType::CNAME, Duration::ZERO, secret());
    assert!(matches!(err, Err(PlanError::Loop)));
}

#[test]
fn pop_to_empty_then_push_again_starts_a_fresh_chain() {
    let mut plan = ResolutionPlan::new();
    let root = plan
        .push(None, Name::parse("example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
        .unwrap();
    plan.pop(root);
    assert!(plan.is_empty());

    let root2 = plan
        .push(None, Name::parse("example.com").unwrap(), RecordType::A, Duration::ZERO, secret())
        .unwrap();
    assert_eq!(plan.pending_len(), 1);
    assert_eq!(plan.current().unwrap().id, root2);
}
