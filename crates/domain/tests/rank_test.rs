use tern_dns_domain::Rank;

#[test]
fn full_ordering_axiom_chain() {
    // Invariant 10 (§8): SECURE > AUTH > NONAUTH > INSECURE > BAD;
    // AUTH_INSECURE > AUTH; NONAUTH_SECURE > AUTH.
    assert!(Rank::Secure > Rank::Auth);
    assert!(Rank::Auth > Rank::NonAuth);
    assert!(Rank::NonAuth > Rank::Insecure);
    assert!(Rank::Insecure > Rank::Bad);
    assert!(Rank::AuthInsecure > Rank::Auth);
    assert!(Rank::NonAuthSecure > Rank::Auth);
}

#[test]
fn rank_monotonicity_on_replace() {
    // Invariant 3 (§8): insertion with rank < existing.rank on a live entry
    // must leave the existing entry unchanged — modeled here as a pure
    // predicate the cache consults before ever touching storage.
    assert!(!Rank::Bad.may_replace(Rank::Secure));
    assert!(!Rank::NonAuth.may_replace(Rank::Auth));
    assert!(Rank::Secure.may_replace(Rank::Bad));
    assert!(Rank::Auth.may_replace(Rank::Auth));
}
