use tern_dns_domain::cache_entry::{CacheKey, Tag};
use tern_dns_domain::{Name, RecordType};

#[test]
fn label_reverse_round_trip_law() {
    // "label-reverse . label-reverse = id" (§8 round-trip laws).
    for presentation in ["example.com", "a.b.c.example.org", "x", ""] {
        let name = Name::parse(presentation).unwrap();
        let reversed = name.label_reverse_key();
        assert_eq!(Name::from_label_reverse_key(&reversed), name);
    }
}

#[test]
fn shared_zone_suffix_groups_under_a_common_prefix() {
    let a = CacheKey::new(Tag::ResourceRecord, &Name::parse("www.example.com").unwrap(), RecordType::A);
    let b = CacheKey::new(Tag::ResourceRecord, &Name::parse("mail.example.com").unwrap(), RecordType::A);
    let unrelated = CacheKey::new(Tag::ResourceRecord, &Name::parse("other.org").unwrap(), RecordType::A);

    let shared_prefix_len = a
        .reversed_name
        .chars()
        .zip(b.reversed_name.chars())
        .take_while(|(x, y)| x == y)
        .count();
    let unrelated_prefix_len = a
        .reversed_name
        .chars()
        .zip(unrelated.reversed_name.chars())
        .take_while(|(x, y)| x == y)
        .count();

    assert!(shared_prefix_len > unrelated_prefix_len);
}

#[test]
fn distinct_rrtypes_are_distinct_keys() {
    let name = Name::parse("example.com").unwrap();
    let a = CacheKey::new(Tag::ResourceRecord, &name, RecordType::A);
    let aaaa = CacheKey::new(Tag::ResourceRecord, &name, RecordType::AAAA);
    assert_ne!(a, aaaa);
}
