//! Canonical DNS names and the 0x20 case-randomization secret.
//!
//! `Name` stores the canonical *lowercase* presentation form (dot-separated
//! labels, no trailing root dot) the way the rest of the resolver compares
//! and hashes names. Wire (de)serialization is left to `hickory-proto`
//! elsewhere in the workspace — this type only owns the invariants
//! `spec.md` §3 actually cares about: canonical lowercasing, the 255-byte
//! wire cap, and label-reversal for cache-key zone locality.

use compact_str::CompactString;
use std::fmt;

/// Maximum encoded wire length of a domain name (RFC 1035 §3.1).
pub const MAX_WIRE_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    /// Canonical lowercase presentation form, labels separated by `.`,
    /// no trailing dot (the root name is the empty string).
    canonical: CompactString,
}

#[derive(Debug)]
pub enum NameError {
    TooLong(usize),
    EmptyLabel,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::TooLong(n) => write!(f, "name exceeds {} wire bytes ({})", MAX_WIRE_LEN, n),
            NameError::EmptyLabel => write!(f, "name contains an empty interior label"),
        }
    }
}

impl std::error::Error for NameError {}

impl Name {
    pub fn root() -> Self {
        Self {
            canonical: CompactString::new(""),
        }
    }

    /// Parse and lowercase a presentation-form name, trimming any trailing root dot.
    pub fn parse(input: &str) -> Result<Self, NameError> {
        let trimmed = input.trim_end_matches('.');
        let wire_len = Self::estimate_wire_len(trimmed);
        if wire_len > MAX_WIRE_LEN {
            return Err(NameError::TooLong(wire_len));
        }
        if trimmed.split('.').any(|label| label.is_empty()) && !trimmed.is_empty() {
            return Err(NameError::EmptyLabel);
        }
        Ok(Self {
            canonical: CompactString::from(trimmed.to_ascii_lowercase()),
        })
    }

    fn estimate_wire_len(presentation: &str) -> usize {
        if presentation.is_empty() {
            return 1; // root: single zero-length-label octet
        }
        presentation.split('.').map(|l| l.len() + 1).sum::<usize>() + 1
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    pub fn is_root(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Labels from leaf to root (presentation order), e.g. `a.b.example.` -> `["a", "b", "example"]`.
    pub fn labels(&self) -> Vec<&str> {
        if self.canonical.is_empty() {
            Vec::new()
        } else {
            self.canonical.split('.').collect()
        }
    }

    /// The immediate parent name, or `None` for the root.
    pub fn parent(&self) -> Option<Name> {
        if self.is_root() {
            return None;
        }
        match self.canonical.split_once('.') {
            Some((_, rest)) => Some(Name {
                canonical: CompactString::from(rest),
            }),
            None => Some(Name::root()),
        }
    }

    /// True if `self` is equal to or a subdomain of `other`.
    pub fn is_subdomain_of(&self, other: &Name) -> bool {
        if other.is_root() {
            return true;
        }
        self.canonical == other.canonical
            || self
                .canonical
                .ends_with(&format!(".{}", other.canonical.as_str()))
    }

    /// Label-reversed key for cache storage: root, then TLD, then subdomains,
    /// so that a prefix scan of the underlying store groups a zone together.
    /// `label_reverse ∘ label_reverse = id` (the round-trip law in §8).
    pub fn label_reverse_key(&self) -> CompactString {
        if self.canonical.is_empty() {
            return CompactString::new("\u{0}");
        }
        let mut labels: Vec<&str> = self.canonical.split('.').collect();
        labels.reverse();
        let mut out = CompactString::with_capacity(self.canonical.len() + labels.len());
        for label in labels {
            out.push('\u{0}');
            out.push_str(label);
        }
        out
    }

    /// Inverse of `label_reverse_key`: recovers the canonical presentation name.
    pub fn from_label_reverse_key(key: &str) -> Name {
        let labels: Vec<&str> = key.split('\u{0}').filter(|s| !s.is_empty()).collect();
        if labels.is_empty() {
            return Name::root();
        }
        let mut rev = labels;
        rev.reverse();
        Name {
            canonical: CompactString::from(rev.join(".")),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.canonical.is_empty() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.canonical)
        }
    }
}

/// Per-query 0x20 case-randomization secret (shared between a leader task and,
/// per §9's resolution of the documented ambiguity, a freshly minted copy for
/// each follower rather than a single shared single-shot secret).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseSecret(pub u64);

impl CaseSecret {
    pub fn fresh() -> Self {
        Self(fastrand::u64(..))
    }

    /// Apply 0x20 mixed-case randomization to a presentation-form name using
    /// this secret as the per-label coin flip source.
    pub fn randomize_case(&self, name: &Name) -> String {
        let mut mask = self.0;
        let mut out = String::with_capacity(name.as_str().len());
        for c in name.as_str().chars() {
            if c.is_ascii_alphabetic() {
                let bit = mask & 1;
                mask = mask.rotate_left(1);
                if bit == 1 {
                    out.push(c.to_ascii_uppercase());
                } else {
                    out.push(c.to_ascii_lowercase());
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    /// First 96 bits used as part of the subrequest dedup fingerprint (the
    /// key is `(qname, qtype, qclass)` plus this secret's leading 96 bits per
    /// §4.5 — since the secret here is a u64 the full value stands in for it).
    pub fn fingerprint_bits(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lowercases_and_trims_root_dot() {
        let n = Name::parse("WWW.Example.COM.").unwrap();
        assert_eq!(n.as_str(), "www.example.com");
    }

    #[test]
    fn rejects_too_long_names() {
        let long_label = "a".repeat(250);
        let name = format!("{}.example.com", long_label);
        assert!(Name::parse(&name).is_err());
    }

    #[test]
    fn label_reverse_round_trips() {
        let n = Name::parse("a.b.example.com").unwrap();
        let key = n.label_reverse_key();
        let back = Name::from_label_reverse_key(&key);
        assert_eq!(n, back);
    }

    #[test]
    fn label_reverse_orders_root_then_tld_then_subdomains() {
        let a = Name::parse("x.example.com").unwrap().label_reverse_key();
        let b = Name::parse("y.example.com").unwrap().label_reverse_key();
        // Shared zone suffix ("com", "example") sorts as a common prefix.
        let common: usize = a
            .chars()
            .zip(b.chars())
            .take_while(|(x, y)| x == y)
            .count();
        assert!(common > 0);
    }

    #[test]
    fn is_subdomain_of_respects_boundaries() {
        let child = Name::parse("a.example.com").unwrap();
        let parent = Name::parse("example.com").unwrap();
        let other = Name::parse("notexample.com").unwrap();
        assert!(child.is_subdomain_of(&parent));
        assert!(!other.is_subdomain_of(&parent));
        assert!(parent.is_subdomain_of(&Name::root()));
    }

    #[test]
    fn parent_walks_up_to_root() {
        let n = Name::parse("a.example.com").unwrap();
        let p1 = n.parent().unwrap();
        assert_eq!(p1.as_str(), "example.com");
        let p2 = p1.parent().unwrap();
        assert_eq!(p2.as_str(), "com");
        let p3 = p2.parent().unwrap();
        assert!(p3.is_root());
        assert!(p3.parent().is_none());
    }
}
