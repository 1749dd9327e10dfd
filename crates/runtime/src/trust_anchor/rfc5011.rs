//! The RFC 5011 trust-anchor rollover state machine (§9):
//! `Start -> AddPend -> Valid`, `Valid -> Missing -> Removed`, and
//! `Valid -> Revoked -> Removed`, each transition gated by a hold-down timer
//! so a single observation can never flip a key's trust status.
//!
//! This machine only decides *when* to call `TrustAnchorPort::add`/`del`; it
//! holds no DNSKEY bytes itself; the store above is the thing callers
//! actually read from.

use std::collections::HashMap;

use tern_dns_domain::Name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorState {
    Start,
    AddPend,
    Valid,
    Missing,
    Revoked,
    Removed,
}

struct TrackedKey {
    state: AnchorState,
    added_at: u64,
    hold_down_until: u64,
}

/// One machine per trust-point name, tracking every key tag seen for it.
pub struct Rfc5011Machine {
    hold_down_secs: u64,
    keys: HashMap<(Name, u16), TrackedKey>,
}

impl Rfc5011Machine {
    pub fn new(hold_down_secs: u64) -> Self {
        Self { hold_down_secs, keys: HashMap::new() }
    }

    pub fn state(&self, name: &Name, key_tag: u16) -> AnchorState {
        self.keys
            .get(&(name.clone(), key_tag))
            .map(|k| k.state)
            .unwrap_or(AnchorState::Start)
    }

    /// A DNSKEY set refresh observed `key_tag` present at `name`. New keys
    /// enter `AddPend` and must survive one hold-down before `Valid`;
    /// `Missing`/`Revoked` keys seen again revert to `Valid` (RFC 5011 §4.3
    /// "a key reappearing before `Removed` is simply still trusted").
    pub fn observe_present(&mut self, name: &Name, key_tag: u16, now: u64) -> AnchorState {
        let hold_down = self.hold_down_secs;
        let entry = self.keys.entry((name.clone(), key_tag)).or_insert_with(|| TrackedKey {
            state: AnchorState::Start,
            added_at: now,
            hold_down_until: now + hold_down,
        });

        match entry.state {
            AnchorState::Start => {
                entry.state = AnchorState::AddPend;
                entry.added_at = now;
                entry.hold_down_until = now + hold_down;
            }
            AnchorState::AddPend if now >= entry.hold_down_until => {
                entry.state = AnchorState::Valid;
            }
            AnchorState::Missing | AnchorState::Revoked => {
                entry.state = AnchorState::Valid;
            }
            _ => {}
        }
        entry.state
    }

    /// A previously `Valid` key no longer appears in the authoritative
    /// DNSKEY set. Starts (or continues) its hold-down before `Removed`.
    pub fn observe_absent(&mut self, name: &Name, key_tag: u16, now: u64) -> AnchorState {
        let hold_down = self.hold_down_secs;
        let Some(entry) = self.keys.get_mut(&(name.clone(), key_tag)) else {
            return AnchorState::Start;
        };
        match entry.state {
            AnchorState::Valid => {
                entry.state = AnchorState::Missing;
                entry.hold_down_until = now + hold_down;
            }
            AnchorState::Missing if now >= entry.hold_down_until => {
                entry.state = AnchorState::Removed;
            }
            _ => {}
        }
        entry.state
    }

    /// The REVOKE bit was observed set on a previously trusted key (RFC
    /// 5011 §6.1): skip `Missing` entirely and start the removal hold-down
    /// immediately.
    pub fn observe_revoked(&mut self, name: &Name, key_tag: u16, now: u64) -> AnchorState {
        let hold_down = self.hold_down_secs;
        let entry = self.keys.entry((name.clone(), key_tag)).or_insert_with(|| TrackedKey {
            state: AnchorState::Valid,
            added_at: now,
            hold_down_until: now,
        });
        match entry.state {
            AnchorState::Removed => {}
            _ => {
                entry.state = AnchorState::Revoked;
                entry.hold_down_until = now + hold_down;
            }
        }
        entry.state
    }

    /// Advance a `Revoked` key to `Removed` once its hold-down has elapsed.
    pub fn tick_revoked(&mut self, name: &Name, key_tag: u16, now: u64) -> AnchorState {
        let Some(entry) = self.keys.get_mut(&(name.clone(), key_tag)) else {
            return AnchorState::Start;
        };
        if entry.state == AnchorState::Revoked && now >= entry.hold_down_until {
            entry.state = AnchorState::Removed;
        }
        entry.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> Name {
        Name::root()
    }

    #[test]
    fn new_key_needs_one_hold_down_before_valid() {
        let mut m = Rfc5011Machine::new(100);
        assert_eq!(m.observe_present(&name(), 1, 0), AnchorState::AddPend);
        assert_eq!(m.observe_present(&name(), 1, 50), AnchorState::AddPend);
        assert_eq!(m.observe_present(&name(), 1, 100), AnchorState::Valid);
    }

    #[test]
    fn missing_then_timeout_reaches_removed() {
        let mut m = Rfc5011Machine::new(100);
        m.observe_present(&name(), 1, 0);
        m.observe_present(&name(), 1, 100);
        assert_eq!(m.state(&name(), 1), AnchorState::Valid);

        assert_eq!(m.observe_absent(&name(), 1, 150), AnchorState::Missing);
        assert_eq!(m.observe_absent(&name(), 1, 200), AnchorState::Missing);
        assert_eq!(m.observe_absent(&name(), 1, 250), AnchorState::Removed);
    }

    #[test]
    fn missing_key_reappearing_goes_straight_back_to_valid() {
        let mut m = Rfc5011Machine::new(100);
        m.observe_present(&name(), 1, 0);
        m.observe_present(&name(), 1, 100);
        m.observe_absent(&name(), 1, 150);
        assert_eq!(m.observe_present(&name(), 1, 160), AnchorState::Valid);
    }

    #[test]
    fn revoked_key_skips_missing_and_removes_after_hold_down() {
        let mut m = Rfc5011Machine::new(100);
        m.observe_present(&name(), 1, 0);
        m.observe_present(&name(), 1, 100);
        assert_eq!(m.observe_revoked(&name(), 1, 110), AnchorState::Revoked);
        assert_eq!(m.tick_revoked(&name(), 1, 150), AnchorState::Revoked);
        assert_eq!(m.tick_revoked(&name(), 1, 210), AnchorState::Removed);
    }
}
