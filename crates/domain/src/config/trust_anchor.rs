use serde::{Deserialize, Serialize};

/// Configuration for the RFC 5011 state machine (§9) that drives the
/// trust-anchor store's add/del lifecycle.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrustAnchorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds a candidate/missing/revoked key must sit before advancing
    /// state (`HOLD_DOWN` in §9). RFC 5011 recommends 30 days; this is
    /// configurable mainly so tests don't have to wait a month.
    #[serde(default = "default_hold_down_secs")]
    pub hold_down_secs: u64,

    /// Whether to seed the store with the compiled-in root hint trust anchor
    /// at startup, or start empty and rely on `add` calls from the control
    /// surface.
    #[serde(default = "default_true")]
    pub seed_root_anchor: bool,
}

impl Default for TrustAnchorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hold_down_secs: default_hold_down_secs(),
            seed_root_anchor: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_hold_down_secs() -> u64 {
    30 * 24 * 60 * 60
}
