use serde::{Deserialize, Serialize};

/// The resolver core's tunable constants (§4.4/§4.5/§5). Field names follow
/// the constant names used in prose so config and design doc stay easy to
/// cross-reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    #[serde(default = "default_iter_limit")]
    pub iter_limit: u32,

    #[serde(default = "default_rtt_max_ms")]
    pub rtt_max_ms: u64,

    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,

    #[serde(default = "default_max_pending")]
    pub max_pending: u32,

    #[serde(default = "default_k_addresses")]
    pub k_addresses: u32,

    #[serde(default = "default_concurrent_threshold")]
    pub concurrent_threshold: u32,

    #[serde(default = "default_mp_freelist_size")]
    pub mp_freelist_size: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            iter_limit: default_iter_limit(),
            rtt_max_ms: default_rtt_max_ms(),
            retry_ms: default_retry_ms(),
            max_pending: default_max_pending(),
            k_addresses: default_k_addresses(),
            concurrent_threshold: default_concurrent_threshold(),
            mp_freelist_size: default_mp_freelist_size(),
        }
    }
}

fn default_iter_limit() -> u32 {
    50
}

fn default_rtt_max_ms() -> u64 {
    2000
}

fn default_retry_ms() -> u64 {
    250
}

fn default_k_addresses() -> u32 {
    4
}

/// `MAX_PENDING = 1.5 * K`.
fn default_max_pending() -> u32 {
    (default_k_addresses() as f64 * 1.5) as u32
}

fn default_concurrent_threshold() -> u32 {
    2000
}

fn default_mp_freelist_size() -> u32 {
    8
}
