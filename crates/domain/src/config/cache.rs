use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_shard_amount")]
    pub shard_amount: usize,

    #[serde(default = "default_batch_eviction_percentage")]
    pub batch_eviction_percentage: f64,

    #[serde(default = "default_compaction_interval_secs")]
    pub compaction_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            shard_amount: default_shard_amount(),
            batch_eviction_percentage: default_batch_eviction_percentage(),
            compaction_interval_secs: default_compaction_interval_secs(),
        }
    }
}

fn default_max_entries() -> usize {
    100_000
}

fn default_shard_amount() -> usize {
    16
}

fn default_batch_eviction_percentage() -> f64 {
    0.1
}

fn default_compaction_interval_secs() -> u64 {
    300
}
