pub mod coarse_clock;
pub mod kv;

pub use coarse_clock::{coarse_now_secs, tick};
pub use kv::{InMemoryKv, CACHE_VERSION};
