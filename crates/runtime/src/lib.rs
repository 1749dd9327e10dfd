//! Concrete implementations of the ports `tern-dns-application` declares:
//! the in-process cache backend, the layer pipeline's three stock layers,
//! the iterator/resolver core, the worker/task engine, the network
//! endpoints, the trust-anchor store, and the wire (de)serialization glue
//! around `hickory-proto`.
//!
//! Everything here runs on a single-threaded `tokio` `current_thread`
//! runtime driving one `LocalSet` (§5): shared state is `Rc<RefCell<_>>`,
//! never `Arc<Mutex/RwLock>`, because there is exactly one task polling at
//! a time.

pub mod cache;
pub mod network;
pub mod resolver;
pub mod trust_anchor;
pub mod wire;
pub mod worker;
