//! Network endpoints (C6): upstream sends to elected nameservers (one
//! ephemeral UDP socket per attempt, or a length-prefixed TCP stream on
//! fallback), and the listening UDP/TCP endpoints client requests arrive on.

pub mod endpoints;
pub mod listener;
pub mod upstream;

pub use endpoints::{IntakeStats, NetworkEndpoints};
pub use listener::{TcpListenerEndpoint, UdpListenerEndpoint};
pub use upstream::{send_datagram, send_stream};
