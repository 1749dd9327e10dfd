use serde::{Deserialize, Serialize};

/// Listening endpoints the network component opens at startup. `listen`/
/// `close` can still add or remove endpoints later through the runtime's own
/// call surface; these are only the ones brought up on boot.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub udp: bool,

    #[serde(default = "default_true")]
    pub tcp: bool,

    #[serde(default = "default_tcp_backlog")]
    pub tcp_backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: default_port(),
            udp: true,
            tcp: true,
            tcp_backlog: default_tcp_backlog(),
        }
    }
}

fn default_port() -> u16 {
    53
}

fn default_true() -> bool {
    true
}

fn default_tcp_backlog() -> u32 {
    16
}
