//! Endpoint value types: the address → socket-set bookkeeping the network
//! component (C6) owns. This module holds only the value types; binding and
//! I/O live in `tern-dns-runtime`.

use std::fmt;
use std::net::IpAddr;

macro_rules! bitflags_simple {
    (
        pub struct $name:ident: $ty:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name($ty);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            pub fn empty() -> Self {
                $name(0)
            }

            pub fn contains(&self, other: $name) -> bool {
                (self.0 & other.0) == other.0
            }

            pub fn union(self, other: $name) -> $name {
                $name(self.0 | other.0)
            }
        }
    };
}

bitflags_simple! {
    pub struct ProtocolFlags: u8 {
        const UDP = 0x01;
        const TCP = 0x02;
    }
}

/// One listening port on one address, with the protocols it was opened for.
/// Socket handles themselves are owned by the runtime's network component;
/// this value only describes *what* is supposed to be listening.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    pub address: IpAddr,
    pub port: u16,
    pub protocols: ProtocolFlags,
}

impl EndpointDescriptor {
    pub fn new(address: IpAddr, port: u16, protocols: ProtocolFlags) -> Self {
        Self {
            address,
            port,
            protocols,
        }
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn protocol_flags_union_and_contains() {
        let both = ProtocolFlags::UDP.union(ProtocolFlags::TCP);
        assert!(both.contains(ProtocolFlags::UDP));
        assert!(both.contains(ProtocolFlags::TCP));
        assert!(!ProtocolFlags::UDP.contains(ProtocolFlags::TCP));
    }

    #[test]
    fn descriptor_displays_host_colon_port() {
        let d = EndpointDescriptor::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 53, ProtocolFlags::UDP);
        assert_eq!(d.to_string(), "127.0.0.1:53");
    }
}
