//! Compiled-in root server hints, seeding the zone cut an iterative
//! resolver needs before it has learned anything from the cache. `spec.md`
//! assumes "a configured trust anchor / root set" exists without specifying
//! its contents; this supplies the standard IANA root hint addresses.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tern_dns_domain::query::{NsCandidate, ZoneCut};
use tern_dns_domain::Name;

struct RootServer {
    name: &'static str,
    v4: Ipv4Addr,
    v6: Ipv6Addr,
}

const ROOT_SERVERS: &[RootServer] = &[
    RootServer { name: "a.root-servers.net.", v4: Ipv4Addr::new(198, 41, 0, 4), v6: Ipv6Addr::new(0x2001, 0x503, 0xba3e, 0, 0, 0, 0x2, 0x30) },
    RootServer { name: "b.root-servers.net.", v4: Ipv4Addr::new(170, 247, 170, 2), v6: Ipv6Addr::new(0x2801, 0x1b8, 0x10, 0, 0, 0, 0, 0xb) },
    RootServer { name: "c.root-servers.net.", v4: Ipv4Addr::new(192, 33, 4, 12), v6: Ipv6Addr::new(0x2001, 0x500, 0x2, 0, 0, 0, 0, 0xc) },
    RootServer { name: "d.root-servers.net.", v4: Ipv4Addr::new(199, 7, 91, 13), v6: Ipv6Addr::new(0x2001, 0x500, 0x2d, 0, 0, 0, 0, 0xd) },
    RootServer { name: "e.root-servers.net.", v4: Ipv4Addr::new(192, 203, 230, 10), v6: Ipv6Addr::new(0x2001, 0x500, 0xa8, 0, 0, 0, 0, 0xe) },
    RootServer { name: "f.root-servers.net.", v4: Ipv4Addr::new(192, 5, 5, 241), v6: Ipv6Addr::new(0x2001, 0x500, 0x2f, 0, 0, 0, 0, 0xf) },
    RootServer { name: "g.root-servers.net.", v4: Ipv4Addr::new(192, 112, 36, 4), v6: Ipv6Addr::new(0x2001, 0x500, 0x12, 0, 0, 0, 0, 0xd0d) },
    RootServer { name: "h.root-servers.net.", v4: Ipv4Addr::new(198, 97, 190, 53), v6: Ipv6Addr::new(0x2001, 0x500, 0x1, 0, 0, 0, 0, 0x53) },
    RootServer { name: "i.root-servers.net.", v4: Ipv4Addr::new(192, 36, 148, 17), v6: Ipv6Addr::new(0x2001, 0x7fe, 0, 0, 0, 0, 0, 0x53) },
    RootServer { name: "j.root-servers.net.", v4: Ipv4Addr::new(192, 58, 128, 30), v6: Ipv6Addr::new(0x2001, 0x503, 0xc27, 0, 0, 0, 0x2, 0x30) },
    RootServer { name: "k.root-servers.net.", v4: Ipv4Addr::new(193, 0, 14, 129), v6: Ipv6Addr::new(0x2001, 0x7fd, 0, 0, 0, 0, 0, 0x1) },
    RootServer { name: "l.root-servers.net.", v4: Ipv4Addr::new(199, 7, 83, 42), v6: Ipv6Addr::new(0x2001, 0x500, 0x9f, 0, 0, 0, 0, 0x42) },
    RootServer { name: "m.root-servers.net.", v4: Ipv4Addr::new(202, 12, 27, 33), v6: Ipv6Addr::new(0x2001, 0xdc3, 0, 0, 0, 0, 0, 0x35) },
];

/// A fresh zone cut anchored at the root, populated with every hint's v4
/// and v6 address so the iterator never needs an `AWAIT_ADDR` sub-query
/// just to reach the root.
pub fn root_zone_cut() -> ZoneCut {
    let root = Name::root();
    let nameservers = ROOT_SERVERS
        .iter()
        .map(|rs| {
            let ns_name = Name::parse(rs.name).expect("root hint names are well-formed");
            let mut ns = NsCandidate::new(ns_name);
            ns.addresses = vec![IpAddr::V4(rs.v4), IpAddr::V6(rs.v6)];
            ns
        })
        .collect();
    ZoneCut {
        owner: root,
        dnskey: None,
        nameservers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_zone_cut_has_all_thirteen_letters_with_addresses() {
        let cut = root_zone_cut();
        assert_eq!(cut.nameservers.len(), 13);
        assert!(cut.nameservers.iter().all(|ns| ns.addresses.len() == 2));
    }
}
