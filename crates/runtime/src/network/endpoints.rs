//! The network component (C6): an address-bucketed table of listening
//! endpoints, with `listen`/`close`/`list`/`deinit` over it (§4.6). Grounded
//! on the teacher's `JobRunner::with_shutdown_token` + `CancellationToken`
//! pattern (`crates/jobs/src/runner.rs`) for promptly stopping a listening
//! loop on `close`, rather than waiting for its next `recv_from`/`accept` to
//! merely notice a closed flag.

use std::cell::{Cell, RefCell};
use std::net::{IpAddr, SocketAddr};
use std::rc::Rc;

use hickory_proto::op::Message;
use rustc_hash::FxHashMap;
use tern_dns_application::HandleQueryUseCase;
use tern_dns_domain::{EndpointDescriptor, ProtocolFlags, ResolverError};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::listener::{read_framed_message, write_framed_message, TcpListenerEndpoint, UdpListenerEndpoint};

struct EndpointEntry {
    descriptor: EndpointDescriptor,
    cancel: CancellationToken,
}

/// Malformed or response-flagged (`QR=1`) packets dropped on intake (§4.5),
/// counted the same plain-`Cell` way `WorkerStats` counts its own events.
#[derive(Debug, Default)]
pub struct IntakeStats {
    dropped: Cell<u64>,
}

impl IntakeStats {
    pub fn record_dropped(&self) {
        self.dropped.set(self.dropped.get() + 1);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }
}

/// Owns every socket the resolver currently has open for client queries,
/// bucketed by address the way the listening side of a DNS server's
/// configuration is naturally keyed (one address can host several ports).
pub struct NetworkEndpoints {
    table: RefCell<FxHashMap<IpAddr, Vec<EndpointEntry>>>,
    handler: Rc<HandleQueryUseCase>,
    stats: Rc<IntakeStats>,
}

impl NetworkEndpoints {
    pub fn new(handler: Rc<HandleQueryUseCase>) -> Self {
        Self { table: RefCell::new(FxHashMap::default()), handler, stats: Rc::new(IntakeStats::default()) }
    }

    pub fn stats(&self) -> &IntakeStats {
        &self.stats
    }

    /// Open `port` on `address` for the requested `protocols`, spawning a
    /// `spawn_local` dispatch loop per protocol. Returns `Invalid` if this
    /// exact `(address, port)` is already listening.
    pub async fn listen(
        &self,
        address: IpAddr,
        port: u16,
        protocols: ProtocolFlags,
        tcp_backlog: u32,
    ) -> Result<(), ResolverError> {
        if self.find(address, port).is_some() {
            return Err(ResolverError::Invalid);
        }

        let cancel = CancellationToken::new();
        let sock_addr = SocketAddr::new(address, port);

        if protocols.contains(ProtocolFlags::UDP) {
            let udp = Rc::new(UdpListenerEndpoint::bind(sock_addr)?);
            let token = cancel.clone();
            let handler = self.handler.clone();
            let stats = self.stats.clone();
            tokio::task::spawn_local(run_udp(udp, handler, stats, token));
        }

        if protocols.contains(ProtocolFlags::TCP) {
            let tcp = TcpListenerEndpoint::bind(sock_addr, tcp_backlog).await?;
            let token = cancel.clone();
            let handler = self.handler.clone();
            let stats = self.stats.clone();
            tokio::task::spawn_local(run_tcp(tcp, handler, stats, token));
        }

        self.table
            .borrow_mut()
            .entry(address)
            .or_default()
            .push(EndpointEntry { descriptor: EndpointDescriptor::new(address, port, protocols), cancel });
        Ok(())
    }

    /// Stop and remove the endpoint at `(address, port)`. Cancels its
    /// dispatch loop(s) via the stored token rather than letting them block
    /// on their next `recv_from`/`accept` indefinitely.
    pub fn close(&self, address: IpAddr, port: u16) -> Result<(), ResolverError> {
        let mut table = self.table.borrow_mut();
        let Some(bucket) = table.get_mut(&address) else {
            return Err(ResolverError::NoEnt);
        };
        let Some(idx) = bucket.iter().position(|e| e.descriptor.port == port) else {
            return Err(ResolverError::NoEnt);
        };
        let entry = bucket.remove(idx);
        entry.cancel.cancel();
        if bucket.is_empty() {
            table.remove(&address);
        }
        Ok(())
    }

    /// Every endpoint currently listening, in no particular order.
    pub fn list(&self) -> Vec<EndpointDescriptor> {
        self.table
            .borrow()
            .values()
            .flat_map(|bucket| bucket.iter().map(|e| e.descriptor.clone()))
            .collect()
    }

    /// Stop and drop every endpoint, e.g. on shutdown.
    pub fn deinit(&self) {
        let mut table = self.table.borrow_mut();
        for bucket in table.values() {
            for entry in bucket {
                entry.cancel.cancel();
            }
        }
        table.clear();
    }

    fn find(&self, address: IpAddr, port: u16) -> Option<EndpointDescriptor> {
        self.table
            .borrow()
            .get(&address)
            .and_then(|bucket| bucket.iter().find(|e| e.descriptor.port == port))
            .map(|e| e.descriptor.clone())
    }
}

/// One query at a time on the single-threaded event loop, but each query's
/// own resolution can still interleave with others at its `await` points
/// (§5) — `spawn_local` per datagram lets an in-flight query that's waiting
/// on a nameserver not block the next client's request from starting.
async fn run_udp(
    listener: Rc<UdpListenerEndpoint>,
    handler: Rc<HandleQueryUseCase>,
    stats: Rc<IntakeStats>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; 4096];
    loop {
        let (n, from) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = listener.recv_from(&mut buf) => match result {
                Ok(pair) => pair,
                Err(err) => {
                    error!(?err, "udp recv error");
                    continue;
                }
            },
        };

        let Ok(query) = Message::from_vec(&buf[..n]) else {
            stats.record_dropped();
            debug!(%from, "dropping unparseable udp datagram");
            continue;
        };
        if query.message_type() == hickory_proto::op::MessageType::Response {
            stats.record_dropped();
            debug!(%from, "dropping response-flagged packet on a listening socket");
            continue;
        }

        let handler = handler.clone();
        let listener = listener.clone();
        tokio::task::spawn_local(async move {
            let response = handler.execute(&query).await;
            if let Ok(wire) = response.to_vec() {
                if let Err(err) = listener.send_to(&wire, from).await {
                    warn!(?err, %from, "failed to send udp response");
                }
            }
        });
    }
}

async fn run_tcp(
    listener: TcpListenerEndpoint,
    handler: Rc<HandleQueryUseCase>,
    stats: Rc<IntakeStats>,
    cancel: CancellationToken,
) {
    loop {
        let (mut stream, from) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = listener.accept() => match result {
                Ok(pair) => pair,
                Err(err) => {
                    error!(?err, "tcp accept error");
                    continue;
                }
            },
        };

        let handler = handler.clone();
        let stats = stats.clone();
        tokio::task::spawn_local(async move {
            if let Err(err) = serve_tcp_connection(&mut stream, &handler, &stats, from).await {
                debug!(?err, %from, "tcp connection closed");
            }
        });
    }
}

async fn serve_tcp_connection(
    stream: &mut TcpStream,
    handler: &HandleQueryUseCase,
    stats: &IntakeStats,
    from: SocketAddr,
) -> Result<(), ResolverError> {
    loop {
        let bytes = read_framed_message(stream).await?;
        let query = match Message::from_vec(&bytes) {
            Ok(query) => query,
            Err(_) => {
                stats.record_dropped();
                debug!(%from, "dropping unparseable tcp message");
                return Ok(());
            }
        };
        if query.message_type() == hickory_proto::op::MessageType::Response {
            stats.record_dropped();
            debug!(%from, "dropping response-flagged packet on a listening socket");
            return Ok(());
        }
        let response = handler.execute(&query).await;
        let wire = response.to_vec().map_err(|_| ResolverError::Proto)?;
        write_framed_message(stream, &wire).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddr as StdSocketAddr};
    use tern_dns_application::ports::{DnsAnswer, DnsEngine};
    use tern_dns_domain::ResolverError as DomainError;

    struct StubEngine;

    #[async_trait::async_trait(?Send)]
    impl DnsEngine for StubEngine {
        async fn resolve(&self, _query: &Message) -> Result<DnsAnswer, DomainError> {
            Err(DomainError::NoEnt)
        }
    }

    fn handler() -> Rc<HandleQueryUseCase> {
        let engine: Rc<dyn DnsEngine> = Rc::new(StubEngine);
        Rc::new(HandleQueryUseCase::new(engine))
    }

    /// Port 0 asks the OS for an ephemeral port; read it back via an
    /// independent bind so this test never collides with another listener.
    fn loopback_addr() -> (IpAddr, u16) {
        let probe = std::net::UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let StdSocketAddr::V4(addr) = probe.local_addr().unwrap() else { unreachable!() };
        drop(probe);
        (IpAddr::V4(*addr.ip()), addr.port())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn close_after_listen_removes_the_endpoint_from_list() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let network = NetworkEndpoints::new(handler());
                let (address, port) = loopback_addr();

                network.listen(address, port, ProtocolFlags::UDP, 16).await.unwrap();
                assert!(network.list().iter().any(|e| e.address == address && e.port == port));

                network.close(address, port).unwrap();
                assert!(!network.list().iter().any(|e| e.address == address && e.port == port));
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn close_of_an_unknown_endpoint_is_an_error() {
        let network = NetworkEndpoints::new(handler());
        assert!(network.close(IpAddr::V4(Ipv4Addr::LOCALHOST), 1).is_err());
    }
}
