//! Sends one wire query to one candidate nameserver address and returns the
//! raw response bytes, or a timeout/I-O error. Grounded on the teacher's
//! `UdpTransport::send` (ephemeral bind, `tokio::time::timeout` wrapping
//! both send and recv, source-address sanity check) (§4.6), with a TCP
//! sibling for the RFC 1035 length-prefixed fallback transport.

use std::net::SocketAddr;
use std::time::Duration;

use tern_dns_domain::ResolverError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

/// Matches the outgoing buffer sizing policy from §6: "outgoing buffer =
/// max(configured EDNS payload, 4096)".
pub const MAX_RESPONSE_SIZE: usize = 4096;

fn ephemeral_bind_addr(peer: SocketAddr) -> SocketAddr {
    if peer.is_ipv4() {
        "0.0.0.0:0".parse().unwrap()
    } else {
        "[::]:0".parse().unwrap()
    }
}

pub async fn send_datagram(addr: SocketAddr, packet: &[u8], timeout: Duration) -> Result<Vec<u8>, ResolverError> {
    let socket = UdpSocket::bind(ephemeral_bind_addr(addr))
        .await
        .map_err(|_| ResolverError::ENotConn)?;

    tokio::time::timeout(timeout, socket.send_to(packet, addr))
        .await
        .map_err(|_| ResolverError::Timeout)?
        .map_err(|_| ResolverError::Eio)?;

    let mut buf = vec![0u8; MAX_RESPONSE_SIZE];
    let (n, from) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
        .await
        .map_err(|_| ResolverError::Timeout)?
        .map_err(|_| ResolverError::Eio)?;

    // Off-path spoofed responses are the one thing 0x20 randomization and
    // message-id matching can't catch on their own; reject a mismatched
    // source outright rather than just logging it.
    if from.ip() != addr.ip() {
        return Err(ResolverError::Eio);
    }

    buf.truncate(n);
    Ok(buf)
}

pub async fn send_stream(addr: SocketAddr, packet: &[u8], timeout: Duration) -> Result<Vec<u8>, ResolverError> {
    let mut stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ResolverError::Timeout)?
        .map_err(|_| ResolverError::ENotConn)?;

    let len = u16::try_from(packet.len()).map_err(|_| ResolverError::MsgSize)?;
    let mut framed = Vec::with_capacity(2 + packet.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(packet);

    tokio::time::timeout(timeout, stream.write_all(&framed))
        .await
        .map_err(|_| ResolverError::Timeout)?
        .map_err(|_| ResolverError::Eio)?;

    let mut len_buf = [0u8; 2];
    tokio::time::timeout(timeout, stream.read_exact(&mut len_buf))
        .await
        .map_err(|_| ResolverError::Timeout)?
        .map_err(|_| ResolverError::Eio)?;
    let resp_len = u16::from_be_bytes(len_buf) as usize;

    let mut resp = vec![0u8; resp_len];
    tokio::time::timeout(timeout, stream.read_exact(&mut resp))
        .await
        .map_err(|_| ResolverError::Timeout)?
        .map_err(|_| ResolverError::Eio)?;

    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_datagram_times_out_against_a_reserved_documentation_address() {
        // RFC 5737 TEST-NET-1, never routed.
        let addr: SocketAddr = "192.0.2.1:53".parse().unwrap();
        let result = send_datagram(addr, &[0u8; 12], Duration::from_millis(50)).await;
        assert!(result.is_err());
    }
}
