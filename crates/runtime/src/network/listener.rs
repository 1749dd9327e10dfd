//! The listening endpoints client DNS queries arrive on (§4.6). Bound with
//! `SO_REUSEADDR` via `socket2` the way the teacher's server binds its
//! sockets before handing them to `tokio`, even though this resolver runs a
//! single worker on a single-threaded event loop (§5) rather than the
//! teacher's `SO_REUSEPORT` multi-worker fan-out.

use std::net::SocketAddr;

use socket2::{Domain, Socket, Type};
use tern_dns_domain::ResolverError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

pub struct UdpListenerEndpoint {
    socket: UdpSocket,
}

impl UdpListenerEndpoint {
    pub fn bind(addr: SocketAddr) -> Result<Self, ResolverError> {
        let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
        let socket = Socket::new(domain, Type::DGRAM, None).map_err(|_| ResolverError::Eio)?;
        socket.set_reuse_address(true).map_err(|_| ResolverError::Eio)?;
        socket.set_nonblocking(true).map_err(|_| ResolverError::Eio)?;
        socket.bind(&addr.into()).map_err(|_| ResolverError::Eio)?;
        let socket = UdpSocket::from_std(socket.into()).map_err(|_| ResolverError::Eio)?;
        Ok(Self { socket })
    }

    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), ResolverError> {
        self.socket.recv_from(buf).await.map_err(|_| ResolverError::Eio)
    }

    pub async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<usize, ResolverError> {
        self.socket.send_to(buf, addr).await.map_err(|_| ResolverError::Eio)
    }
}

pub struct TcpListenerEndpoint {
    listener: TcpListener,
}

impl TcpListenerEndpoint {
    pub async fn bind(addr: SocketAddr, backlog: u32) -> Result<Self, ResolverError> {
        let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
        let socket = Socket::new(domain, Type::STREAM, None).map_err(|_| ResolverError::Eio)?;
        socket.set_reuse_address(true).map_err(|_| ResolverError::Eio)?;
        socket.set_nonblocking(true).map_err(|_| ResolverError::Eio)?;
        socket.bind(&addr.into()).map_err(|_| ResolverError::Eio)?;
        socket.listen(backlog as i32).map_err(|_| ResolverError::Eio)?;
        let listener = TcpListener::from_std(socket.into()).map_err(|_| ResolverError::Eio)?;
        Ok(Self { listener })
    }

    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ResolverError> {
        self.listener.accept().await.map_err(|_| ResolverError::Eio)
    }
}

/// Read one RFC 1035 length-prefixed message off an accepted TCP stream.
pub async fn read_framed_message(stream: &mut TcpStream) -> Result<Vec<u8>, ResolverError> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await.map_err(|_| ResolverError::Eio)?;
    let len = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.map_err(|_| ResolverError::Eio)?;
    Ok(buf)
}

/// Write one RFC 1035 length-prefixed message to an accepted TCP stream.
pub async fn write_framed_message(stream: &mut TcpStream, message: &[u8]) -> Result<(), ResolverError> {
    let len = u16::try_from(message.len()).map_err(|_| ResolverError::MsgSize)?;
    stream.write_all(&len.to_be_bytes()).await.map_err(|_| ResolverError::Eio)?;
    stream.write_all(message).await.map_err(|_| ResolverError::Eio)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn framed_message_round_trips_over_a_loopback_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            write_framed_message(&mut stream, b"hello iterative resolver").await.unwrap();
            stream
        });

        let (mut server_side, _) = listener.accept().await.unwrap();
        let received = read_framed_message(&mut server_side).await.unwrap();
        assert_eq!(received, b"hello iterative resolver");

        client.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_message_is_rejected_before_writing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let oversized = vec![0u8; u16::MAX as usize + 1];
        let result = write_framed_message(&mut stream, &oversized).await;
        assert!(matches!(result, Err(ResolverError::MsgSize)));
    }
}
