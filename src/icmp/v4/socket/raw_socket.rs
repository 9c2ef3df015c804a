use super::TSocket;
use socket2::{Domain, Protocol, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Raw ICMPv4 socket connected to a single destination.
///
/// Opening it usually needs root or `CAP_NET_RAW`. Reads return whole IP datagrams.
pub struct RawSocket {
    socket: socket2::Socket,
}

impl RawSocket {
    pub fn connect(addr: Ipv4Addr) -> Result<Self, io::Error> {
        tracing::trace!("creating raw ICMPv4 socket to {}", addr);
        let socket = socket2::Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        // Connecting makes the kernel drop datagrams from other hosts.
        socket.connect(&SocketAddr::from((addr, 0)).into())?;
        Ok(RawSocket { socket })
    }
}

impl TSocket for RawSocket {
    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf)
    }

    fn recv(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        // A zero timeout would block forever.
        self.socket
            .set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
        (&self.socket).read(buf)
    }
}
