use std::{io, time::Duration};

pub(crate) mod raw_socket;

/// A datagram channel to one destination that yields inbound IP datagrams.
pub trait TSocket: Send + Sync {
    fn send(&self, buf: &[u8]) -> io::Result<usize>;

    /// Reads one inbound datagram, IP header included, waiting at most `timeout`.
    ///
    /// Expiry of the wait is reported as `WouldBlock` or `TimedOut`.
    fn recv(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}
