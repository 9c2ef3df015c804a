use crate::{PingError, Ttl};
use std::time::Duration;

/// A matched echo reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EchoStat {
    pub sequence: u16,
    pub ttl: Ttl,
    pub rtt: Duration,
    /// Size of the ICMP reply, header included.
    pub bytes: usize,
}

/// Result of a single echo attempt.
pub type EchoOutcome = Result<EchoStat, PingError>;
