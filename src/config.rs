use crate::{PingError, PingResult};
use std::time::Duration;

/// Largest ICMP payload that fits an IPv4 datagram (65535 - 20 byte IP header - 8 byte ICMP header).
pub const MAX_PAYLOAD_SIZE: usize = 65_507;

/// Session parameters. Validated once when built and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PingConfig {
    payload_size: usize,
    count: u64,
    timeout: Duration,
    interval: Duration,
}

impl PingConfig {
    pub const DEFAULT_PAYLOAD_SIZE: usize = 56;
    pub const DEFAULT_COUNT: u64 = 4;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
    pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

    /// `count == 0` keeps probing until cancelled.
    pub fn new(
        payload_size: usize,
        count: u64,
        timeout: Duration,
        interval: Duration,
    ) -> PingResult<Self> {
        if payload_size > MAX_PAYLOAD_SIZE {
            return Err(PingError::InvalidConfig(format!(
                "payload size {payload_size} exceeds {MAX_PAYLOAD_SIZE} bytes"
            )));
        }
        if timeout.is_zero() {
            return Err(PingError::InvalidConfig("timeout must be greater than zero".to_string()));
        }
        if timeout > Self::MAX_TIMEOUT {
            return Err(PingError::InvalidConfig(format!(
                "timeout {timeout:?} exceeds {:?}",
                Self::MAX_TIMEOUT
            )));
        }
        Ok(PingConfig { payload_size, count, timeout, interval })
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_unbounded(&self) -> bool {
        self.count == 0
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        PingConfig {
            payload_size: Self::DEFAULT_PAYLOAD_SIZE,
            count: Self::DEFAULT_COUNT,
            timeout: Self::DEFAULT_TIMEOUT,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}
