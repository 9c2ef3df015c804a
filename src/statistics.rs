use crate::EchoOutcome;
use std::fmt::{self, Write};
use std::time::Duration;

/// Running round-trip statistics of one session.
///
/// RTT spread is tracked as a sum of squared nanoseconds in integer arithmetic, so
/// long sessions do not lose precision before the final square root.
#[derive(Clone, Debug, PartialEq)]
pub struct Statistics {
    host: String,
    transmitted: u64,
    received: u64,
    loss: f64,
    time: Duration,
    time_squared: u128,
    min_rtt: Option<Duration>,
    avg_rtt: Duration,
    max_rtt: Duration,
    mdev_rtt: Duration,
}

impl Statistics {
    /// Nothing sent yet counts as total loss.
    pub fn new(host: impl Into<String>) -> Self {
        Statistics {
            host: host.into(),
            transmitted: 0,
            received: 0,
            loss: 100.0,
            time: Duration::ZERO,
            time_squared: 0,
            min_rtt: None,
            avg_rtt: Duration::ZERO,
            max_rtt: Duration::ZERO,
            mdev_rtt: Duration::ZERO,
        }
    }

    /// Accounts for one echo attempt, successful or not.
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, outcome: &EchoOutcome) {
        self.transmitted += 1;
        if let Ok(echo_stat) = outcome {
            let rtt = echo_stat.rtt;
            self.received += 1;
            self.time += rtt;
            self.time_squared += rtt.as_nanos() * rtt.as_nanos();
            self.min_rtt = Some(self.min_rtt.map_or(rtt, |min_rtt| min_rtt.min(rtt)));
            self.max_rtt = self.max_rtt.max(rtt);

            let n = u128::from(self.received);
            let total = self.time.as_nanos();
            self.avg_rtt = nanos_to_duration(total / n);
            // n²·variance = n·Σx² − (Σx)², exact in integers.
            let n_squared_variance = (n * self.time_squared).saturating_sub(total * total);
            self.mdev_rtt = Duration::from_secs_f64((n_squared_variance as f64).sqrt() / n as f64 / 1e9);
        }
        self.loss = (self.transmitted - self.received) as f64 * 100.0 / self.transmitted as f64;
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Percentage of transmitted echoes without a matching reply.
    pub fn loss(&self) -> f64 {
        self.loss
    }

    /// Sum of all measured round-trip times.
    pub fn time(&self) -> Duration {
        self.time
    }

    pub fn min_rtt(&self) -> Option<Duration> {
        self.min_rtt
    }

    pub fn avg_rtt(&self) -> Option<Duration> {
        self.min_rtt.map(|_| self.avg_rtt)
    }

    pub fn max_rtt(&self) -> Option<Duration> {
        self.min_rtt.map(|_| self.max_rtt)
    }

    pub fn mdev_rtt(&self) -> Option<Duration> {
        self.min_rtt.map(|_| self.mdev_rtt)
    }

    /// The closing block printed by `ping`. The rtt line only appears when nothing was lost.
    pub fn report(&self) -> String {
        let mut buf = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(buf, "--- {} ping statistics ---", self.host);
        let _ = writeln!(
            buf,
            "{} packets transmitted, {} received, {:.2}% packet loss, time {}ms",
            self.transmitted,
            self.received,
            self.loss,
            self.time.as_millis()
        );
        if self.transmitted > 0 && self.received == self.transmitted {
            let _ = writeln!(
                buf,
                "rtt min/avg/max/mdev = {:.3}/{:.3}/{:.3}/{:.3} ms",
                millis(self.min_rtt.unwrap_or_default()),
                millis(self.avg_rtt),
                millis(self.max_rtt),
                millis(self.mdev_rtt)
            );
        }
        buf
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PING {}: {} packets transmitted, {} received, {:.2}% packet loss",
            self.host, self.transmitted, self.received, self.loss
        )
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
