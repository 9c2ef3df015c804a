use crate::icmp::v4::{IcmpV4, RawSocket, SequenceNumber, TSocket};
use crate::{lookup, CancellationToken, EchoOutcome, PingConfig, PingError, PingResult, Statistics};
use std::fmt;
use std::io::Write;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, Ordering};

// IP header plus ICMP header, for the "N(M) bytes of data" banner.
const IPV4_ICMP_OVERHEAD: usize = 28;

static SESSION_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Runs ping sessions. Each session owns its socket, statistics, sequence numbers and, unless
/// one was fixed with [`Pinger::with_identifier`], its own ICMP identifier.
#[derive(Clone, Debug)]
pub struct Pinger {
    config: PingConfig,
    identifier: Option<u16>,
}

impl Pinger {
    pub fn new(config: PingConfig) -> Self {
        Pinger { config, identifier: None }
    }

    /// Uses a caller-chosen ICMP identifier for every session instead of a process-derived one.
    /// Sessions sharing it must not run at the same time against the same host.
    pub fn with_identifier(config: PingConfig, identifier: u16) -> Self {
        Pinger { config, identifier: Some(identifier) }
    }

    /// The fixed identifier, if any. Otherwise each session draws a fresh one.
    pub fn identifier(&self) -> Option<u16> {
        self.identifier
    }

    pub fn config(&self) -> &PingConfig {
        &self.config
    }

    /// Pings `host` without printing anything.
    pub fn send(&self, host: &str, token: &CancellationToken) -> PingResult<Statistics> {
        self.run(host, token, None)
    }

    /// Pings `host` and writes `ping`-style progress lines and the final report to `out`.
    pub fn ping<W: Write>(
        &self,
        host: &str,
        token: &CancellationToken,
        out: &mut W,
    ) -> PingResult<Statistics> {
        self.run(host, token, Some(out as &mut dyn Write))
    }

    /// Sends a single echo with a random sequence number.
    pub fn echo(&self, addr: IpAddr, token: &CancellationToken) -> EchoOutcome {
        let icmpv4 = self.icmpv4(open_socket(addr)?, addr, self.session_identifier());
        icmpv4.echo(SequenceNumber::from(rand::random::<u16>()), token)
    }

    /// Pings every host in parallel, one session per host. Results keep the order of `hosts`.
    pub fn send_all<H>(&self, hosts: &[H], token: &CancellationToken) -> Vec<PingResult<Statistics>>
    where
        H: AsRef<str> + Sync,
    {
        std::thread::scope(|scope| {
            let handles: Vec<_> = hosts
                .iter()
                .map(|host| scope.spawn(move || self.send(host.as_ref(), token)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        })
    }

    /// Runs a session over an already opened socket to `addr`.
    pub fn send_with_socket<S: TSocket>(
        &self,
        socket: S,
        host: &str,
        addr: IpAddr,
        token: &CancellationToken,
        mut out: Option<&mut dyn Write>,
    ) -> PingResult<Statistics> {
        let identifier = self.session_identifier();
        let icmpv4 = self.icmpv4(socket, addr, identifier);
        let mut stats = Statistics::new(host);
        let payload_size = self.config.payload_size();

        tracing::debug!(
            "starting session to {} ({}) id={} count={}",
            host,
            addr,
            identifier,
            self.config.count()
        );
        report(
            &mut out,
            format_args!(
                "PING {} ({}) {}({}) bytes of data.\n",
                host,
                addr,
                payload_size,
                payload_size + IPV4_ICMP_OVERHEAD
            ),
        );

        let mut sequence_number = SequenceNumber::start_value();
        let mut iteration: u64 = 0;
        while self.config.is_unbounded() || iteration < self.config.count() {
            let cancelled = if iteration == 0 {
                token.is_cancelled()
            } else {
                token.wait_timeout(self.config.interval())
            };
            if cancelled {
                report(&mut out, format_args!("\n"));
                break;
            }

            let outcome = match icmpv4.echo(sequence_number, token) {
                Err(e) if e.is_fatal() => return Err(e),
                outcome => outcome,
            };
            stats.update(&outcome);

            match &outcome {
                Ok(echo_stat) => report(
                    &mut out,
                    format_args!(
                        "{} bytes from {}: icmp_seq={} ttl={} time={:.3} ms\n",
                        echo_stat.bytes,
                        addr,
                        echo_stat.sequence,
                        echo_stat.ttl,
                        echo_stat.rtt.as_secs_f64() * 1000.0
                    ),
                ),
                Err(PingError::Cancelled { .. }) => {
                    report(&mut out, format_args!("\n"));
                    break;
                }
                Err(e) => {
                    tracing::debug!("icmp_seq={} to {} failed: {}", sequence_number, addr, e);
                    report(&mut out, format_args!("{e}\n"));
                }
            }

            sequence_number = sequence_number.next();
            iteration += 1;
        }

        tracing::debug!("{}", stats);
        report(&mut out, format_args!("{}", stats.report()));
        Ok(stats)
    }

    fn run(
        &self,
        host: &str,
        token: &CancellationToken,
        out: Option<&mut dyn Write>,
    ) -> PingResult<Statistics> {
        let addr = lookup(host)?;
        let socket = open_socket(addr)?;
        self.send_with_socket(socket, host, addr, token, out)
    }

    fn session_identifier(&self) -> u16 {
        self.identifier.unwrap_or_else(next_identifier)
    }

    fn icmpv4<S: TSocket>(&self, socket: S, addr: IpAddr, identifier: u16) -> IcmpV4<S> {
        IcmpV4::new(
            socket,
            addr,
            identifier,
            self.config.payload_size(),
            self.config.timeout(),
        )
    }
}

/// Process id mixed with a per-session counter, so sessions in one process differ.
fn next_identifier() -> u16 {
    let session = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let [low, high, ..] = std::process::id().wrapping_add(session).to_le_bytes();
    u16::from_le_bytes([low, high])
}

fn open_socket(addr: IpAddr) -> PingResult<RawSocket> {
    match addr {
        IpAddr::V4(ipv4) => RawSocket::connect(ipv4).map_err(PingError::SocketOpen),
        IpAddr::V6(_) => Err(PingError::Unsupported { addr }),
    }
}

fn report(out: &mut Option<&mut dyn Write>, args: fmt::Arguments<'_>) {
    if let Some(out) = out {
        if let Err(e) = out.write_fmt(args) {
            tracing::warn!("could not write ping report: {}", e);
        }
    }
}
