use super::{SequenceNumber, TSocket};
use crate::icmp::{decode_message, IcmpMessage, IpFamily, Ipv4};
use crate::{CancellationToken, EchoOutcome, EchoStat, PingError};
use pnet_packet::icmp::{
    echo_request::{EchoRequestPacket, MutableEchoRequestPacket},
    IcmpCode, IcmpPacket, IcmpTypes,
};
use pnet_packet::Packet;
use std::io;
use std::net::IpAddr;
use std::time::{Duration, Instant};

pub const FILLER_BYTE: u8 = b'x';

const ICMP_HEADER_LEN: usize = 8;
const IPV4_MAX_HEADER_LEN: usize = 60;
// Error messages quote the offending IP header and the first 8 bytes after it.
const ICMP_ERROR_QUOTE_LEN: usize = IPV4_MAX_HEADER_LEN + ICMP_HEADER_LEN;
// Upper bound on one blocking read, so cancellation is noticed while waiting.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One session's view of the wire: sends echo requests and waits for the matching reply.
pub(crate) struct IcmpV4<S> {
    socket: S,
    destination: IpAddr,
    identifier: u16,
    payload_size: usize,
    timeout: Duration,
}

impl<S> IcmpV4<S>
where
    S: TSocket,
{
    pub(crate) fn new(
        socket: S,
        destination: IpAddr,
        identifier: u16,
        payload_size: usize,
        timeout: Duration,
    ) -> IcmpV4<S> {
        IcmpV4 { socket, destination, identifier, payload_size, timeout }
    }

    pub(crate) fn echo(
        &self,
        sequence_number: SequenceNumber,
        token: &CancellationToken,
    ) -> EchoOutcome {
        let send_time = self.send_echo(sequence_number)?;
        self.receive_reply(sequence_number, send_time, token)
    }

    fn send_echo(&self, sequence_number: SequenceNumber) -> Result<Instant, PingError> {
        let package = new_echo_request(self.identifier, sequence_number.into(), self.payload_size)?;

        let send_time = Instant::now();
        let written = self.socket.send(&package)?;
        if written != package.len() {
            return Err(PingError::ShortWrite {
                sequence: sequence_number.into(),
                written,
                expected: package.len(),
            });
        }
        tracing::trace!(
            "sent echo request id={} icmp_seq={} to {}",
            self.identifier,
            sequence_number,
            self.destination
        );
        Ok(send_time)
    }

    fn receive_reply(
        &self,
        sequence_number: SequenceNumber,
        send_time: Instant,
        token: &CancellationToken,
    ) -> EchoOutcome {
        let sequence: u16 = sequence_number.into();
        // A timeout too large for `Instant` waits until cancelled.
        let deadline = send_time.checked_add(self.timeout);
        let mut buf =
            vec![0u8; IPV4_MAX_HEADER_LEN + ICMP_HEADER_LEN + self.payload_size.max(ICMP_ERROR_QUOTE_LEN)];

        loop {
            if token.is_cancelled() {
                return Err(PingError::Cancelled { sequence });
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(PingError::Timeout { sequence });
                    }
                    (deadline - now).min(RECV_POLL_INTERVAL)
                }
                None => RECV_POLL_INTERVAL,
            };
            let n_bytes = match self.socket.recv(&mut buf, wait) {
                Ok(n_bytes) => n_bytes,
                Err(e) if is_timeout(&e) => continue,
                Err(e) => return Err(e.into()),
            };

            let header = Ipv4::parse_header(&buf[..n_bytes])?;
            if header.source != self.destination {
                tracing::trace!("discarding datagram from {}", header.source);
                continue;
            }
            let message = decode_message::<Ipv4>(&buf[header.header_len..n_bytes])?;

            match message {
                // Our own request looped back, or the peer pinging us.
                IcmpMessage::EchoRequest { .. } => continue,
                IcmpMessage::EchoReply { identifier, sequence: reply_sequence, payload_len } => {
                    if identifier != self.identifier || reply_sequence != sequence {
                        tracing::trace!(
                            "discarding echo reply id={} icmp_seq={}, waiting for id={} icmp_seq={}",
                            identifier,
                            reply_sequence,
                            self.identifier,
                            sequence
                        );
                        continue;
                    }
                    return Ok(EchoStat {
                        sequence,
                        ttl: header.ttl,
                        rtt: send_time.elapsed(),
                        bytes: ICMP_HEADER_LEN + payload_len,
                    });
                }
                IcmpMessage::DestinationUnreachable { code } => {
                    return Err(PingError::DestinationUnreachable { from: header.source, sequence, code });
                }
                IcmpMessage::TimeExceeded { code } => {
                    return Err(PingError::TimeExceeded { from: header.source, sequence, code });
                }
                IcmpMessage::Other { icmp_type, code } => {
                    return Err(PingError::UnexpectedType { sequence, icmp_type, code });
                }
            }
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Serializes an ICMP echo request carrying `payload_size` filler bytes.
pub fn new_echo_request(
    identifier: u16,
    sequence: u16,
    payload_size: usize,
) -> Result<Vec<u8>, PingError> {
    // Everything past the 8 header bytes is payload.
    let buf = vec![FILLER_BYTE; EchoRequestPacket::minimum_packet_size() + payload_size];
    let mut package = MutableEchoRequestPacket::owned(buf).ok_or(PingError::Encode)?;
    package.set_icmp_type(IcmpTypes::EchoRequest);
    package.set_icmp_code(IcmpCode::new(0));
    package.set_identifier(identifier);
    package.set_sequence_number(sequence);

    package.set_checksum(0_u16);
    let checksum =
        pnet_packet::icmp::checksum(&IcmpPacket::new(package.packet()).ok_or(PingError::Encode)?);
    package.set_checksum(checksum);
    Ok(package.packet().to_vec())
}
