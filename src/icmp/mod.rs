//! Decoding of inbound datagrams into an IP header and an ICMP message.
//!
//! Everything that depends on the IP version (header layout, ICMP type numbers) sits behind
//! [`IpFamily`]. Header lengths are always taken from the datagram itself.

use std::net::IpAddr;

use pnet_packet::icmp::echo_reply::EchoReplyPacket;
use pnet_packet::icmp::{IcmpPacket, IcmpType, IcmpTypes};
use pnet_packet::icmpv6::{Icmpv6Type, Icmpv6Types};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;

use crate::PingError;

pub mod v4;

use v4::Ttl;

/// The IP header fields the echo exchange consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IpHeader {
    pub header_len: usize,
    pub source: IpAddr,
    pub ttl: Ttl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IcmpKind {
    EchoRequest,
    EchoReply,
    DestinationUnreachable,
    TimeExceeded,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IcmpMessage {
    EchoRequest { identifier: u16, sequence: u16 },
    EchoReply { identifier: u16, sequence: u16, payload_len: usize },
    DestinationUnreachable { code: u8 },
    TimeExceeded { code: u8 },
    Other { icmp_type: u8, code: u8 },
}

/// IP-version specific parts of decoding.
pub trait IpFamily {
    fn parse_header(datagram: &[u8]) -> Result<IpHeader, PingError>;
    fn classify(icmp_type: u8) -> IcmpKind;
}

pub struct Ipv4;

impl IpFamily for Ipv4 {
    fn parse_header(datagram: &[u8]) -> Result<IpHeader, PingError> {
        let packet = Ipv4Packet::new(datagram).ok_or_else(|| {
            PingError::Malformed(format!("{} bytes is too short for an IPv4 header", datagram.len()))
        })?;
        if packet.get_version() != 4 {
            return Err(PingError::Malformed(format!(
                "expected IP version 4, got {}",
                packet.get_version()
            )));
        }
        // The length field counts 32-bit words and includes any options.
        let header_len = usize::from(packet.get_header_length()) * 4;
        if header_len < Ipv4Packet::minimum_packet_size() || header_len > datagram.len() {
            return Err(PingError::Malformed(format!(
                "IPv4 header length {header_len} does not fit a {} byte datagram",
                datagram.len()
            )));
        }
        Ok(IpHeader {
            header_len,
            source: IpAddr::V4(packet.get_source()),
            ttl: packet.get_ttl().into(),
        })
    }

    fn classify(icmp_type: u8) -> IcmpKind {
        match IcmpType::new(icmp_type) {
            IcmpTypes::EchoRequest => IcmpKind::EchoRequest,
            IcmpTypes::EchoReply => IcmpKind::EchoReply,
            IcmpTypes::DestinationUnreachable => IcmpKind::DestinationUnreachable,
            IcmpTypes::TimeExceeded => IcmpKind::TimeExceeded,
            _ => IcmpKind::Other,
        }
    }
}

/// Fixed IPv6 header; extension headers are rejected rather than walked.
pub struct Ipv6;

impl IpFamily for Ipv6 {
    fn parse_header(datagram: &[u8]) -> Result<IpHeader, PingError> {
        let packet = Ipv6Packet::new(datagram).ok_or_else(|| {
            PingError::Malformed(format!("{} bytes is too short for an IPv6 header", datagram.len()))
        })?;
        if packet.get_version() != 6 {
            return Err(PingError::Malformed(format!(
                "expected IP version 6, got {}",
                packet.get_version()
            )));
        }
        if packet.get_next_header() != IpNextHeaderProtocols::Icmpv6 {
            return Err(PingError::Malformed(format!(
                "unsupported IPv6 next header {}",
                packet.get_next_header().0
            )));
        }
        Ok(IpHeader {
            header_len: Ipv6Packet::minimum_packet_size(),
            source: IpAddr::V6(packet.get_source()),
            ttl: packet.get_hop_limit().into(),
        })
    }

    fn classify(icmp_type: u8) -> IcmpKind {
        match Icmpv6Type::new(icmp_type) {
            Icmpv6Types::EchoRequest => IcmpKind::EchoRequest,
            Icmpv6Types::EchoReply => IcmpKind::EchoReply,
            Icmpv6Types::DestinationUnreachable => IcmpKind::DestinationUnreachable,
            Icmpv6Types::TimeExceeded => IcmpKind::TimeExceeded,
            _ => IcmpKind::Other,
        }
    }
}

/// Splits a raw datagram into its IP header and the ICMP message it carries.
pub fn decode<F: IpFamily>(datagram: &[u8]) -> Result<(IpHeader, IcmpMessage), PingError> {
    let header = F::parse_header(datagram)?;
    let message = decode_message::<F>(&datagram[header.header_len..])?;
    Ok((header, message))
}

/// Decodes the ICMP message that follows an already parsed IP header.
pub fn decode_message<F: IpFamily>(buf: &[u8]) -> Result<IcmpMessage, PingError> {
    let packet = IcmpPacket::new(buf)
        .ok_or_else(|| PingError::Malformed(format!("{} bytes is too short for ICMP", buf.len())))?;
    let icmp_type = packet.get_icmp_type().0;
    let code = packet.get_icmp_code().0;

    let message = match F::classify(icmp_type) {
        kind @ (IcmpKind::EchoRequest | IcmpKind::EchoReply) => {
            // Request and reply share the same layout.
            let echo = EchoReplyPacket::new(buf).ok_or_else(|| {
                PingError::Malformed(format!("{} bytes is too short for an ICMP echo", buf.len()))
            })?;
            let identifier = echo.get_identifier();
            let sequence = echo.get_sequence_number();
            if kind == IcmpKind::EchoRequest {
                IcmpMessage::EchoRequest { identifier, sequence }
            } else {
                IcmpMessage::EchoReply {
                    identifier,
                    sequence,
                    payload_len: buf.len() - EchoReplyPacket::minimum_packet_size(),
                }
            }
        }
        IcmpKind::DestinationUnreachable => IcmpMessage::DestinationUnreachable { code },
        IcmpKind::TimeExceeded => IcmpMessage::TimeExceeded { code },
        IcmpKind::Other => IcmpMessage::Other { icmp_type, code },
    };
    Ok(message)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::net::{Ipv4Addr, Ipv6Addr};

    use pnet_packet::icmp::checksum;
    use pnet_packet::icmp::echo_reply::MutableEchoReplyPacket;
    use pnet_packet::icmp::IcmpCode;
    use pnet_packet::ipv4::MutableIpv4Packet;
    use pnet_packet::ipv6::MutableIpv6Packet;
    use pnet_packet::Packet;

    pub(crate) fn echo_reply(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
        let buf = vec![0u8; EchoReplyPacket::minimum_packet_size() + payload.len()];
        let mut package = MutableEchoReplyPacket::owned(buf).unwrap();
        package.set_icmp_type(IcmpTypes::EchoReply);
        package.set_icmp_code(IcmpCode::new(0));
        package.set_identifier(identifier);
        package.set_sequence_number(sequence);
        package.set_payload(payload);
        package.set_checksum(0_u16);
        package.set_checksum(checksum(&IcmpPacket::new(package.packet()).unwrap()));
        package.packet().to_vec()
    }

    /// An ICMP message of arbitrary type with a zeroed 4-byte rest-of-header.
    pub(crate) fn icmp_message(icmp_type: u8, code: u8, body: &[u8]) -> Vec<u8> {
        let mut buf = vec![icmp_type, code, 0, 0, 0, 0, 0, 0];
        buf.extend_from_slice(body);
        buf
    }

    pub(crate) fn ipv4_datagram(source: Ipv4Addr, ttl: u8, option_words: u8, icmp: &[u8]) -> Vec<u8> {
        let header_len = 20 + usize::from(option_words) * 4;
        let mut buf = vec![0u8; header_len + icmp.len()];
        {
            let mut packet = MutableIpv4Packet::new(&mut buf).unwrap();
            packet.set_version(4);
            packet.set_header_length(5 + option_words);
            packet.set_total_length(u16::try_from(header_len + icmp.len()).unwrap());
            packet.set_ttl(ttl);
            packet.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
            packet.set_source(source);
            packet.set_destination(Ipv4Addr::LOCALHOST);
        }
        buf[header_len..].copy_from_slice(icmp);
        buf
    }

    fn ipv6_datagram(source: Ipv6Addr, hop_limit: u8, icmp: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 40 + icmp.len()];
        {
            let mut packet = MutableIpv6Packet::new(&mut buf).unwrap();
            packet.set_version(6);
            packet.set_payload_length(u16::try_from(icmp.len()).unwrap());
            packet.set_next_header(IpNextHeaderProtocols::Icmpv6);
            packet.set_hop_limit(hop_limit);
            packet.set_source(source);
            packet.set_destination(Ipv6Addr::LOCALHOST);
        }
        buf[40..].copy_from_slice(icmp);
        buf
    }

    const SOURCE: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 7);

    #[test]
    fn decode_echo_reply() {
        let datagram = ipv4_datagram(SOURCE, 57, 0, &echo_reply(0xABCD, 9, &[b'x'; 56]));
        let (header, message) = decode::<Ipv4>(&datagram).unwrap();

        assert_eq!(20, header.header_len);
        assert_eq!(IpAddr::V4(SOURCE), header.source);
        assert_eq!(Ttl(57), header.ttl);
        assert_eq!(
            IcmpMessage::EchoReply { identifier: 0xABCD, sequence: 9, payload_len: 56 },
            message
        );
    }

    #[test]
    fn decode_honours_ip_options() {
        let datagram = ipv4_datagram(SOURCE, 64, 3, &echo_reply(1, 2, &[0xFF; 4]));
        let (header, message) = decode::<Ipv4>(&datagram).unwrap();

        assert_eq!(32, header.header_len);
        assert_eq!(
            IcmpMessage::EchoReply { identifier: 1, sequence: 2, payload_len: 4 },
            message
        );
    }

    #[test]
    fn decode_echo_request() {
        let mut request = echo_reply(5, 6, &[]);
        request[0] = 8;
        let datagram = ipv4_datagram(SOURCE, 64, 0, &request);
        let (_, message) = decode::<Ipv4>(&datagram).unwrap();
        assert_eq!(IcmpMessage::EchoRequest { identifier: 5, sequence: 6 }, message);
    }

    #[test]
    fn decode_error_messages() {
        let unreachable = ipv4_datagram(SOURCE, 64, 0, &icmp_message(3, 1, &[0; 28]));
        let (_, message) = decode::<Ipv4>(&unreachable).unwrap();
        assert_eq!(IcmpMessage::DestinationUnreachable { code: 1 }, message);

        let exceeded = ipv4_datagram(SOURCE, 64, 0, &icmp_message(11, 0, &[0; 28]));
        let (_, message) = decode::<Ipv4>(&exceeded).unwrap();
        assert_eq!(IcmpMessage::TimeExceeded { code: 0 }, message);

        let redirect = ipv4_datagram(SOURCE, 64, 0, &icmp_message(5, 1, &[]));
        let (_, message) = decode::<Ipv4>(&redirect).unwrap();
        assert_eq!(IcmpMessage::Other { icmp_type: 5, code: 1 }, message);
    }

    #[test]
    fn decode_rejects_short_datagram() {
        assert!(matches!(decode::<Ipv4>(&[0x45; 12]), Err(PingError::Malformed(_))));
    }

    #[test]
    fn decode_rejects_header_length_beyond_datagram() {
        let mut datagram = ipv4_datagram(SOURCE, 64, 0, &echo_reply(1, 1, &[]));
        datagram[0] = 0x4F; // 60 byte header in a 28 byte datagram
        assert!(matches!(decode::<Ipv4>(&datagram), Err(PingError::Malformed(_))));
    }

    #[test]
    fn decode_rejects_truncated_echo() {
        let datagram = ipv4_datagram(SOURCE, 64, 0, &[0, 0, 0, 0, 0]);
        assert!(matches!(decode::<Ipv4>(&datagram), Err(PingError::Malformed(_))));
    }

    #[test]
    fn decode_rejects_wrong_version() {
        let mut datagram = ipv4_datagram(SOURCE, 64, 0, &echo_reply(1, 1, &[]));
        datagram[0] = 0x65;
        assert!(matches!(decode::<Ipv4>(&datagram), Err(PingError::Malformed(_))));
    }

    #[test]
    fn decode_ipv6_echo_reply() {
        let source: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let mut reply = echo_reply(0x1234, 3, &[0; 8]);
        reply[0] = 129;
        let datagram = ipv6_datagram(source, 50, &reply);
        let (header, message) = decode::<Ipv6>(&datagram).unwrap();

        assert_eq!(40, header.header_len);
        assert_eq!(IpAddr::V6(source), header.source);
        assert_eq!(Ttl(50), header.ttl);
        assert_eq!(
            IcmpMessage::EchoReply { identifier: 0x1234, sequence: 3, payload_len: 8 },
            message
        );
    }

    #[test]
    fn ipv6_type_numbers_differ_from_ipv4() {
        assert_eq!(IcmpKind::EchoReply, Ipv6::classify(129));
        assert_eq!(IcmpKind::EchoRequest, Ipv6::classify(128));
        assert_eq!(IcmpKind::DestinationUnreachable, Ipv6::classify(1));
        assert_eq!(IcmpKind::TimeExceeded, Ipv6::classify(3));
        assert_eq!(IcmpKind::Other, Ipv6::classify(0));
        assert_eq!(IcmpKind::EchoReply, Ipv4::classify(0));
    }
}
