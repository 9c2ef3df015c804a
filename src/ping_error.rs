use std::net::IpAddr;
use std::{error::Error, fmt, io};

pub type GenericError = Box<dyn Error + Send + Sync + 'static>;

pub type PingResult<T> = std::result::Result<T, PingError>;

#[derive(Debug)]
pub enum PingError {
    /// The host did not resolve to any usable address.
    Resolve { host: String, message: String },
    /// The resolved address belongs to a family no socket is available for.
    Unsupported { addr: IpAddr },
    /// The raw socket could not be opened or connected.
    SocketOpen(io::Error),
    InvalidConfig(String),
    /// The echo request could not be serialized.
    Encode,
    Timeout { sequence: u16 },
    Malformed(String),
    DestinationUnreachable { from: IpAddr, sequence: u16, code: u8 },
    TimeExceeded { from: IpAddr, sequence: u16, code: u8 },
    UnexpectedType { sequence: u16, icmp_type: u8, code: u8 },
    /// The full request did not make it onto the socket.
    ShortWrite { sequence: u16, written: usize, expected: usize },
    Io(io::Error),
    Cancelled { sequence: u16 },
}

impl PingError {
    /// Fatal errors abort a session; all others are recorded as a lost echo.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PingError::Resolve { .. }
                | PingError::Unsupported { .. }
                | PingError::SocketOpen(_)
                | PingError::InvalidConfig(_)
                | PingError::Encode
        )
    }
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            PingError::Resolve { host, message } => write!(f, "{host}: {message}"),
            PingError::Unsupported { addr } => write!(f, "{addr}: address family not supported"),
            PingError::SocketOpen(e) => write!(f, "could not open ICMP socket: {e}"),
            PingError::InvalidConfig(message) => write!(f, "invalid configuration: {message}"),
            PingError::Encode => write!(f, "could not create ICMP echo request"),
            PingError::Timeout { sequence } => write!(f, "Request timeout for icmp_seq {sequence}"),
            PingError::Malformed(message) => write!(f, "malformed ICMP reply: {message}"),
            PingError::DestinationUnreachable { from, sequence, code } => {
                write!(f, "From {from} icmp_seq={sequence} Destination Unreachable (code {code})")
            }
            PingError::TimeExceeded { from, sequence, code } => {
                write!(f, "From {from} icmp_seq={sequence} Time to live exceeded (code {code})")
            }
            PingError::UnexpectedType { sequence, icmp_type, code } => {
                write!(f, "unexpected ICMP type {icmp_type} code {code} for icmp_seq={sequence}")
            }
            PingError::ShortWrite { sequence, written, expected } => {
                write!(f, "sendto icmp_seq={sequence}: wrote {written} of {expected} bytes")
            }
            PingError::Io(e) => write!(f, "{e}"),
            PingError::Cancelled { sequence } => write!(f, "icmp_seq={sequence} cancelled"),
        }
    }
}

impl Error for PingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PingError::SocketOpen(e) | PingError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PingError {
    fn from(error: io::Error) -> PingError {
        PingError::Io(error)
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::*;

    #[test]
    fn fmt_timeout() {
        let ping_error = PingError::Timeout { sequence: 3 };
        assert_eq!("Request timeout for icmp_seq 3", format!("{ping_error}"));
    }

    #[test]
    fn fmt_destination_unreachable() {
        let ping_error = PingError::DestinationUnreachable {
            from: "10.0.0.1".parse().unwrap(),
            sequence: 7,
            code: 1,
        };
        assert_eq!(
            "From 10.0.0.1 icmp_seq=7 Destination Unreachable (code 1)",
            format!("{ping_error}")
        );
    }

    #[test]
    fn fmt_resolve() {
        let ping_error = PingError::Resolve {
            host: "nowhere.invalid".to_string(),
            message: "no such host".to_string(),
        };
        assert_eq!("nowhere.invalid: no such host", ping_error.to_string());
    }

    #[test]
    fn session_level_errors_are_fatal() {
        assert!(PingError::Encode.is_fatal());
        assert!(PingError::InvalidConfig(String::new()).is_fatal());
        assert!(PingError::SocketOpen(io::Error::from(ErrorKind::PermissionDenied)).is_fatal());
        assert!(PingError::Resolve { host: String::new(), message: String::new() }.is_fatal());
    }

    #[test]
    fn per_echo_errors_are_not_fatal() {
        assert!(!PingError::Timeout { sequence: 0 }.is_fatal());
        assert!(!PingError::Malformed(String::new()).is_fatal());
        assert!(!PingError::UnexpectedType { sequence: 0, icmp_type: 5, code: 0 }.is_fatal());
        assert!(!PingError::Io(io::Error::from(ErrorKind::Other)).is_fatal());
        assert!(!PingError::Cancelled { sequence: 0 }.is_fatal());
    }

    #[test]
    fn source_of_io_error() {
        let ping_error = PingError::from(io::Error::from(ErrorKind::Other));
        assert!(ping_error.source().is_some());
        assert!(PingError::Encode.source().is_none());
    }
}
