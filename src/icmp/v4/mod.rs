mod icmpv4;
pub use icmpv4::{new_echo_request, FILLER_BYTE};
pub(crate) use icmpv4::IcmpV4;

mod sequence_number;
pub(crate) use sequence_number::SequenceNumber;

pub(crate) mod socket;
pub use socket::raw_socket::RawSocket;
pub use socket::TSocket;

mod ttl;
pub use ttl::Ttl;
