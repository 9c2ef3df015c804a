#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

//! ICMP echo ("ping") over a raw IPv4 socket, with `ping`-style round-trip statistics.
//!
//! ```no_run
//! use ping_probe::{CancellationToken, PingConfig, Pinger};
//!
//! let pinger = Pinger::new(PingConfig::default());
//! let stats = pinger.send("127.0.0.1", &CancellationToken::new())?;
//! println!("{stats}");
//! # Ok::<(), ping_probe::PingError>(())
//! ```

pub use cancel::CancellationToken;
pub use config::{PingConfig, MAX_PAYLOAD_SIZE};
pub use echo_stat::{EchoOutcome, EchoStat};
pub use icmp::v4::{RawSocket, TSocket, Ttl};
pub use ping_error::{GenericError, PingError, PingResult};
pub use pinger::Pinger;
pub use resolver::lookup;
pub use statistics::Statistics;

mod cancel;
mod config;
mod echo_stat;
pub mod icmp;
mod ping_error;
mod pinger;
mod resolver;
mod statistics;
