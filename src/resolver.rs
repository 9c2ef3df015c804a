use crate::{PingError, PingResult};
use rand::seq::SliceRandom;
use rand::Rng;
use std::net::{IpAddr, ToSocketAddrs};

/// Resolves `host` to one IPv4 address, chosen at random when there are several.
///
/// IP literals are returned as-is without a DNS query. A host that only has IPv6
/// records fails with [`PingError::Unsupported`].
pub fn lookup(host: &str) -> PingResult<IpAddr> {
    let mut addrs: Vec<IpAddr> = (host, 0)
        .to_socket_addrs()
        .map_err(|e| PingError::Resolve { host: host.to_string(), message: e.to_string() })?
        .map(|socket_addr| socket_addr.ip())
        .collect();
    // The resolver repeats an address once per socket type.
    addrs.sort_unstable();
    addrs.dedup();
    tracing::debug!("{} resolved to {:?}", host, addrs);

    let ipv4_addrs: Vec<IpAddr> = addrs.iter().copied().filter(IpAddr::is_ipv4).collect();
    match pick(&ipv4_addrs, &mut rand::thread_rng()) {
        Some(addr) => Ok(addr),
        None => match addrs.first() {
            Some(addr) => Err(PingError::Unsupported { addr: *addr }),
            None => Err(PingError::Resolve {
                host: host.to_string(),
                message: "no such host".to_string(),
            }),
        },
    }
}

pub(crate) fn pick<R>(addrs: &[IpAddr], rng: &mut R) -> Option<IpAddr>
where
    R: Rng + ?Sized,
{
    addrs.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    #[test]
    fn lookup_ip_literal() {
        assert_eq!(IpAddr::V4(Ipv4Addr::LOCALHOST), lookup("127.0.0.1").unwrap());
    }

    #[test]
    fn lookup_ipv6_literal_is_unsupported() {
        assert!(matches!(lookup("::1"), Err(PingError::Unsupported { .. })));
    }

    #[test]
    fn lookup_unknown_host_fails() {
        let result = lookup("no-such-host.invalid");
        assert!(matches!(result, Err(PingError::Resolve { .. })));
        assert!(result.unwrap_err().is_fatal());
    }

    #[test]
    fn pick_from_empty_is_none() {
        assert!(pick(&[], &mut StdRng::seed_from_u64(7)).is_none());
    }

    #[test]
    fn pick_spreads_over_all_addresses() {
        let addrs: Vec<IpAddr> = (1..=3).map(|i| IpAddr::V4(Ipv4Addr::new(192, 0, 2, i))).collect();
        let mut rng = StdRng::seed_from_u64(42);

        let picked: HashSet<IpAddr> = (0..200).filter_map(|_| pick(&addrs, &mut rng)).collect();

        assert_eq!(addrs.into_iter().collect::<HashSet<_>>(), picked);
    }
}
