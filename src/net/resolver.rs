//! Candidate address resolution
//!
//! This module turns an address-family preference and a port into the
//! ordered list of bind candidates. Resolution is always passive: no
//! hostname is supplied, the candidates are the wildcard addresses of the
//! preferred families, and every candidate is stream-oriented TCP.
//!
//! The resolver's ordering is authoritative: the binder attempts candidates
//! exactly in the order produced here.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use socket2::{Domain, Protocol, Type};

use super::{addr, AddrFamily, Error, Result};

/// One resolved (family, socket type, protocol, address) tuple eligible
/// for binding.
///
/// Produced as an ordered sequence by [`CandidateResolver`]; consumed,
/// never mutated, by the binder.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Socket domain matching the address family
    pub domain: Domain,
    /// Socket type (always stream for this crate)
    pub socket_type: Type,
    /// Transport protocol (always TCP for this crate)
    pub protocol: Protocol,
    /// The address to bind
    pub addr: SocketAddr,
}

impl Candidate {
    /// Stream/TCP candidate for `addr`
    pub fn stream(addr: SocketAddr) -> Self {
        let domain = match addr {
            SocketAddr::V4(_) => Domain::IPV4,
            SocketAddr::V6(_) => Domain::IPV6,
        };
        Candidate {
            domain,
            socket_type: Type::STREAM,
            protocol: Protocol::TCP,
            addr,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?}/{:?} {} port {}",
            addr::family_name(&self.addr),
            self.socket_type,
            self.protocol,
            self.addr.ip(),
            self.addr.port()
        )
    }
}

/// Resolves bind candidates for a configured address-family preference.
///
/// # Examples
/// ```
/// use tcplisten::{AddrFamily, CandidateResolver};
///
/// let candidates = CandidateResolver::new(AddrFamily::V4).resolve(8080).unwrap();
/// assert!(candidates.iter().all(|c| c.addr.is_ipv4()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateResolver {
    family: AddrFamily,
}

impl CandidateResolver {
    /// Create a resolver with the given family preference
    pub fn new(family: AddrFamily) -> Self {
        CandidateResolver { family }
    }

    /// Resolve wildcard bind candidates for `port`.
    ///
    /// A resolver error with no usable address at all is fatal and reported
    /// as [`Error::ResolutionFailed`]; a successful resolution never returns
    /// an empty list. A family whose wildcard fails to resolve while the
    /// other succeeds is a partial failure and only narrows the list.
    pub fn resolve(&self, port: u16) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        let mut last_err: Option<io::Error> = None;

        for host in self.family.wildcard_hosts() {
            match Self::lookup(host, port) {
                Ok(addrs) => candidates.extend(
                    addrs
                        .into_iter()
                        .filter(|a| self.family.matches(a))
                        .map(Candidate::stream),
                ),
                Err(e) => last_err = Some(e),
            }
        }

        if candidates.is_empty() {
            let detail = match last_err {
                Some(e) => e.to_string(),
                None => format!("no {} addresses on this host", self.family),
            };
            return Err(Error::ResolutionFailed(detail));
        }

        Ok(candidates)
    }

    /// Resolve candidates for an explicit host instead of the wildcard
    /// address, still filtered by the family preference.
    ///
    /// This is the loopback-friendly entry point for deterministic tests
    /// and for diagnostics against a concrete interface.
    pub fn resolve_host(&self, host: &str, port: u16) -> Result<Vec<Candidate>> {
        let addrs = Self::lookup(host, port)
            .map_err(|e| Error::ResolutionFailed(e.to_string()))?;

        let candidates: Vec<Candidate> = addrs
            .into_iter()
            .filter(|a| self.family.matches(a))
            .map(Candidate::stream)
            .collect();

        if candidates.is_empty() {
            return Err(Error::ResolutionFailed(format!(
                "no {} addresses found for {}",
                self.family, host
            )));
        }

        Ok(candidates)
    }

    fn lookup(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        (host, port).to_socket_addrs().map(Iterator::collect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_unspec_is_nonempty_and_v4_first() {
        let candidates = CandidateResolver::new(AddrFamily::Unspec)
            .resolve(8080)
            .unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates[0].addr.is_ipv4());
        for c in &candidates {
            assert_eq!(c.addr.port(), 8080);
            assert!(c.addr.ip().is_unspecified());
        }
    }

    #[test]
    fn test_resolve_respects_family_preference() {
        let v4 = CandidateResolver::new(AddrFamily::V4).resolve(80).unwrap();
        assert!(v4.iter().all(|c| c.addr.is_ipv4()));

        let v6 = CandidateResolver::new(AddrFamily::V6).resolve(80).unwrap();
        assert!(v6.iter().all(|c| c.addr.is_ipv6()));
    }

    #[test]
    fn test_resolve_ephemeral_port() {
        let candidates = CandidateResolver::new(AddrFamily::V4).resolve(0).unwrap();
        assert!(candidates.iter().all(|c| c.addr.port() == 0));
    }

    #[test]
    fn test_resolve_host_loopback() {
        let candidates = CandidateResolver::new(AddrFamily::Unspec)
            .resolve_host("localhost", 4242)
            .unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates
            .iter()
            .all(|c| c.addr.ip().is_loopback() && c.addr.port() == 4242));
        assert!(candidates
            .iter()
            .any(|c| c.addr.is_ipv4() || c.addr.is_ipv6()));
    }

    #[test]
    fn test_resolve_host_filters_family() {
        let candidates = CandidateResolver::new(AddrFamily::V4)
            .resolve_host("127.0.0.1", 9090)
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].addr.is_ipv4());

        // A v4 literal cannot satisfy a v6-only preference
        let err = CandidateResolver::new(AddrFamily::V6).resolve_host("127.0.0.1", 9090);
        assert!(matches!(err, Err(Error::ResolutionFailed(_))));
    }

    #[test]
    fn test_candidate_stream_fields() {
        let v4: SocketAddr = "127.0.0.1:80".parse().unwrap();
        let c = Candidate::stream(v4);
        assert_eq!(c.domain, Domain::IPV4);
        assert_eq!(c.socket_type, Type::STREAM);
        assert_eq!(c.protocol, Protocol::TCP);

        let v6: SocketAddr = "[::1]:80".parse().unwrap();
        assert_eq!(Candidate::stream(v6).domain, Domain::IPV6);
    }

    #[test]
    fn test_candidate_display_mentions_address_and_port() {
        let c = Candidate::stream("127.0.0.1:8080".parse().unwrap());
        let line = c.to_string();
        assert!(line.contains("IPv4"));
        assert!(line.contains("127.0.0.1"));
        assert!(line.contains("8080"));
    }
}
