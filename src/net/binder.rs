//! First-working bind fallback
//!
//! The binder walks the resolver's candidate list once, in order. For each
//! candidate it creates a matching socket, applies the requested options,
//! and binds. The first candidate that both creates and binds wins; every
//! attempt is logged whether it succeeds or fails.

use std::io;
use std::net::SocketAddr;

use log::{info, warn};
use socket2::{SockAddr, Socket};

use super::{Candidate, Error, Result};

/// A successfully bound, not yet listening, socket.
///
/// At most one exists per server start. The socket is closed on drop; in
/// the normal path ownership moves into the accept loop and lives for the
/// rest of the process.
#[derive(Debug)]
pub struct BoundListener {
    socket: Socket,
    addr: SocketAddr,
    candidate_index: usize,
}

impl BoundListener {
    /// Local address after binding; a requested port of 0 resolves here to
    /// the ephemeral port chosen by the OS.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Index of the candidate that won the bind
    pub fn candidate_index(&self) -> usize {
        self.candidate_index
    }

    pub(crate) fn into_socket(self) -> Socket {
        self.socket
    }
}

/// Bind the first workable candidate.
///
/// Per-candidate failures are recoverable: a socket that cannot be created
/// or bound is logged, closed, and iteration moves on. A failure to set
/// `SO_REUSEADDR` (or `IPV6_V6ONLY` on IPv6 candidates) is logged but does
/// not stop the bind. Exhausting the list is terminal and reports the last
/// OS error; the binder never retries or re-resolves.
pub fn bind_first_working(candidates: &[Candidate], reuse_addr: bool) -> Result<BoundListener> {
    let mut last_err: Option<io::Error> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        info!("trying to create socket for {}", candidate);

        let socket = match Socket::new(
            candidate.domain,
            candidate.socket_type,
            Some(candidate.protocol),
        ) {
            Ok(socket) => socket,
            Err(e) => {
                warn!("failed to create socket for {}: {}", candidate, e);
                last_err = Some(e);
                continue;
            }
        };

        if reuse_addr {
            if let Err(e) = socket.set_reuse_address(true) {
                warn!("failed to set SO_REUSEADDR for {}: {}", candidate, e);
            }
        }

        // Keep a v6 bind from shadowing a later v4 candidate of the same port.
        if candidate.addr.is_ipv6() {
            if let Err(e) = socket.set_only_v6(true) {
                warn!("failed to set IPV6_V6ONLY for {}: {}", candidate, e);
            }
        }

        info!("trying to bind {}", candidate);
        match socket.bind(&SockAddr::from(candidate.addr)) {
            Ok(()) => {
                let addr = socket
                    .local_addr()
                    .ok()
                    .and_then(|a| a.as_socket())
                    .unwrap_or(candidate.addr);
                info!("bound {} at {}", candidate, addr);
                return Ok(BoundListener {
                    socket,
                    addr,
                    candidate_index: index,
                });
            }
            Err(e) => {
                warn!("failed to bind {}: {}", candidate, e);
                last_err = Some(e);
                // socket drops here, closing the descriptor before the next attempt
            }
        }
    }

    Err(Error::Exhausted {
        tried: candidates.len(),
        last: last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "empty candidate list")
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use socket2::{Domain, Protocol, Type};
    use std::net::TcpListener;

    /// A candidate whose port is already exclusively bound, so bind fails.
    fn occupied_candidate() -> (TcpListener, Candidate) {
        let occupant = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = occupant.local_addr().unwrap();
        (occupant, Candidate::stream(addr))
    }

    /// A candidate whose (type, protocol) pair the OS rejects at socket
    /// creation time.
    fn uncreatable_candidate() -> Candidate {
        Candidate {
            domain: Domain::IPV4,
            socket_type: Type::STREAM,
            protocol: Protocol::UDP,
            addr: "127.0.0.1:0".parse().unwrap(),
        }
    }

    fn ephemeral_candidate() -> Candidate {
        Candidate::stream("127.0.0.1:0".parse().unwrap())
    }

    #[test]
    fn test_first_success_wins() {
        let (_occupant_a, bad_a) = occupied_candidate();
        let (_occupant_b, bad_b) = occupied_candidate();
        let candidates = vec![bad_a, bad_b, ephemeral_candidate(), ephemeral_candidate()];

        let bound = bind_first_working(&candidates, false).unwrap();
        assert_eq!(bound.candidate_index(), 2);
        assert!(bound.local_addr().port() > 0);
        assert_ne!(bound.local_addr().port(), candidates[0].addr.port());
    }

    #[test]
    fn test_creation_failure_is_recoverable() {
        let candidates = vec![uncreatable_candidate(), ephemeral_candidate()];
        let bound = bind_first_working(&candidates, false).unwrap();
        assert_eq!(bound.candidate_index(), 1);
    }

    #[test]
    fn test_exhaustion_is_terminal() {
        let (_occupant_a, bad_a) = occupied_candidate();
        let (_occupant_b, bad_b) = occupied_candidate();

        let err = bind_first_working(&[bad_a, bad_b], false).unwrap_err();
        match err {
            Error::Exhausted { tried, .. } => assert_eq!(tried, 2),
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_candidate_list_is_exhausted() {
        let err = bind_first_working(&[], false).unwrap_err();
        assert!(matches!(err, Error::Exhausted { tried: 0, .. }));
    }

    #[test]
    fn test_reuse_addr_allows_sequential_rebind() {
        let first = bind_first_working(&[ephemeral_candidate()], true).unwrap();
        let addr = first.local_addr();
        drop(first);

        let second = bind_first_working(&[Candidate::stream(addr)], true).unwrap();
        assert_eq!(second.local_addr(), addr);
    }

    #[test]
    fn test_ephemeral_port_is_resolved() {
        let bound = bind_first_working(&[ephemeral_candidate()], false).unwrap();
        assert_ne!(bound.local_addr().port(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_candidates_leak_no_descriptors() {
        fn open_fds() -> usize {
            std::fs::read_dir("/proc/self/fd").unwrap().count()
        }

        let (_occupant_a, bad_a) = occupied_candidate();
        let (_occupant_b, bad_b) = occupied_candidate();
        let candidates = vec![uncreatable_candidate(), bad_a, bad_b];

        let before = open_fds();
        for _ in 0..32 {
            let _ = bind_first_working(&candidates, false);
        }
        assert_eq!(open_fds(), before);
    }
}
