//! Network core for the listener bootstrap
//!
//! This module provides candidate address resolution and the first-working
//! bind fallback: the two pieces with real control-flow decisions in the
//! crate. Resolution turns a family preference and a port into an ordered
//! candidate list; the binder walks that list once and keeps the first
//! socket that both creates and binds.

pub mod addr;
pub mod binder;
pub mod resolver;

pub use addr::AddrFamily;
pub use binder::{bind_first_working, BoundListener};
pub use resolver::{Candidate, CandidateResolver};

/// Result type for network operations
pub type Result<T> = std::result::Result<T, Error>;

/// Network operation errors
///
/// The three startup failures (resolution, candidate exhaustion, listen
/// rejection) are distinguishable so embedding callers can choose their own
/// fatal-vs-retry policy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("address resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("no bindable address among {tried} candidates")]
    Exhausted {
        tried: usize,
        #[source]
        last: std::io::Error,
    },

    #[error("listen on {addr} failed")]
    Listen {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
}
