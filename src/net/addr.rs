//! Address-family preference handling
//!
//! This module maps the configured address-family preference to the
//! wildcard host literals that candidate resolution enumerates, and provides
//! the family names used in diagnostic output.

use std::fmt;
use std::net::SocketAddr;

/// Address-family preference for candidate resolution.
///
/// `Unspec` lets resolution enumerate both IPv4 and IPv6 wildcard
/// addresses; the other variants restrict candidates to a single family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddrFamily {
    /// Enumerate both IPv4 and IPv6 candidates
    #[default]
    Unspec,
    /// IPv4 candidates only
    V4,
    /// IPv6 candidates only
    V6,
}

impl AddrFamily {
    /// Wildcard ("any local address") host literals to resolve for this
    /// preference, in bind-attempt order.
    ///
    /// IPv4 precedes IPv6 when the family is unspecified, matching the host
    /// resolver's passive enumeration order.
    pub fn wildcard_hosts(self) -> &'static [&'static str] {
        match self {
            AddrFamily::Unspec => &["0.0.0.0", "::"],
            AddrFamily::V4 => &["0.0.0.0"],
            AddrFamily::V6 => &["::"],
        }
    }

    /// Check whether `addr` is acceptable under this preference
    pub fn matches(self, addr: &SocketAddr) -> bool {
        match self {
            AddrFamily::Unspec => true,
            AddrFamily::V4 => addr.is_ipv4(),
            AddrFamily::V6 => addr.is_ipv6(),
        }
    }

    /// Family name as used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            AddrFamily::Unspec => "any",
            AddrFamily::V4 => "IPv4",
            AddrFamily::V6 => "IPv6",
        }
    }
}

impl fmt::Display for AddrFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Family name of a concrete socket address
pub fn family_name(addr: &SocketAddr) -> &'static str {
    if addr.is_ipv4() {
        "IPv4"
    } else {
        "IPv6"
    }
}
