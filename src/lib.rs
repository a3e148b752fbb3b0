//! Minimal synchronous TCP listener bootstrap
//!
//! Given a port and a handful of options, this crate resolves the wildcard
//! bind candidates for the preferred address families, binds the first one
//! that works, then blocks in an accept loop handing each accepted
//! connection to a caller-supplied handler.
//!
//! Connections are handled strictly one at a time, in acceptance order, on
//! the accepting thread; an opt-in thread-per-connection dispatch mode is
//! available via [`Dispatch::Threaded`]. There is no TLS, no protocol
//! parsing, and no shutdown mechanism: once serving, the listener lives
//! until the process exits.
//!
//! # Examples
//!
//! ```no_run
//! use std::io::Write;
//! use tcplisten::Server;
//!
//! Server::new()
//!     .reuse_addr()
//!     .backlog(16)
//!     .on_connection(|mut conn| {
//!         let _ = conn.write_all(b"hello\n");
//!     })
//!     .run(8080)
//!     .unwrap();
//! ```

pub mod net;
pub mod server;

pub use net::{
    bind_first_working, AddrFamily, BoundListener, Candidate, CandidateResolver, Error, Result,
};
pub use server::{BoundServer, ConnectionHandler, Dispatch, Server};
