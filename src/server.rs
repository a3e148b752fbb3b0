//! Server configuration and the blocking accept loop
//!
//! A [`Server`] is a set of options chained by value before startup and
//! immutable afterwards. `bind` resolves the wildcard candidates and binds
//! the first workable one; `serve` enters the listening state and accepts
//! connections forever, handing each accepted stream to the registered
//! handler. `run` is the terminal operation combining both.

use std::convert::Infallible;
use std::io;
use std::iter;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info};
use socket2::Socket;

use crate::net::{bind_first_working, AddrFamily, CandidateResolver, Error, Result};

/// Callback invoked with each accepted connection.
///
/// Ownership of the stream transfers to the handler, which is responsible
/// for it until drop; dropping closes the connection.
pub type ConnectionHandler = Arc<dyn Fn(TcpStream) + Send + Sync + 'static>;

/// How accepted connections are handed to the handler.
///
/// `Serial` invokes the handler inline on the accept thread before the next
/// accept, so a slow handler delays every later connection; that
/// serialization is a property of the design, not an accident. `Threaded`
/// spawns one thread per connection and must be requested explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// Handler runs inline on the accept thread (default)
    #[default]
    Serial,
    /// One thread per accepted connection
    Threaded,
}

/// TCP server configuration builder.
///
/// # Examples
/// ```no_run
/// use tcplisten::Server;
///
/// Server::new()
///     .reuse_addr()
///     .backlog(16)
///     .on_connection(|conn| drop(conn))
///     .run(8080)
///     .unwrap();
/// ```
pub struct Server {
    family: AddrFamily,
    backlog: i32,
    reuse_addr: bool,
    dispatch: Dispatch,
    handler: Option<ConnectionHandler>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// Create a server with default settings: unspecified address family,
    /// system-maximum backlog, no address reuse, serial dispatch, no
    /// handler.
    pub fn new() -> Self {
        Server {
            family: AddrFamily::Unspec,
            backlog: libc::SOMAXCONN,
            reuse_addr: false,
            dispatch: Dispatch::Serial,
            handler: None,
        }
    }

    /// Restrict bind candidates to IPv4
    pub fn use_ipv4(mut self) -> Self {
        self.family = AddrFamily::V4;
        self
    }

    /// Restrict bind candidates to IPv6
    pub fn use_ipv6(mut self) -> Self {
        self.family = AddrFamily::V6;
        self
    }

    /// Override the listen backlog (default: system maximum)
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Request `SO_REUSEADDR` on candidate sockets before binding
    pub fn reuse_addr(mut self) -> Self {
        self.reuse_addr = true;
        self
    }

    /// Select the dispatch mode (default: [`Dispatch::Serial`])
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Register the connection handler.
    ///
    /// Without one, accepted connections are closed immediately.
    pub fn on_connection<F>(mut self, handler: F) -> Self
    where
        F: Fn(TcpStream) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Resolve wildcard candidates for `port` and bind the first workable
    /// one.
    ///
    /// Fails with [`Error::ResolutionFailed`] when no candidate can be
    /// resolved at all, or [`Error::Exhausted`] when every candidate fails
    /// to create or bind.
    pub fn bind(self, port: u16) -> Result<BoundServer> {
        let candidates = CandidateResolver::new(self.family).resolve(port)?;
        let listener = bind_first_working(&candidates, self.reuse_addr)?;
        Ok(BoundServer {
            listener,
            backlog: self.backlog,
            dispatch: self.dispatch,
            handler: self.handler,
        })
    }

    /// Resolve, bind, and serve.
    ///
    /// Never returns under normal operation; an `Err` is a fatal startup
    /// failure (resolution, candidate exhaustion, or listen rejection).
    pub fn run(self, port: u16) -> Result<Infallible> {
        self.bind(port)?.serve()
    }
}

/// A bound, not yet listening, server.
///
/// Lets the caller read the resolved local address (meaningful for an
/// ephemeral-port bind) before entering the accept loop. Dropping it
/// without serving closes the socket.
pub struct BoundServer {
    listener: crate::net::BoundListener,
    backlog: i32,
    dispatch: Dispatch,
    handler: Option<ConnectionHandler>,
}

impl BoundServer {
    /// The bound local address; a `bind(0)` resolves the ephemeral port here
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Enter the listening state and accept connections forever.
    ///
    /// A rejected listen call is fatal and returned as [`Error::Listen`].
    /// Accept failures are logged and never terminate the loop; the loop
    /// has no natural termination.
    pub fn serve(self) -> Result<Infallible> {
        let BoundServer {
            listener,
            backlog,
            dispatch,
            handler,
        } = self;
        let addr = listener.local_addr();
        let socket = listener.into_socket();

        socket
            .listen(backlog)
            .map_err(|source| Error::Listen { addr, source })?;
        info!("listening on {} (backlog {})", addr, backlog);

        accept_loop(
            iter::from_fn(|| Some(accept_stream(&socket))),
            |conn| deliver(conn, handler.as_ref(), dispatch),
        );
        unreachable!("the accept source never runs dry")
    }
}

fn accept_stream(socket: &Socket) -> io::Result<TcpStream> {
    let (conn, peer) = socket.accept()?;
    if let Some(peer) = peer.as_socket() {
        debug!("accepted connection from {}", peer);
    }
    Ok(conn.into())
}

fn deliver(conn: TcpStream, handler: Option<&ConnectionHandler>, dispatch: Dispatch) {
    let Some(handler) = handler else {
        debug!("no connection handler registered, closing connection");
        return;
    };
    match dispatch {
        Dispatch::Serial => handler(conn),
        Dispatch::Threaded => {
            let handler = Arc::clone(handler);
            thread::spawn(move || handler(conn));
        }
    }
}

/// Drain an accept source, invoking `deliver` on each accepted connection.
///
/// Accept errors are logged and skipped; they never end the loop. The
/// production source is endless, so this only returns when handed a finite
/// source.
fn accept_loop<C>(accepts: impl IntoIterator<Item = io::Result<C>>, mut deliver: impl FnMut(C)) {
    for accepted in accepts {
        match accepted {
            Ok(conn) => deliver(conn),
            Err(e) => error!("failed to accept connection: {}", e),
        }
    }
}
