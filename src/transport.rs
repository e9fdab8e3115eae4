//! Datagram transports for the query client.
//!
//! [Transport] is the capability a [Session](crate::query::Session) needs from
//! its socket. [UdpTransport] is the plain connected socket and
//! [DeadlineTransport] wraps any transport so that no single send or receive
//! can outlive its timeout.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::time::Duration;

use log::trace;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{timeout_at, Instant};

/// Boxed future returned by [Transport::send] and [Transport::recv].
pub type IoFuture<'a> = Pin<Box<dyn Future<Output = io::Result<usize>> + Send + 'a>>;

/// A connected datagram endpoint.
///
/// The trait is object-safe so transports can be stacked or boxed.
pub trait Transport: Send + Sync {
    /// Send one datagram to the connected peer, returning the number of bytes written.
    fn send<'a>(&'a self, buf: &'a [u8]) -> IoFuture<'a>;

    /// Receive one datagram into `buf`, returning the number of bytes read.
    fn recv<'a>(&'a self, buf: &'a mut [u8]) -> IoFuture<'a>;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

/// A UDP socket connected to a single server. Dropping it closes the socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Resolve `host`, bind an ephemeral port of the matching address family and connect.
    ///
    /// Use [resolve], [UdpTransport::bind] and [UdpTransport::connect_socket]
    /// directly to tell the failing step apart.
    pub async fn connect(host: &str) -> io::Result<Self> {
        let addr: SocketAddr = resolve(host).await?;
        let socket: UdpSocket = Self::bind(&addr).await?;
        Self::connect_socket(socket, addr).await
    }

    /// Bind an unspecified local address of the same family as `peer`, on any port.
    pub async fn bind(peer: &SocketAddr) -> io::Result<UdpSocket> {
        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        UdpSocket::bind(local).await
    }

    pub async fn connect_socket(socket: UdpSocket, peer: SocketAddr) -> io::Result<Self> {
        socket.connect(peer).await?;
        Ok(UdpTransport { socket })
    }

    /// Wrap a socket that is already connected.
    pub fn new(socket: UdpSocket) -> Self {
        UdpTransport { socket }
    }
}

impl Transport for UdpTransport {
    fn send<'a>(&'a self, buf: &'a [u8]) -> IoFuture<'a> {
        Box::pin(self.socket.send(buf))
    }

    fn recv<'a>(&'a self, buf: &'a mut [u8]) -> IoFuture<'a> {
        Box::pin(self.socket.recv(buf))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket.peer_addr()
    }
}

/// Resolve `host` (`name:port`) to its first socket address.
pub async fn resolve(host: &str) -> io::Result<SocketAddr> {
    lookup_host(host).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses found for {host}"),
        )
    })
}

/// Bounds every send and receive of the inner transport by a fixed timeout.
///
/// Each operation computes a fresh deadline of now + timeout before touching
/// the socket, so one request/response exchange takes at most about twice the
/// timeout. An elapsed deadline is reported as [io::ErrorKind::TimedOut].
#[derive(Debug)]
pub struct DeadlineTransport<T> {
    inner: T,
    timeout: Duration,
}

impl<T: Transport> DeadlineTransport<T> {
    pub fn new(inner: T, timeout: Duration) -> Self {
        DeadlineTransport { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Absolute deadline for an operation starting now.
    ///
    /// Fails when the timeout is too large to be added to the current instant;
    /// the operation must then not be attempted.
    fn deadline(&self) -> io::Result<Instant> {
        Instant::now().checked_add(self.timeout).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot set a deadline {:?} from now", self.timeout),
            )
        })
    }

    async fn send_by_deadline<'a>(&'a self, buf: &'a [u8]) -> io::Result<usize> {
        let deadline: Instant = self.deadline()?;
        let sent: usize = timeout_at(deadline, self.inner.send(buf))
            .await
            .map_err(|_| self.elapsed())??;
        trace!("sent {} bytes", sent);
        Ok(sent)
    }

    async fn recv_by_deadline<'a>(&'a self, buf: &'a mut [u8]) -> io::Result<usize> {
        let deadline: Instant = self.deadline()?;
        let received: usize = timeout_at(deadline, self.inner.recv(buf))
            .await
            .map_err(|_| self.elapsed())??;
        trace!("received {} bytes", received);
        Ok(received)
    }

    fn elapsed(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::TimedOut,
            format!("deadline of {:?} elapsed", self.timeout),
        )
    }
}

impl<T: Transport> Transport for DeadlineTransport<T> {
    fn send<'a>(&'a self, buf: &'a [u8]) -> IoFuture<'a> {
        Box::pin(self.send_by_deadline(buf))
    }

    fn recv<'a>(&'a self, buf: &'a mut [u8]) -> IoFuture<'a> {
        Box::pin(self.recv_by_deadline(buf))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }
}
