//! PULL socket implementation.
//!
//! PULL sockets are used in pipeline patterns for receiving tasks.

use compio::net::TcpStream;
use monocoque_core::options::SocketOptions;
use monocoque_zmtp::config::BufferConfig;
use monocoque_zmtp::PullSocket as InternalPull;
use std::io;

/// PULL socket for receiving tasks in a pipeline.
///
/// PULL sockets receive messages from connected PUSH sockets.
pub struct PullSocket<S = TcpStream>
where
    S: compio::io::AsyncRead + compio::io::AsyncWrite + Unpin,
{
    inner: InternalPull<S>,
}

impl PullSocket<TcpStream> {
    /// Create a PULL socket from a TCP stream.
    pub async fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        Ok(Self {
            inner: InternalPull::from_tcp(stream).await?,
        })
    }

    /// Create a PULL socket from a TCP stream with custom options.
    pub async fn from_tcp_with_options(
        stream: TcpStream,
        options: SocketOptions,
    ) -> io::Result<Self> {
        Ok(Self {
            inner: InternalPull::from_tcp_with_options(stream, options).await?,
        })
    }

    /// Bind to an address and hold the listener so any number of PUSH peers
    /// can be accepted into one fair-queued socket.
    pub async fn listen(addr: &str) -> io::Result<Self> {
        Ok(Self {
            inner: InternalPull::listen(addr).await?,
        })
    }

    /// `listen()` with custom socket options.
    pub async fn listen_with_options(addr: &str, options: SocketOptions) -> io::Result<Self> {
        Ok(Self {
            inner: InternalPull::listen_with_options(addr, BufferConfig::default(), options).await?,
        })
    }

    /// Accept one pending PUSH connection on this socket's own listener.
    pub async fn accept(&mut self) -> io::Result<()> {
        self.inner.accept().await
    }

    /// Get the local bound address.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.inner.local_addr()
    }
}

impl<S> PullSocket<S>
where
    S: compio::io::AsyncRead + compio::io::AsyncWrite + Unpin,
{
    /// Create a PULL socket from any stream.
    pub async fn new(stream: S) -> io::Result<Self> {
        Ok(Self {
            inner: InternalPull::new(stream).await?,
        })
    }

    /// Create a PULL socket from any stream with custom options.
    pub async fn with_options(stream: S, options: SocketOptions) -> io::Result<Self> {
        Ok(Self {
            inner: InternalPull::with_options(stream, BufferConfig::default(), options).await?,
        })
    }

    /// Receive a message.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<bytes::Bytes>>> {
        self.inner.recv().await
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.inner.peer_count()
    }
}
