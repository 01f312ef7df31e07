//! ROUTER socket implementation.

use bytes::Bytes;
use compio::io::{AsyncRead, AsyncWrite};
use compio::net::{TcpListener, TcpStream};
use monocoque_core::monitor::{create_monitor, SocketEvent, SocketEventSender, SocketMonitor};
use monocoque_core::options::SocketOptions;
use monocoque_zmtp::config::BufferConfig;
use monocoque_zmtp::router::RouterSocket as InternalRouter;
use monocoque_zmtp::SocketType;
use std::io;

/// A ROUTER socket for identity-based routing.
///
/// ROUTER accepts any number of peer connections, prefixes every received
/// message with the sender's identity, and routes outgoing messages by
/// consulting the destination identity in the first frame. Used for:
///
/// - Async request-reply servers
/// - Brokers and proxies
/// - Stateful connection tracking
///
/// ## ZeroMQ Compatibility
///
/// Compatible with `zmq::ROUTER` talking to `zmq::DEALER`/`zmq::REQ` peers.
///
/// ## Message Format
///
/// **Incoming**: `[identity, ...user_frames]`\
/// **Outgoing**: `[identity, ...user_frames]` (routed to the peer with that identity)
///
/// ## Example
///
/// ```rust,no_run
/// use monocoque::zmq::RouterSocket;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut socket = RouterSocket::listen("127.0.0.1:5555").await?;
/// socket.accept().await?;
///
/// // Echo server
/// while let Some(msg) = socket.recv().await {
///     socket.send(msg).await?; // Echo back to sender
/// }
/// # Ok(())
/// # }
/// ```
pub struct RouterSocket<S = TcpStream>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    inner: InternalRouter<S>,
    monitor: Option<SocketEventSender>,
}

impl<S> RouterSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-connected stream as a single-peer ROUTER.
    pub async fn new(stream: S) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::new(stream).await?,
            monitor: None,
        })
    }

    /// Wrap an already-connected stream with a custom buffer configuration.
    pub async fn with_config(stream: S, config: BufferConfig) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::with_config(stream, config).await?,
            monitor: None,
        })
    }

    /// Wrap an already-connected stream with custom buffer configuration and
    /// socket options.
    pub async fn with_options(
        stream: S,
        config: BufferConfig,
        options: SocketOptions,
    ) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::with_options(stream, config, options).await?,
            monitor: None,
        })
    }

    /// Wrap an already-connected Unix stream with custom socket options.
    pub async fn from_unix_stream_with_options(stream: S, options: SocketOptions) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::from_unix_stream_with_options(stream, options).await?,
            monitor: None,
        })
    }

    /// Enable monitoring for this socket.
    ///
    /// Returns a receiver for socket lifecycle events.
    pub fn monitor(&mut self) -> SocketMonitor {
        let (sender, receiver) = create_monitor();
        self.monitor = Some(sender);
        receiver
    }

    fn emit_event(&self, event: SocketEvent) {
        if let Some(monitor) = &self.monitor {
            let _ = monitor.send(event);
        }
    }

    /// Receive a multipart message from any connected peer.
    ///
    /// The returned message has the sender's identity as the first frame,
    /// followed by the payload frames. Returns `None` only on an unrecoverable
    /// I/O error; a disconnected peer is pruned internally and polling
    /// continues with the remaining peers.
    pub async fn recv(&mut self) -> Option<Vec<Bytes>> {
        self.inner.recv().await.ok().flatten()
    }

    /// Send a multipart message. The first frame must be the destination
    /// peer identity.
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.inner.send(msg).await
    }

    /// Buffer a message for its destination peer without flushing.
    pub fn send_buffered(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.inner.send_buffered(msg)
    }

    /// Flush every peer's buffered bytes to the network.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }

    /// Buffer and flush multiple messages in one call.
    pub async fn send_batch(&mut self, messages: &[Vec<Bytes>]) -> io::Result<()> {
        self.inner.send_batch(messages).await
    }

    /// Total bytes currently buffered across all peers.
    #[inline]
    pub fn buffered_bytes(&self) -> usize {
        self.inner.buffered_bytes()
    }

    /// Number of currently connected peers.
    #[inline]
    pub fn peer_count(&self) -> usize {
        self.inner.peer_count()
    }

    /// Get the socket type.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_TYPE` (16) option.
    #[inline]
    pub const fn socket_type() -> SocketType {
        SocketType::Router
    }

    /// Enable or disable ROUTER_MANDATORY mode.
    ///
    /// When enabled, sending to an identity with no connected peer returns
    /// `HostUnreachable`. When disabled (default), such messages are
    /// silently dropped instead.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_ROUTER_MANDATORY` (33).
    pub fn set_router_mandatory(&mut self, enabled: bool) {
        self.inner.options_mut().router_mandatory = enabled;
    }

    /// Identity of the most recently accepted/wrapped peer.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_IDENTITY` read back from the peer side.
    pub fn peer_identity(&self) -> &Bytes {
        self.inner.peer_identity()
    }

    /// Whether the most recently accepted/wrapped peer has a partially
    /// decoded multipart message buffered.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_RCVMORE` (13).
    pub fn has_more(&self) -> bool {
        self.inner.has_more()
    }

    /// Poll-style event bitmask for the most recently accepted/wrapped peer.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_EVENTS` (15).
    pub fn events(&self) -> u32 {
        self.inner.events()
    }

    /// Last connected/bound endpoint of the most recently accepted/wrapped
    /// peer, if known.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_LAST_ENDPOINT` (32).
    pub fn last_endpoint(&self) -> Option<&monocoque_core::endpoint::Endpoint> {
        self.inner.last_endpoint()
    }

    /// Sets the identity a subsequently-accepted/wrapped peer should be
    /// addressed with.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_CONNECT_ROUTING_ID` (61).
    pub fn set_connect_routing_id(&mut self, id: Bytes) {
        self.inner.set_connect_routing_id(id);
    }

    /// Enable or disable ROUTER_HANDOVER semantics for identity collisions.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_ROUTER_HANDOVER` (56).
    pub fn set_router_handover(&mut self, enabled: bool) {
        self.inner.set_router_handover(enabled);
    }
}

impl RouterSocket<TcpStream> {
    /// Bind and accept one peer connection, returning the remaining
    /// `TcpListener` for accepting further independent connections.
    pub async fn bind(addr: &str) -> io::Result<(TcpListener, Self)> {
        let (listener, inner) = InternalRouter::bind(addr).await?;
        Ok((listener, Self { inner, monitor: None }))
    }

    /// Bind with custom socket options.
    pub async fn bind_with_options(addr: &str, options: SocketOptions) -> io::Result<(TcpListener, Self)> {
        let (listener, inner) =
            InternalRouter::bind_with_options(addr, BufferConfig::large(), options).await?;
        Ok((listener, Self { inner, monitor: None }))
    }

    /// Bind to an address and hold the listener so any number of peers can
    /// be accepted into one shared routing table.
    pub async fn listen(addr: &str) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::listen(addr).await?,
            monitor: None,
        })
    }

    /// `listen()` with custom socket options.
    pub async fn listen_with_options(addr: &str, options: SocketOptions) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::listen_with_options(addr, BufferConfig::large(), options).await?,
            monitor: None,
        })
    }

    /// Accept one pending peer connection on this socket's own listener
    /// (only available after `listen()`), performing the ZMTP handshake and
    /// registering it under its identity.
    pub async fn accept(&mut self) -> io::Result<Bytes> {
        let identity = self.inner.accept().await?;
        self.emit_event(SocketEvent::Accepted(monocoque_core::endpoint::Endpoint::Tcp(
            self.local_addr()?,
        )));
        Ok(identity)
    }

    /// Wrap an already-connected TCP stream.
    pub async fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::from_tcp(stream).await?,
            monitor: None,
        })
    }

    /// `from_tcp` with a custom buffer configuration.
    pub async fn from_tcp_with_config(stream: TcpStream, config: BufferConfig) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::from_tcp_with_config(stream, config).await?,
            monitor: None,
        })
    }

    /// `from_tcp` with custom socket options (large buffer configuration).
    pub async fn from_tcp_with_options(stream: TcpStream, options: SocketOptions) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::from_tcp_with_options(stream, options).await?,
            monitor: None,
        })
    }

    /// Deprecated alias for `from_tcp`, kept for older call sites.
    #[deprecated(note = "use from_tcp instead")]
    pub async fn from_stream(stream: TcpStream) -> io::Result<Self> {
        Self::from_tcp(stream).await
    }

    /// Get the local bound address.
    #[inline]
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.inner.local_addr()
    }
}

// Implement ProxySocket for the high-level RouterSocket wrapper
impl<S> monocoque_zmtp::proxy::ProxySocket for RouterSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn recv_multipart<'life0, 'async_trait>(
        &'life0 mut self,
    ) -> ::core::pin::Pin<Box<dyn ::core::future::Future<Output = io::Result<Option<Vec<Bytes>>>> + 'async_trait>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { Ok(self.recv().await) })
    }

    fn send_multipart<'life0, 'async_trait>(
        &'life0 mut self,
        msg: Vec<Bytes>,
    ) -> ::core::pin::Pin<Box<dyn ::core::future::Future<Output = io::Result<()>> + 'async_trait>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { self.send(msg).await })
    }

    fn socket_desc(&self) -> &'static str {
        "ROUTER"
    }
}
