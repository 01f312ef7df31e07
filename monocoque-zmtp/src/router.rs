//! ROUTER socket implementation
//!
//! ROUTER sockets accept any number of peer connections, tag every received
//! message with the sending peer's identity, and route outgoing messages by
//! consulting the destination identity in the first frame.
//!
//! Two construction styles are supported:
//! - `listen()`/`accept()`: a single `RouterSocket` owns a `TcpListener` and
//!   can accept any number of peers into one shared routing table. This is
//!   the path to use for genuine multi-peer fan-in/fan-out.
//! - `new()`/`from_tcp()`/single-stream constructors: wrap one already
//!   connected stream (generic over `S`, e.g. `TcpStream` or `UnixStream`).
//!   Useful when the caller manages accept loops itself and wants one
//!   `RouterSocket` per connection.

use bytes::Bytes;
use compio::io::{AsyncRead, AsyncWrite};
use compio::net::{TcpListener, TcpStream};
use compio::time::timeout;
use monocoque_core::endpoint::Endpoint;
use monocoque_core::error::MonocoqueError;
use monocoque_core::options::SocketOptions;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

use crate::base::SocketBase;
use crate::codec::encode_multipart;
use crate::config::BufferConfig;
use crate::{handshake::perform_handshake_with_timeout, session::SocketType};

static PEER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A short non-blocking probe window used while polling peers for data that
/// may not have arrived yet; keeps `recv()` fair across peers instead of
/// blocking on whichever one is tried first.
const PEER_POLL_TIMEOUT: Duration = Duration::from_millis(1);

struct RouterPeer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    base: SocketBase<S>,
    frames: SmallVec<[Bytes; 4]>,
}

/// ROUTER socket: any number of peer connections, keyed by ZMTP identity.
pub struct RouterSocket<S = TcpStream>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    listener: Option<TcpListener>,
    peers: HashMap<Bytes, RouterPeer<S>>,
    /// Identity most recently accepted or wrapped; backs the single-peer
    /// convenience accessors (`peer_identity`, `has_more`, `events`).
    last_peer: Option<Bytes>,
    config: BufferConfig,
    options: SocketOptions,
}

impl<S> RouterSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-connected stream as a single-peer ROUTER, performing
    /// the ZMTP handshake with default buffer configuration and options.
    pub async fn new(stream: S) -> io::Result<Self> {
        Self::with_options(stream, BufferConfig::large(), SocketOptions::default()).await
    }

    /// Wrap an already-connected stream with a custom buffer configuration.
    pub async fn with_config(stream: S, config: BufferConfig) -> io::Result<Self> {
        Self::with_options(stream, config, SocketOptions::default()).await
    }

    /// Wrap an already-connected stream with custom buffer configuration and
    /// socket options.
    pub async fn with_options(
        stream: S,
        config: BufferConfig,
        options: SocketOptions,
    ) -> io::Result<Self> {
        let mut socket = Self {
            listener: None,
            peers: HashMap::new(),
            last_peer: None,
            config,
            options,
        };
        socket.handshake_and_insert(stream).await?;
        Ok(socket)
    }

    /// Alias kept for the Unix-socket construction path, identical to
    /// `with_options` (generic over `S`).
    pub async fn from_unix_stream_with_options(
        stream: S,
        options: SocketOptions,
    ) -> io::Result<Self> {
        Self::with_options(stream, BufferConfig::large(), options).await
    }

    /// Perform the ZMTP handshake on `stream` and register it as a peer,
    /// auto-generating an identity if the peer didn't self-report one.
    async fn handshake_and_insert(&mut self, mut stream: S) -> io::Result<Bytes> {
        let handshake_result = perform_handshake_with_timeout(
            &mut stream,
            SocketType::Router,
            None,
            Some(self.options.handshake_timeout),
        )
        .await
        .map_err(|e| io::Error::other(format!("Handshake failed: {}", e)))?;

        let identity = handshake_result.peer_identity.unwrap_or_else(|| {
            let id = PEER_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            Bytes::from(format!("peer-{}", id))
        });

        debug!(
            ?identity,
            peer_socket_type = ?handshake_result.peer_socket_type,
            "[ROUTER] handshake complete"
        );

        let base = SocketBase::new(stream, SocketType::Router, self.config.apply_to(self.options.clone()));
        self.peers.insert(
            identity.clone(),
            RouterPeer {
                base,
                frames: SmallVec::new(),
            },
        );
        self.last_peer = Some(identity.clone());

        trace!("[ROUTER] {} peers connected", self.peers.len());
        Ok(identity)
    }

    /// Receive one complete message from any connected peer, with the
    /// sender's identity prepended as the first frame. Polls peers in
    /// round-robin order; dead peers are pruned automatically.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        loop {
            if self.peers.is_empty() {
                // Nothing to poll yet; give `accept()` a chance to run.
                compio::time::sleep(PEER_POLL_TIMEOUT).await;
                continue;
            }

            let ids: Vec<Bytes> = self.peers.keys().cloned().collect();
            let mut dead = Vec::new();

            for id in &ids {
                let peer = self.peers.get_mut(id).expect("id came from peers.keys()");

                if let Some(msg) = Self::try_decode_one(peer)? {
                    let mut out = Vec::with_capacity(msg.len() + 1);
                    out.push(id.clone());
                    out.extend(msg);
                    trace!(identity = ?id, frames = out.len(), "[ROUTER] received");
                    return Ok(Some(out));
                }

                match timeout(PEER_POLL_TIMEOUT, peer.base.read_raw()).await {
                    Ok(Ok(0)) => {
                        debug!(identity = ?id, "[ROUTER] peer disconnected");
                        dead.push(id.clone());
                    }
                    Ok(Ok(_)) => {
                        if let Some(msg) = Self::try_decode_one(peer)? {
                            let mut out = Vec::with_capacity(msg.len() + 1);
                            out.push(id.clone());
                            out.extend(msg);
                            trace!(identity = ?id, frames = out.len(), "[ROUTER] received");
                            return Ok(Some(out));
                        }
                    }
                    Ok(Err(e)) => {
                        debug!(identity = ?id, error = %e, "[ROUTER] read error");
                        dead.push(id.clone());
                    }
                    Err(_) => {
                        // No data within the poll window; move to the next peer.
                    }
                }
            }

            for id in dead {
                self.peers.remove(&id);
                debug!(identity = ?id, "[ROUTER] pruned dead peer");
            }
        }
    }

    /// Drain every already-decodable frame in a peer's buffer and return
    /// the message if it completes, without issuing any I/O.
    fn try_decode_one(peer: &mut RouterPeer<S>) -> io::Result<Option<Vec<Bytes>>> {
        while let Some(frame) = peer.base.decoder.decode(&mut peer.base.recv)? {
            let more = frame.more();
            peer.frames.push(frame.payload);
            if !more {
                return Ok(Some(peer.frames.drain(..).collect()));
            }
        }
        Ok(None)
    }

    /// Send a message immediately. The first frame must be the destination
    /// identity. With `router_mandatory` set, an unroutable destination
    /// fails with `HostUnreachable`; otherwise it is silently dropped,
    /// matching ROUTER's default behavior.
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        let Some(dest) = msg.first().cloned() else {
            return Ok(());
        };

        let Some(peer) = self.peers.get_mut(&dest) else {
            if self.options.router_mandatory {
                debug!(destination = ?dest, "[ROUTER] ROUTER_MANDATORY: unroutable destination");
                return Err(MonocoqueError::HostUnreachable(format!("{:?}", dest)).into());
            }
            debug!(destination = ?dest, "[ROUTER] dropping message to unknown peer identity");
            return Ok(());
        };

        let frames_to_send = &msg[1..];
        peer.base.write_buf.clear();
        encode_multipart(frames_to_send, &mut peer.base.write_buf);
        peer.base.write_from_buf().await?;

        trace!(destination = ?dest, "[ROUTER] message sent");
        Ok(())
    }

    /// Buffer a message for a peer without flushing. Call `flush()` to send.
    pub fn send_buffered(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        let Some(dest) = msg.first().cloned() else {
            return Ok(());
        };

        let Some(peer) = self.peers.get_mut(&dest) else {
            if self.options.router_mandatory {
                return Err(MonocoqueError::HostUnreachable(format!("{:?}", dest)).into());
            }
            debug!(destination = ?dest, "[ROUTER] dropping buffered message to unknown peer identity");
            return Ok(());
        };

        let frames_to_send = &msg[1..];
        encode_multipart(frames_to_send, &mut peer.base.send_buffer);
        Ok(())
    }

    /// Flush every peer's buffered bytes to the network.
    pub async fn flush(&mut self) -> io::Result<()> {
        for (id, peer) in self.peers.iter_mut() {
            if !peer.base.send_buffer.is_empty() {
                trace!(identity = ?id, bytes = peer.base.send_buffer.len(), "[ROUTER] flushing");
                peer.base.flush_send_buffer().await?;
            }
        }
        Ok(())
    }

    /// Buffer and flush multiple messages in one call.
    pub async fn send_batch(&mut self, messages: &[Vec<Bytes>]) -> io::Result<()> {
        for msg in messages {
            self.send_buffered(msg.clone())?;
        }
        self.flush().await
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Total bytes currently buffered across all peers.
    pub fn buffered_bytes(&self) -> usize {
        self.peers.values().map(|p| p.base.send_buffer.len()).sum()
    }

    #[inline]
    pub fn options(&self) -> &SocketOptions {
        &self.options
    }

    #[inline]
    pub fn options_mut(&mut self) -> &mut SocketOptions {
        &mut self.options
    }

    #[inline]
    pub fn set_options(&mut self, options: SocketOptions) {
        self.options = options;
    }

    /// Identity of the most recently accepted/wrapped peer.
    ///
    /// For a `RouterSocket` constructed from a single stream this is simply
    /// that peer's identity. For a multi-peer socket built with
    /// `listen()`/`accept()`, route replies by the identity returned from
    /// each `recv()` instead of relying on this method.
    pub fn peer_identity(&self) -> &Bytes {
        self.last_peer
            .as_ref()
            .expect("peer_identity() called before any peer connected")
    }

    /// Whether the most recently accepted/wrapped peer has a partially
    /// decoded multipart message buffered.
    pub fn has_more(&self) -> bool {
        self.last_peer
            .as_ref()
            .and_then(|id| self.peers.get(id))
            .map(|peer| peer.base.has_more())
            .unwrap_or(false)
    }

    /// Poll-style event bitmask (`ZMQ_EVENTS`) for the most recently
    /// accepted/wrapped peer.
    pub fn events(&self) -> u32 {
        self.last_peer
            .as_ref()
            .and_then(|id| self.peers.get(id))
            .map(|peer| peer.base.events())
            .unwrap_or(0)
    }

    /// Last connected/bound endpoint of the most recently accepted/wrapped
    /// peer, if known.
    pub fn last_endpoint(&self) -> Option<&Endpoint> {
        self.last_peer
            .as_ref()
            .and_then(|id| self.peers.get(id))
            .and_then(|peer| peer.base.endpoint.as_ref())
    }

    /// Sets the identity a subsequently-accepted/wrapped peer should be
    /// addressed with, if the transport doesn't negotiate one itself.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_CONNECT_ROUTING_ID` (61).
    pub fn set_connect_routing_id(&mut self, id: Bytes) {
        self.options.connect_routing_id = Some(id);
    }

    /// Enable or disable ROUTER_HANDOVER semantics for identity collisions.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_ROUTER_HANDOVER` (56).
    pub fn set_router_handover(&mut self, enabled: bool) {
        self.options.router_handover = enabled;
    }
}

impl RouterSocket<TcpStream> {
    /// Bind and accept listening for peers, returning the remaining
    /// `TcpListener` and a `RouterSocket` already holding one connected
    /// peer. Call `listener.accept()` yourself to feed more connections
    /// into their own `RouterSocket` (via `from_tcp`), or use `listen()`
    /// instead if you want a single socket that accepts any number of
    /// peers into one shared routing table.
    pub async fn bind(addr: &str) -> io::Result<(TcpListener, Self)> {
        Self::bind_with_options(addr, BufferConfig::large(), SocketOptions::default()).await
    }

    /// `bind()` with a custom buffer configuration and socket options.
    pub async fn bind_with_options(
        addr: &str,
        config: BufferConfig,
        options: SocketOptions,
    ) -> io::Result<(TcpListener, Self)> {
        let listener = TcpListener::bind(addr).await?;
        debug!(addr = %listener.local_addr()?, "[ROUTER] bound");

        let mut socket = Self {
            listener: None,
            peers: HashMap::new(),
            last_peer: None,
            config,
            options,
        };
        let (stream, peer_addr) = listener.accept().await?;
        debug!(addr = %peer_addr, "[ROUTER] accepted connection");
        socket.handshake_and_insert(stream).await?;
        Ok((listener, socket))
    }

    /// Bind to an address and return a `RouterSocket` that owns its own
    /// listener; call `accept()` any number of times to add peers to the
    /// same shared routing table.
    pub async fn listen(addr: &str) -> io::Result<Self> {
        Self::listen_with_options(addr, BufferConfig::large(), SocketOptions::default()).await
    }

    /// `listen()` with a custom buffer configuration and socket options.
    pub async fn listen_with_options(
        addr: &str,
        config: BufferConfig,
        options: SocketOptions,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        debug!(addr = %listener.local_addr()?, "[ROUTER] listening");
        Ok(Self {
            listener: Some(listener),
            peers: HashMap::new(),
            last_peer: None,
            config,
            options,
        })
    }

    /// Accept one pending peer connection on this socket's own listener
    /// (only available after `listen()`), performing the ZMTP handshake
    /// and registering it under its identity.
    pub async fn accept(&mut self) -> io::Result<Bytes> {
        let listener = self.listener.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                "RouterSocket has no listener; construct it with listen() to accept peers",
            )
        })?;
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "[ROUTER] accepted connection");
        self.handshake_and_insert(stream).await
    }

    /// Wrap an already-connected TCP stream, enabling `TCP_NODELAY`.
    pub async fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        Self::from_tcp_with_config(stream, BufferConfig::large()).await
    }

    /// `from_tcp` with a custom buffer configuration.
    pub async fn from_tcp_with_config(stream: TcpStream, config: BufferConfig) -> io::Result<Self> {
        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;
        Self::with_options(stream, config, SocketOptions::default()).await
    }

    /// `from_tcp` with custom socket options (large buffer configuration).
    pub async fn from_tcp_with_options(stream: TcpStream, options: SocketOptions) -> io::Result<Self> {
        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;
        Self::with_options(stream, BufferConfig::large(), options).await
    }

    /// Deprecated alias for `from_tcp`, kept for older call sites.
    #[deprecated(note = "use from_tcp instead")]
    pub async fn from_stream(stream: TcpStream) -> io::Result<Self> {
        Self::from_tcp(stream).await
    }

    /// Address this socket's listener is bound to, if it owns one.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        match &self.listener {
            Some(listener) => listener.local_addr(),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "RouterSocket has no listener",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dealer::DealerSocket;

    #[compio::test]
    async fn test_router_multi_peer_routing() {
        let mut router = RouterSocket::listen("127.0.0.1:0").await.unwrap();
        let addr = router.local_addr().unwrap().to_string();

        let stream_a = compio::net::TcpStream::connect(&addr).await.unwrap();
        let dealer_a = DealerSocket::new(stream_a).await;
        let id_a = router.accept().await.unwrap();

        let stream_b = compio::net::TcpStream::connect(&addr).await.unwrap();
        let dealer_b = DealerSocket::new(stream_b).await;
        let id_b = router.accept().await.unwrap();

        assert_ne!(id_a, id_b);
        assert_eq!(router.peer_count(), 2);

        dealer_a
            .send(vec![Bytes::from_static(b"from-a")])
            .await
            .unwrap();

        let received = router.recv().await.unwrap().unwrap();
        assert_eq!(received.len(), 2);
        let sender = received[0].clone();
        assert_eq!(received[1], Bytes::from_static(b"from-a"));
        assert!(sender == id_a || sender == id_b);

        router
            .send(vec![sender.clone(), Bytes::from_static(b"reply")])
            .await
            .unwrap();

        let reply = if sender == id_a {
            dealer_a.recv().await.unwrap()
        } else {
            dealer_b.recv().await.unwrap()
        };
        assert_eq!(reply, vec![Bytes::from_static(b"reply")]);
    }

    #[compio::test]
    async fn test_router_mandatory_unroutable_destination() {
        let mut router = RouterSocket::listen_with_options(
            "127.0.0.1:0",
            BufferConfig::large(),
            SocketOptions::default().with_router_mandatory(true),
        )
        .await
        .unwrap();

        let err = router
            .send(vec![Bytes::from_static(b"nobody"), Bytes::from_static(b"x")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[compio::test]
    async fn test_router_non_mandatory_drops_silently() {
        let mut router = RouterSocket::listen("127.0.0.1:0").await.unwrap();
        router
            .send(vec![Bytes::from_static(b"nobody"), Bytes::from_static(b"x")])
            .await
            .unwrap();
    }

    #[compio::test]
    async fn test_from_tcp_single_peer_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let stream = compio::net::TcpStream::connect(&addr).await.unwrap();
        let dealer = DealerSocket::new(stream).await;
        let (server_stream, _) = listener.accept().await.unwrap();
        let mut router = RouterSocket::from_tcp(server_stream).await.unwrap();

        let identity = router.peer_identity().clone();
        dealer.send(vec![Bytes::from_static(b"hi")]).await.unwrap();

        let received = router.recv().await.unwrap().unwrap();
        assert_eq!(received[0], identity);
        assert_eq!(received[1], Bytes::from_static(b"hi"));
    }
}
