//! PULL socket implementation
//!
//! PULL sockets are receive-only endpoints in the pipeline pattern. They receive
//! messages from connected PUSH sockets in a fair-queued manner.
//!
//! Two construction styles are supported, mirroring `router.rs`:
//! - `listen()`/`accept()`: a single `PullSocket` owns a `TcpListener` and
//!   can accept any number of PUSH peers, fair-queuing `recv()` across all
//!   of them. This is the path to use for genuine multi-peer fan-in.
//! - `new()`/`from_tcp()`/single-stream constructors: wrap one already
//!   connected stream. Useful when the caller manages its own accept loop.
//!
//! # Characteristics
//!
//! - **Receive-only**: Cannot send messages
//! - **Fair-queued**: Receives from all PUSH sockets fairly
//! - **Pipeline pattern**: For receiving tasks from distributors
//! - **No filtering**: All messages are delivered
//!
//! # Use Cases
//!
//! - Task receiver (worker pattern)
//! - Parallel pipeline processing
//! - Work queue consumption

use crate::base::SocketBase;
use crate::{handshake::perform_handshake_with_timeout, session::SocketType};
use bytes::Bytes;
use compio::io::{AsyncRead, AsyncWrite};
use compio::net::{TcpListener, TcpStream};
use compio::time::timeout;
use crate::config::BufferConfig;
use monocoque_core::options::SocketOptions;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::io;
use std::time::Duration;
use tracing::{debug, trace};

/// A short non-blocking probe window used while polling peers for data that
/// may not have arrived yet; keeps `recv()` fair across peers instead of
/// blocking on whichever one is tried first.
const PEER_POLL_TIMEOUT: Duration = Duration::from_millis(1);

struct PullPeer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    base: SocketBase<S>,
    frames: SmallVec<[Bytes; 4]>,
}

/// PULL socket for receiving messages in a pipeline.
///
/// PULL sockets receive messages from connected PUSH sockets, providing
/// the worker side of the pipeline pattern.
pub struct PullSocket<S = TcpStream>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    listener: Option<TcpListener>,
    peers: HashMap<u64, PullPeer<S>>,
    next_id: u64,
    config: BufferConfig,
    options: SocketOptions,
}

impl<S> PullSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new PULL socket from a stream with default buffer configuration.
    pub async fn new(stream: S) -> io::Result<Self> {
        Self::with_options(stream, BufferConfig::default(), SocketOptions::default()).await
    }

    /// Create a new PULL socket with custom buffer configuration.
    pub async fn with_config(stream: S, config: BufferConfig) -> io::Result<Self> {
        Self::with_options(stream, config, SocketOptions::default()).await
    }

    /// Create a new PULL socket with custom buffer configuration and socket options.
    pub async fn with_options(
        stream: S,
        config: BufferConfig,
        options: SocketOptions,
    ) -> io::Result<Self> {
        let mut socket = Self {
            listener: None,
            peers: HashMap::new(),
            next_id: 0,
            config,
            options,
        };
        socket.handshake_and_insert(stream).await?;
        Ok(socket)
    }

    /// Perform the ZMTP handshake on `stream` and register it as a peer.
    async fn handshake_and_insert(&mut self, mut stream: S) -> io::Result<u64> {
        debug!("[PULL] Performing ZMTP handshake...");
        let handshake_result = perform_handshake_with_timeout(
            &mut stream,
            SocketType::Pull,
            None,
            Some(self.options.handshake_timeout),
        )
        .await
        .map_err(|e| io::Error::other(format!("Handshake failed: {}", e)))?;

        debug!(
            peer_identity = ?handshake_result.peer_identity,
            peer_socket_type = ?handshake_result.peer_socket_type,
            "[PULL] Handshake complete"
        );

        let id = self.next_id;
        self.next_id += 1;

        let base = SocketBase::new(stream, SocketType::Pull, self.config.apply_to(self.options.clone()));
        self.peers.insert(id, PullPeer { base, frames: SmallVec::new() });

        trace!("[PULL] {} peers connected", self.peers.len());
        Ok(id)
    }

    /// Receive a message from any connected PUSH socket, fair-queued across
    /// every currently connected peer. Dead peers are pruned automatically.
    ///
    /// Returns `Ok(None)` only once every connected peer has disconnected
    /// and no listener is available to accept more; with a `listen()`-backed
    /// socket that currently has zero peers, it waits for `accept()` to add
    /// one instead of returning immediately.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        trace!("[PULL] Waiting for message");

        loop {
            if self.peers.is_empty() {
                if self.listener.is_some() {
                    compio::time::sleep(PEER_POLL_TIMEOUT).await;
                    continue;
                }
                return Ok(None);
            }

            let ids: Vec<u64> = self.peers.keys().copied().collect();
            let mut dead = Vec::new();

            for id in &ids {
                let peer = self.peers.get_mut(id).expect("id came from peers.keys()");

                if let Some(msg) = Self::try_decode_one(peer)? {
                    trace!(peer = id, frames = msg.len(), "[PULL] received");
                    return Ok(Some(msg));
                }

                match timeout(PEER_POLL_TIMEOUT, peer.base.read_raw()).await {
                    Ok(Ok(0)) => {
                        debug!(peer = id, "[PULL] peer disconnected");
                        dead.push(*id);
                    }
                    Ok(Ok(_)) => {
                        if let Some(msg) = Self::try_decode_one(peer)? {
                            trace!(peer = id, frames = msg.len(), "[PULL] received");
                            return Ok(Some(msg));
                        }
                    }
                    Ok(Err(e)) => {
                        debug!(peer = id, error = %e, "[PULL] read error");
                        dead.push(*id);
                    }
                    Err(_) => {
                        // No data within the poll window; move to the next peer.
                    }
                }
            }

            for id in dead {
                self.peers.remove(&id);
                debug!(peer = id, "[PULL] pruned dead peer");
            }

            if self.peers.is_empty() && self.listener.is_none() {
                return Ok(None);
            }
        }
    }

    /// Drain every already-decodable frame in a peer's buffer and return
    /// the message if it completes, without issuing any I/O.
    fn try_decode_one(peer: &mut PullPeer<S>) -> io::Result<Option<Vec<Bytes>>> {
        while let Some(frame) = peer.base.decoder.decode(&mut peer.base.recv)? {
            let more = frame.more();
            peer.frames.push(frame.payload);
            if !more {
                return Ok(Some(peer.frames.drain(..).collect()));
            }
        }
        Ok(None)
    }

    /// Close the socket gracefully.
    pub async fn close(self) -> io::Result<()> {
        trace!("[PULL] Closing socket");
        Ok(())
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Get a reference to the socket options.
    #[inline]
    pub fn options(&self) -> &SocketOptions {
        &self.options
    }

    /// Get a mutable reference to the socket options.
    #[inline]
    pub fn options_mut(&mut self) -> &mut SocketOptions {
        &mut self.options
    }

    /// Set socket options (builder-style).
    #[inline]
    pub fn set_options(&mut self, options: SocketOptions) {
        self.options = options;
    }
}

// Specialized implementation for TCP streams to enable TCP_NODELAY and
// multi-peer listening.
impl PullSocket<TcpStream> {
    /// Create a new PULL socket from a TCP stream with TCP_NODELAY enabled.
    pub async fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        Self::from_tcp_with_config(stream, BufferConfig::default()).await
    }

    /// Create a new PULL socket from a TCP stream with TCP_NODELAY and custom config.
    pub async fn from_tcp_with_config(
        stream: TcpStream,
        config: BufferConfig,
    ) -> io::Result<Self> {
        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;
        debug!("[PULL] TCP_NODELAY enabled");
        Self::with_options(stream, config, SocketOptions::default()).await
    }

    /// Create a new PULL socket from a TCP stream with TCP_NODELAY and custom options.
    pub async fn from_tcp_with_options(
        stream: TcpStream,
        options: SocketOptions,
    ) -> io::Result<Self> {
        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;
        debug!("[PULL] TCP_NODELAY enabled");
        Self::with_options(stream, BufferConfig::default(), options).await
    }

    /// Bind to an address and hold the listener so any number of PUSH peers
    /// can be accepted into one fair-queued socket.
    pub async fn listen(addr: &str) -> io::Result<Self> {
        Self::listen_with_options(addr, BufferConfig::default(), SocketOptions::default()).await
    }

    /// `listen()` with custom buffer configuration and socket options.
    pub async fn listen_with_options(
        addr: &str,
        config: BufferConfig,
        options: SocketOptions,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        debug!(addr = %listener.local_addr()?, "[PULL] listening");
        Ok(Self {
            listener: Some(listener),
            peers: HashMap::new(),
            next_id: 0,
            config,
            options,
        })
    }

    /// Accept one pending PUSH connection on this socket's own listener
    /// (only available after `listen()`).
    pub async fn accept(&mut self) -> io::Result<()> {
        let listener = self.listener.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                "PullSocket has no listener; construct it with listen() to accept peers",
            )
        })?;
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "[PULL] accepted connection");
        self.handshake_and_insert(stream).await?;
        Ok(())
    }

    /// Get the local bound address.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        match &self.listener {
            Some(listener) => listener.local_addr(),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "PullSocket has no listener",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::PushSocket;

    #[compio::test]
    async fn test_single_peer_roundtrip() {
        let mut pull = PullSocket::listen("127.0.0.1:0").await.unwrap();
        let addr = pull.local_addr().unwrap().to_string();

        let connect = async {
            let stream = TcpStream::connect(&addr).await.unwrap();
            PushSocket::new(stream).await.unwrap()
        };
        let (mut push, accept) = futures::join!(connect, pull.accept());
        accept.unwrap();

        push.send(vec![Bytes::from_static(b"hello")]).await.unwrap();
        let msg = pull.recv().await.unwrap().unwrap();
        assert_eq!(msg, vec![Bytes::from_static(b"hello")]);
    }

    #[compio::test]
    async fn test_multi_peer_fair_queue() {
        let mut pull = PullSocket::listen("127.0.0.1:0").await.unwrap();
        let addr = pull.local_addr().unwrap().to_string();

        let connect_a = async {
            let stream = TcpStream::connect(&addr).await.unwrap();
            PushSocket::new(stream).await.unwrap()
        };
        let (mut push_a, accept_a) = futures::join!(connect_a, pull.accept());
        accept_a.unwrap();

        let connect_b = async {
            let stream = TcpStream::connect(&addr).await.unwrap();
            PushSocket::new(stream).await.unwrap()
        };
        let (mut push_b, accept_b) = futures::join!(connect_b, pull.accept());
        accept_b.unwrap();

        assert_eq!(pull.peer_count(), 2);

        push_a.send(vec![Bytes::from_static(b"from-a")]).await.unwrap();
        push_b.send(vec![Bytes::from_static(b"from-b")]).await.unwrap();

        let mut received: Vec<Bytes> = Vec::new();
        for _ in 0..2 {
            let msg = pull.recv().await.unwrap().unwrap();
            received.push(msg[0].clone());
        }
        received.sort();
        assert_eq!(received, vec![Bytes::from_static(b"from-a"), Bytes::from_static(b"from-b")]);
    }
}
