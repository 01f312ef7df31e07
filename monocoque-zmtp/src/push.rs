//! PUSH socket implementation
//!
//! PUSH sockets are send-only endpoints in the pipeline pattern. They distribute
//! messages in a round-robin fashion to connected PULL sockets.
//!
//! Two construction styles are supported, mirroring `router.rs`:
//! - `listen()`/`accept()`: a single `PushSocket` owns a `TcpListener` and
//!   can accept any number of PULL peers, load-balancing `send()` across
//!   all of them round-robin. This is the path to use for genuine
//!   multi-peer fan-out.
//! - `new()`/`from_tcp()`/single-stream constructors: wrap one already
//!   connected stream. Useful when the caller manages its own accept loop.
//!
//! # Characteristics
//!
//! - **Send-only**: Cannot receive messages
//! - **Load balancing**: Distributes work across PULL sockets
//! - **Non-blocking**: Never blocks on slow receivers (drops if HWM reached)
//! - **Pipeline pattern**: For distributing tasks to workers
//!
//! # Use Cases
//!
//! - Task distribution (ventilator pattern)
//! - Parallel pipeline processing
//! - Work queue distribution

use crate::base::SocketBase;
use crate::codec::encode_multipart;
use crate::{handshake::perform_handshake_with_timeout, session::SocketType};
use bytes::Bytes;
use compio::io::{AsyncRead, AsyncWrite};
use compio::net::{TcpListener, TcpStream};
use monocoque_core::options::SocketOptions;
use std::collections::HashMap;
use std::io;
use tracing::{debug, trace};

struct PushPeer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    base: SocketBase<S>,
}

/// PUSH socket for distributing messages in a pipeline.
///
/// PUSH sockets send messages to connected PULL sockets in a round-robin
/// fashion, providing load balancing for parallel processing.
pub struct PushSocket<S = TcpStream>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    listener: Option<TcpListener>,
    peers: HashMap<u64, PushPeer<S>>,
    /// Stable round-robin order, independent of `HashMap` iteration order.
    order: Vec<u64>,
    next_id: u64,
    rr_cursor: usize,
    options: SocketOptions,
}

impl<S> PushSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new PUSH socket from a stream with default buffer configuration.
    pub async fn new(stream: S) -> io::Result<Self> {
        Self::with_options(stream, SocketOptions::default()).await
    }

    /// Create a new PUSH socket with custom buffer configuration and socket options.
    pub async fn with_options(stream: S, options: SocketOptions) -> io::Result<Self> {
        let mut socket = Self {
            listener: None,
            peers: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
            rr_cursor: 0,
            options,
        };
        socket.handshake_and_insert(stream).await?;
        Ok(socket)
    }

    /// Perform the ZMTP handshake on `stream` and register it as a peer.
    async fn handshake_and_insert(&mut self, mut stream: S) -> io::Result<u64> {
        debug!("[PUSH] Performing ZMTP handshake...");
        let handshake_result = perform_handshake_with_timeout(
            &mut stream,
            SocketType::Push,
            None,
            Some(self.options.handshake_timeout),
        )
        .await
        .map_err(|e| io::Error::other(format!("Handshake failed: {}", e)))?;

        debug!(
            peer_identity = ?handshake_result.peer_identity,
            peer_socket_type = ?handshake_result.peer_socket_type,
            "[PUSH] Handshake complete"
        );

        let id = self.next_id;
        self.next_id += 1;

        let base = SocketBase::new(stream, SocketType::Push, self.options.clone());
        self.peers.insert(id, PushPeer { base });
        self.order.push(id);

        trace!("[PUSH] {} peers connected", self.peers.len());
        Ok(id)
    }

    /// Send a message to a connected PULL socket.
    ///
    /// Messages are distributed round-robin across every currently
    /// connected peer. If no peer is connected, the message is silently
    /// dropped (PUSH never blocks waiting for a receiver).
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen peer's write fails; that peer is
    /// then pruned so the next `send()` picks a live one.
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        if self.order.is_empty() {
            trace!("[PUSH] no connected peers; dropping message");
            return Ok(());
        }

        let idx = self.rr_cursor % self.order.len();
        let id = self.order[idx];
        self.rr_cursor = self.rr_cursor.wrapping_add(1);

        let peer = self.peers.get_mut(&id).expect("id came from order");
        peer.base.write_buf.clear();
        encode_multipart(&msg, &mut peer.base.write_buf);

        match peer.base.write_from_buf().await {
            Ok(()) => {
                trace!(peer = id, "[PUSH] message sent successfully");
                Ok(())
            }
            Err(e) => {
                debug!(peer = id, error = %e, "[PUSH] write failed, pruning peer");
                self.peers.remove(&id);
                self.order.retain(|&p| p != id);
                Err(e)
            }
        }
    }

    /// PUSH sockets never receive; always returns `Ok(None)`.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        Ok(None)
    }

    /// Close the socket gracefully.
    pub async fn close(self) -> io::Result<()> {
        trace!("[PUSH] Closing socket");
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
impl PushSocket<TcpStream> {
    /// Create a new PUSH socket from a TCP stream with TCP_NODELAY enabled.
    pub async fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        Self::from_tcp_with_options(stream, SocketOptions::default()).await
    }

    /// Create a new PUSH socket from a TCP stream with TCP_NODELAY and custom options.
    pub async fn from_tcp_with_options(
        stream: TcpStream,
        options: SocketOptions,
    ) -> io::Result<Self> {
        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;
        debug!("[PUSH] TCP_NODELAY enabled");
        Self::with_options(stream, options).await
    }

    /// Bind to an address and hold the listener so any number of PULL peers
    /// can be accepted into one round-robin routing table.
    pub async fn listen(addr: &str) -> io::Result<Self> {
        Self::listen_with_options(addr, SocketOptions::default()).await
    }

    /// `listen()` with custom socket options.
    pub async fn listen_with_options(addr: &str, options: SocketOptions) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        debug!(addr = %listener.local_addr()?, "[PUSH] listening");
        Ok(Self {
            listener: Some(listener),
            peers: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
            rr_cursor: 0,
            options,
        })
    }

    /// Accept one pending PULL connection on this socket's own listener
    /// (only available after `listen()`).
    pub async fn accept(&mut self) -> io::Result<()> {
        let listener = self.listener.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                "PushSocket has no listener; construct it with listen() to accept peers",
            )
        })?;
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "[PUSH] accepted connection");
        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;
        self.handshake_and_insert(stream).await?;
        Ok(())
    }

    /// Get the local bound address.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        match &self.listener {
            Some(listener) => listener.local_addr(),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "PushSocket has no listener",
            )),
        }
    }
}

crate::impl_socket_trait!(PushSocket<S>, SocketType::Push);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pull::PullSocket;

    #[compio::test]
    async fn test_single_peer_roundtrip() {
        let mut push = PushSocket::listen("127.0.0.1:0").await.unwrap();
        let addr = push.local_addr().unwrap().to_string();

        let connect = async {
            let stream = TcpStream::connect(&addr).await.unwrap();
            PullSocket::new(stream).await.unwrap()
        };
        let (mut pull, accept) = futures::join!(connect, push.accept());
        accept.unwrap();

        push.send(vec![Bytes::from_static(b"hello")]).await.unwrap();
        let msg = pull.recv().await.unwrap().unwrap();
        assert_eq!(msg, vec![Bytes::from_static(b"hello")]);
    }

    #[compio::test]
    async fn test_round_robin_across_peers() {
        let mut push = PushSocket::listen("127.0.0.1:0").await.unwrap();
        let addr = push.local_addr().unwrap().to_string();

        let connect_a = async {
            let stream = TcpStream::connect(&addr).await.unwrap();
            PullSocket::new(stream).await.unwrap()
        };
        let (mut pull_a, accept_a) = futures::join!(connect_a, push.accept());
        accept_a.unwrap();

        let connect_b = async {
            let stream = TcpStream::connect(&addr).await.unwrap();
            PullSocket::new(stream).await.unwrap()
        };
        let (mut pull_b, accept_b) = futures::join!(connect_b, push.accept());
        accept_b.unwrap();

        assert_eq!(push.peer_count(), 2);

        push.send(vec![Bytes::from_static(b"one")]).await.unwrap();
        push.send(vec![Bytes::from_static(b"two")]).await.unwrap();

        let first = pull_a.recv().await.unwrap().unwrap();
        let second = pull_b.recv().await.unwrap().unwrap();
        assert_eq!(first, vec![Bytes::from_static(b"one")]);
        assert_eq!(second, vec![Bytes::from_static(b"two")]);
    }
}
