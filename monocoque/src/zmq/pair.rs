//! PAIR socket implementation.
//!
//! PAIR sockets form an exclusive, bidirectional connection with exactly
//! one peer. They're mostly used for inter-thread coordination rather
//! than general-purpose messaging.

use bytes::Bytes;
use compio::net::{TcpListener, TcpStream};
use monocoque_zmtp::pair::PairSocket as InternalPair;
use std::io;

/// PAIR socket for exclusive, bidirectional peer-to-peer communication.
pub struct PairSocket<S = TcpStream>
where
    S: compio::io::AsyncRead + compio::io::AsyncWrite + Unpin,
{
    inner: InternalPair<S>,
}

impl PairSocket<TcpStream> {
    /// Bind to an address and accept the first connection.
    ///
    /// Returns the listener (for accepting further reconnects) alongside
    /// the socket bound to the first peer.
    pub async fn bind(addr: &str) -> io::Result<(TcpListener, Self)> {
        let (listener, inner) = InternalPair::bind(addr).await?;
        Ok((listener, Self { inner }))
    }

    /// Connect to a remote PAIR socket.
    pub async fn connect(addr: &str) -> io::Result<Self> {
        Ok(Self {
            inner: InternalPair::connect(addr).await?,
        })
    }
}

impl<S> PairSocket<S>
where
    S: compio::io::AsyncRead + compio::io::AsyncWrite + Unpin,
{
    /// Send a multipart message to the peer.
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.inner.send(msg).await
    }

    /// Receive a multipart message from the peer.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        self.inner.recv().await
    }
}
