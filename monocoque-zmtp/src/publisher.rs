//! Direct-stream PUB socket implementation
//!
//! This module provides a high-performance PUB socket using direct stream I/O
//! for minimal latency.
//!
//! # PUB Pattern
//!
//! PUB sockets are send-only broadcast sockets. A single PUB socket accepts
//! many SUB connections and fans each outgoing message out to all of them.

use bytes::{Bytes, BytesMut};
use compio::io::AsyncWrite;
use compio::net::{TcpListener, TcpStream};
use std::collections::HashMap;
use std::io;
use tracing::{debug, trace};

use crate::{codec::encode_multipart, handshake::perform_handshake_with_timeout, session::SocketType};

/// Unique identifier for each subscriber connection.
type SubscriberId = u64;

/// Direct-stream PUB socket.
///
/// Owns a listener and fans out every published message to all currently
/// connected subscribers.
pub struct PubSocket {
    listener: TcpListener,
    subscribers: HashMap<SubscriberId, TcpStream>,
    next_id: SubscriberId,
}

impl PubSocket {
    /// Bind to an address and start listening for subscribers.
    pub async fn bind(addr: impl compio::net::ToSocketAddrsAsync) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        debug!("[PUB] Bound to {}", listener.local_addr()?);

        Ok(Self {
            listener,
            subscribers: HashMap::new(),
            next_id: 1,
        })
    }

    /// Accept a new subscriber connection, performing the ZMTP handshake.
    ///
    /// Returns the subscriber's assigned id.
    pub async fn accept_subscriber(&mut self) -> io::Result<SubscriberId> {
        let (mut stream, addr) = self.listener.accept().await?;
        debug!("[PUB] New subscriber from {}", addr);

        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;

        let handshake_result = perform_handshake_with_timeout(
            &mut stream,
            SocketType::Pub,
            None,
            None,
        )
        .await
        .map_err(|e| io::Error::other(format!("Handshake failed: {}", e)))?;

        debug!(
            peer_socket_type = ?handshake_result.peer_socket_type,
            "[PUB] Handshake complete with subscriber"
        );

        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.insert(id, stream);

        debug!("[PUB] Subscriber {} added (total: {})", id, self.subscribers.len());
        Ok(id)
    }

    /// Send a message to all connected subscribers.
    ///
    /// Subscribers that fail the write are dropped from the subscriber set.
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        trace!("[PUB] Broadcasting {} frames to {} subscribers", msg.len(), self.subscribers.len());

        let mut write_buf = BytesMut::new();
        encode_multipart(&msg, &mut write_buf);
        let payload = write_buf.freeze();

        use compio::buf::BufResult;
        use monocoque_core::alloc::IoBytes;

        let mut dead = Vec::new();
        for (&id, stream) in self.subscribers.iter_mut() {
            let BufResult(result, _) = AsyncWrite::write(stream, IoBytes::new(payload.clone())).await;
            if let Err(e) = result {
                debug!("[PUB] Failed writing to subscriber {}: {}", id, e);
                dead.push(id);
            }
        }

        for id in dead {
            self.subscribers.remove(&id);
            debug!("[PUB] Removed dead subscriber {}", id);
        }

        Ok(())
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Get the local address this socket is bound to.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::SubSocket;

    #[compio::test]
    async fn test_pub_fanout_to_two_subscribers() {
        let mut pub_socket = PubSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = pub_socket.local_addr().unwrap();

        let connect_one = async {
            let stream = TcpStream::connect(addr).await.unwrap();
            SubSocket::new(stream).await.unwrap()
        };

        let (mut sub1, accept1) = futures::join!(connect_one, pub_socket.accept_subscriber());
        accept1.unwrap();

        let connect_two = async {
            let stream = TcpStream::connect(addr).await.unwrap();
            SubSocket::new(stream).await.unwrap()
        };
        let (mut sub2, accept2) = futures::join!(connect_two, pub_socket.accept_subscriber());
        accept2.unwrap();

        assert_eq!(pub_socket.subscriber_count(), 2);

        pub_socket
            .send(vec![Bytes::from("topic"), Bytes::from("payload")])
            .await
            .unwrap();

        let msg1 = sub1.recv().await.unwrap().unwrap();
        let msg2 = sub2.recv().await.unwrap().unwrap();
        assert_eq!(msg1[0], Bytes::from("topic"));
        assert_eq!(msg2[0], Bytes::from("topic"));
    }
}
