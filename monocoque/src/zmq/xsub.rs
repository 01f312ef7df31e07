//! XSUB socket implementation.
//!
//! XSUB sockets are the extended form of SUB: subscriptions are sent as
//! regular messages over the wire instead of being handled purely
//! client-side, which lets an XSUB sit behind a proxy (e.g. an XPUB/XSUB
//! broker) and forward subscription state upstream.

use bytes::Bytes;
use compio::net::TcpStream;
use monocoque_core::options::SocketOptions;
use monocoque_core::subscription::SubscriptionEvent;
use monocoque_zmtp::xsub::XSubSocket as InternalXSub;
use std::io;

/// XSUB socket for receiving published messages with proxyable subscriptions.
pub struct XSubSocket<S = TcpStream>
where
    S: compio::io::AsyncRead + compio::io::AsyncWrite + Unpin,
{
    inner: InternalXSub<S>,
}

impl XSubSocket<TcpStream> {
    /// Connect to a publisher (or XPUB-side proxy endpoint).
    pub async fn connect(addr: &str) -> io::Result<Self> {
        Ok(Self {
            inner: InternalXSub::connect(addr).await?,
        })
    }

    /// Connect with custom socket options.
    pub async fn connect_with_options(addr: &str, options: SocketOptions) -> io::Result<Self> {
        Ok(Self {
            inner: InternalXSub::connect_with_options(addr, options).await?,
        })
    }
}

impl<S> XSubSocket<S>
where
    S: compio::io::AsyncRead + compio::io::AsyncWrite + Unpin,
{
    /// Create an XSUB socket from any stream.
    pub async fn new(stream: S) -> io::Result<Self> {
        Ok(Self {
            inner: InternalXSub::new(stream).await?,
        })
    }

    /// Subscribe to a topic prefix by sending a subscription message upstream.
    pub async fn subscribe(&mut self, prefix: impl Into<Bytes>) -> io::Result<()> {
        self.inner.subscribe(prefix).await
    }

    /// Unsubscribe from a topic prefix.
    pub async fn unsubscribe(&mut self, prefix: impl Into<Bytes>) -> io::Result<()> {
        self.inner.unsubscribe(prefix).await
    }

    /// Send a raw subscription event (for manual protocol control).
    pub async fn send_subscription_event(&mut self, event: SubscriptionEvent) -> io::Result<()> {
        self.inner.send_subscription_event(event).await
    }

    /// Receive a published message.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        self.inner.recv().await
    }
}
