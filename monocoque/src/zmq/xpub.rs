//! XPUB socket implementation.
//!
//! XPUB is the extended form of PUB: subscribers' subscribe/unsubscribe
//! messages are surfaced to the application instead of being swallowed,
//! which is what lets a proxy forward subscription state upstream to an
//! XSUB.

use bytes::Bytes;
use monocoque_core::options::SocketOptions;
use monocoque_core::subscription::SubscriptionEvent;
use monocoque_zmtp::xpub::XPubSocket as InternalXPub;
use std::io;

/// XPUB socket that accepts subscriber connections and broadcasts messages
/// to those whose subscriptions match.
pub struct XPubSocket {
    inner: InternalXPub,
}

impl XPubSocket {
    /// Bind to an address and start listening for subscribers.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        Ok(Self {
            inner: InternalXPub::bind(addr).await?,
        })
    }

    /// Bind with custom socket options.
    pub async fn bind_with_options(addr: &str, options: SocketOptions) -> io::Result<Self> {
        Ok(Self {
            inner: InternalXPub::bind_with_options(addr, options).await?,
        })
    }

    /// Accept a pending subscriber connection, if any (non-blocking).
    pub async fn accept(&mut self) -> io::Result<()> {
        self.inner.accept().await
    }

    /// Receive the next subscription (or unsubscription) event from any subscriber.
    pub async fn recv_subscription(&mut self) -> io::Result<Option<SubscriptionEvent>> {
        self.inner.recv_subscription().await
    }

    /// Manually queue a subscription event for the application to observe
    /// via `recv_subscription()` (requires `xpub_manual` in `SocketOptions`).
    pub async fn send_subscription(&mut self, event: SubscriptionEvent) -> io::Result<()> {
        self.inner.send_subscription(event).await
    }

    /// Broadcast a message to every subscriber whose subscriptions match it.
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.inner.send(msg).await
    }
}
