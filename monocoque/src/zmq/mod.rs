//! ZeroMQ protocol implementation.
//!
//! This module provides high-performance ZeroMQ-compatible sockets built on `io_uring`.
//!
//! # Socket Types
//!
//! - [`ReqSocket`] / [`RepSocket`] - Strict request-reply pair
//! - [`DealerSocket`] - Asynchronous request-reply client (load-balanced)
//! - [`RouterSocket`] - Identity-based routing server
//! - [`PubSocket`] / [`SubSocket`] - Publish/subscribe pair
//! - [`PushSocket`] / [`PullSocket`] - Pipeline distribution pair
//! - [`PairSocket`] - Exclusive bidirectional peer connection
//! - [`XPubSocket`] / [`XSubSocket`] - Proxyable publish/subscribe pair
//!
//! # Quick Start
//!
//! ## DEALER (Client)
//!
//! ```rust,no_run
//! use monocoque::zmq::DealerSocket;
//! use bytes::Bytes;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut socket = DealerSocket::connect("127.0.0.1:5555").await?;
//! socket.send(vec![Bytes::from("REQUEST")]).await?;
//!
//! if let Some(reply) = socket.recv().await {
//!     println!("Got reply: {:?}", reply);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## ROUTER (Server)
//!
//! ```rust,no_run
//! use monocoque::zmq::RouterSocket;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (listener, mut socket) = RouterSocket::bind("127.0.0.1:5555").await?;
//!
//! while let Some(msg) = socket.recv().await {
//!     socket.send(msg).await?; // Echo back
//! }
//! # Ok(())
//! # }
//! ```

mod common;
mod dealer;
mod pair;
mod pull;
mod push;
mod publisher;
mod rep;
mod req;
mod router;
mod subscriber;
mod xpub;
mod xsub;

// Re-export socket types
pub use monocoque_core::endpoint::{Endpoint, EndpointError};
pub use monocoque_core::options::SocketOptions;
pub use monocoque_zmtp::config::BufferConfig;

pub use dealer::DealerSocket;
pub use pair::PairSocket;
pub use pull::PullSocket;
pub use push::PushSocket;
pub use publisher::PubSocket;
pub use rep::RepSocket;
pub use req::ReqSocket;
pub use router::RouterSocket;
pub use subscriber::SubSocket;
pub use xpub::XPubSocket;
pub use xsub::XSubSocket;


/// Convenient imports for ZeroMQ protocol.
///
/// # Example
///
/// ```rust
/// use monocoque::zmq::prelude::*;
///
/// // Now you have:
/// // - DealerSocket, RouterSocket, PubSocket, SubSocket
/// // - Bytes for zero-copy messages
/// ```
pub mod prelude {
    pub use super::{
        DealerSocket, PairSocket, PubSocket, PullSocket, PushSocket, RepSocket, ReqSocket,
        RouterSocket, SubSocket, XPubSocket, XSubSocket,
    };
    pub use bytes::Bytes;
}
