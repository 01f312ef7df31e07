//! # REQ Socket Implementation
//!
//! The REQ socket provides strict request-reply patterns with enforced alternation.
//!
//! ## Features
//!
//! - **Strict Alternation**: Must alternate between send() and recv()
//! - **Synchronous Pattern**: Enforces request-response flow
//! - **Correlation Tracking**: Tracks request/reply pairs
//! - **Multipart**: Full support for ZeroMQ multipart messages
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use monocoque_zmtp::req::ReqSocket;
//! use compio::net::TcpStream;
//! use bytes::Bytes;
//!
//! #[compio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect to REP server
//!     let stream = TcpStream::connect("127.0.0.1:5555").await?;
//!     let socket = ReqSocket::new(stream).await;
//!     
//!     // Must alternate send/recv
//!     socket.send(vec![Bytes::from("Hello")]).await?;
//!     let response = socket.recv().await?;
//!     
//!     // Another request-reply cycle
//!     socket.send(vec![Bytes::from("World")]).await?;
//!     let response = socket.recv().await?;
//!     
//!     Ok(())
//! }
//! ```
//!
//! ## State Machine
//!
//! REQ socket enforces this state machine:
//! ```text
//! Idle → send() → AwaitingReply → recv() → Idle
//! ```
//!
//! Calling send() twice without recv() will return an error.

use crate::{handshake::perform_handshake, integrated_actor::ZmtpIntegratedActor, session::SocketType};
use bytes::Bytes;
use compio::net::TcpStream;
use flume::{unbounded, Receiver, Sender};
use monocoque_core::{
    actor::{SocketActor, SocketEvent, UserCmd},
    alloc::IoArena,
    error::MonocoqueError,
    options::SocketOptions,
};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// State of the REQ socket state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReqState {
    /// Ready to send a request
    Idle,
    /// Waiting for a reply after sending request
    AwaitingReply,
}

/// A REQ socket for strict request-reply patterns.
///
/// REQ sockets enforce strict alternation between send and receive operations:
/// - Must call `send()` before `recv()`
/// - Must call `recv()` before next `send()`
/// - Violating this pattern returns an error
///
/// # Architecture
///
/// The socket integrates three layers:
/// 1. `SocketActor` - Protocol-agnostic I/O with split read/write pumps
/// 2. `ZmtpIntegratedActor` - ZMTP protocol handling (framing, handshake)
/// 3. State Machine - Enforces REQ pattern compliance
///
/// # Example
///
/// ```rust,no_run
/// use monocoque_zmtp::req::ReqSocket;
/// use compio::net::TcpStream;
/// use bytes::Bytes;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stream = TcpStream::connect("127.0.0.1:5555").await?;
/// let socket = ReqSocket::new(stream).await;
///
/// // Request-reply cycle
/// socket.send(vec![Bytes::from("REQUEST")]).await?;
/// let reply = socket.recv().await?;
///
/// // Must complete recv() before next send()
/// socket.send(vec![Bytes::from("ANOTHER")]).await?;
/// let reply = socket.recv().await?;
/// # Ok(())
/// # }
/// ```
pub struct ReqSocket {
    app_tx: Sender<Vec<Bytes>>,
    app_rx: Receiver<Vec<Bytes>>,
    state: Arc<Mutex<ReqState>>,
    /// ZMQ_REQ_RELAXED: allow send() without an intervening recv()
    relaxed: bool,
    /// ZMQ_REQ_CORRELATE: prepend/validate a per-request correlator frame
    correlate: bool,
    correlator_seq: AtomicU64,
    pending_correlators: Mutex<VecDeque<Bytes>>,
    _task_handles: (compio::runtime::Task<()>, compio::runtime::Task<()>),
}

impl ReqSocket {
    /// Create a new REQ socket from a TCP stream.
    ///
    /// This performs the ZMTP handshake and starts the socket actors.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use monocoque_zmtp::req::ReqSocket;
    /// use compio::net::TcpStream;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let stream = TcpStream::connect("127.0.0.1:5555").await?;
    /// let socket = ReqSocket::new(stream).await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(stream: TcpStream) -> std::io::Result<Self> {
        Self::with_options(stream, SocketOptions::default()).await
    }

    /// Create a new REQ socket with explicit socket options.
    ///
    /// Use this to enable `req_relaxed` (allow repeated `send()` without an
    /// intervening `recv()`) or `req_correlate` (prepend and validate a
    /// per-request correlator frame on each reply).
    pub async fn with_options(mut stream: TcpStream, options: SocketOptions) -> std::io::Result<Self> {
        debug!("[REQ] Creating new REQ socket");

        // PHASE 1: Perform synchronous handshake on the raw stream BEFORE spawning any tasks
        // This prevents any race conditions - no data frames can be sent until handshake completes
        debug!("[REQ] Performing synchronous handshake...");
        let handshake_result = perform_handshake(&mut stream, SocketType::Req, None)
            .await
            .map_err(|e| std::io::Error::other(format!("Handshake failed: {}", e)))?;

        debug!(
            peer_identity = ?handshake_result.peer_identity,
            peer_socket_type = ?handshake_result.peer_socket_type,
            "[REQ] Handshake complete"
        );

        // PHASE 2: Now that handshake is complete, spawn the actors
        // Create channels
        let (socket_event_tx, socket_event_rx) = unbounded(); // SocketActor → integration
        let (socket_cmd_tx, socket_cmd_rx) = unbounded(); // integration → SocketActor
        let (app_tx, app_rx) = unbounded(); // integrated → application (for recv)
        let (user_tx, user_rx) = unbounded(); // application → integrated (for send)

        // Create SocketActor with the already-handshaked stream
        let arena = IoArena::new();
        let socket_actor = SocketActor::new(stream, socket_event_tx, socket_cmd_rx, arena);

        // Create ZmtpIntegratedActor that's already in active state (handshake done)
        let mut integrated_actor = ZmtpIntegratedActor::new_active(
            SocketType::Req,
            app_tx.clone(),
            user_rx,
            handshake_result.peer_identity,
        );

        // Spawn tasks - handshake is already complete, so no race condition
        trace!("[REQ] Spawning SocketActor");
        let socket_handle = compio::runtime::spawn(socket_actor.run());

        // State tracking
        let state_check = Arc::new(Mutex::new(ReqState::Idle));

        // Spawn the integration task
        trace!("[REQ] Spawning integration task");
        let integration_handle = compio::runtime::spawn(async move {
            trace!("[REQ TASK] Integration task started (handshake already complete)");

            // Handshake is already complete, so we can immediately process all messages
            use futures::{select, FutureExt};

            loop {
                select! {
                    // Wait for socket events (bytes from network)
                    event = socket_event_rx.recv_async().fuse() => {
                        match event {
                            Ok(SocketEvent::Connected) => {
                                // Connection established, handshake already done
                            }
                            Ok(SocketEvent::ReceivedBytes(bytes)) => {
                                // Feed bytes into ZMTP session
                                let session_events = integrated_actor.session.on_bytes(bytes);

                                for event in session_events {
                                    match event {
                                        crate::session::SessionEvent::SendBytes(data) => {
                                            let _ = socket_cmd_tx.send(UserCmd::SendBytes(data));
                                        }
                                        crate::session::SessionEvent::HandshakeComplete { .. } => {
                                            // This shouldn't happen since handshake is already done
                                            debug!("[REQ TASK] received HandshakeComplete after handshake was already done");
                                        }
                                        crate::session::SessionEvent::Frame(frame) => {
                                            trace!("[REQ TASK] frame received from peer");
                                            integrated_actor.handle_frame(frame);
                                        }
                                        crate::session::SessionEvent::Error(e) => {
                                            debug!("[REQ TASK] session error: {:?}, exiting", e);
                                            break;
                                        }
                                    }
                                }
                            }
                            Ok(SocketEvent::Disconnected) | Err(_) => {
                                trace!("[REQ TASK] socket disconnected, exiting");
                                break;
                            }
                        }
                    }
                    // Wait for outgoing messages from application
                    msg = integrated_actor.user_rx.recv_async().fuse() => {
                        match msg {
                            Ok(multipart) => {
                                trace!("[REQ TASK] got {} frames from user_rx", multipart.len());
                                let frames = integrated_actor.encode_outgoing_message(multipart);
                                for frame in frames {
                                    let _ = socket_cmd_tx.send(UserCmd::SendBytes(frame));
                                }
                            }
                            Err(_) => {
                                trace!("[REQ TASK] user channel closed, exiting");
                                break;
                            }
                        }
                    }
                }
            }

            trace!("[REQ TASK] integration task exiting");
        });

        debug!("[REQ] socket fully initialized and ready");

        Ok(Self {
            app_tx: user_tx,
            app_rx,
            state: state_check,
            relaxed: options.req_relaxed,
            correlate: options.req_correlate,
            correlator_seq: AtomicU64::new(0),
            pending_correlators: Mutex::new(VecDeque::new()),
            _task_handles: (socket_handle.into(), integration_handle.into()),
        })
    }

    /// Send a request message.
    ///
    /// This enforces the REQ state machine - you must call `recv()` before
    /// calling `send()` again.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Called while awaiting a reply (must call `recv()` first)
    /// - The underlying connection is closed
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use monocoque_zmtp::req::ReqSocket;
    /// # use bytes::Bytes;
    /// # async fn example(socket: &ReqSocket) -> Result<(), Box<dyn std::error::Error>> {
    /// socket.send(vec![Bytes::from("REQUEST")]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send(&self, mut msg: Vec<Bytes>) -> io::Result<()> {
        // Check state machine (skipped entirely in relaxed mode)
        if !self.relaxed {
            let mut state = self.state.lock();
            if *state != ReqState::Idle {
                return Err(MonocoqueError::Fsm.into());
            }
            *state = ReqState::AwaitingReply;
        }

        if self.correlate {
            let seq = self.correlator_seq.fetch_add(1, Ordering::Relaxed);
            let correlator = Bytes::copy_from_slice(&seq.to_be_bytes());
            self.pending_correlators
                .lock()
                .push_back(correlator.clone());
            msg.insert(0, correlator);
        }

        trace!("[REQ] sending {} frames", msg.len());
        let result = self.app_tx.send(msg);

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                // Reset state on error
                if !self.relaxed {
                    *self.state.lock() = ReqState::Idle;
                }
                Err(io::Error::new(io::ErrorKind::BrokenPipe, e))
            }
        }
    }

    /// Receive a reply message.
    ///
    /// This blocks until a reply is received. You must call this after `send()`
    /// before calling `send()` again.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(msg))` - Received a multipart message
    /// - `Ok(None)` - Connection closed gracefully
    /// - `Err(_)` - Channel error
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use monocoque_zmtp::req::ReqSocket;
    /// # async fn example(socket: &ReqSocket) -> Result<(), Box<dyn std::error::Error>> {
    /// let reply = socket.recv().await?;
    /// if let Some(msg) = reply {
    ///     println!("Got {} frames", msg.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn recv(&self) -> io::Result<Option<Vec<Bytes>>> {
        // State check: must be awaiting reply (skipped entirely in relaxed mode)
        if !self.relaxed {
            let state = self.state.lock();
            if *state != ReqState::AwaitingReply {
                return Err(MonocoqueError::Fsm.into());
            }
        }

        trace!("[REQ] waiting for reply");

        match self.app_rx.recv_async().await {
            Ok(mut msg) => {
                trace!("[REQ] received {} frames", msg.len());
                // Transition back to Idle
                if !self.relaxed {
                    *self.state.lock() = ReqState::Idle;
                }

                if self.correlate {
                    let expected = self.pending_correlators.lock().pop_front();
                    match expected {
                        Some(expected) if msg.first() == Some(&expected) => {
                            msg.remove(0);
                        }
                        Some(_) => {
                            return Err(io::Error::new(
                                io::ErrorKind::InvalidData,
                                "REQ reply correlator did not match outstanding request",
                            ));
                        }
                        None => {}
                    }
                }

                Ok(Some(msg))
            }
            Err(e) => {
                // Reset state on error
                if !self.relaxed {
                    *self.state.lock() = ReqState::Idle;
                }
                Err(io::Error::new(io::ErrorKind::BrokenPipe, e))
            }
        }
    }

    /// Get the current state of the REQ socket.
    ///
    /// This is primarily for debugging and testing.
    pub fn state(&self) -> ReqState {
        *self.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_req_state_machine() {
        // State machine logic is tested through integration tests
        // Unit testing state transitions would require mocking
        assert_eq!(ReqState::Idle, ReqState::Idle);
        assert_ne!(ReqState::Idle, ReqState::AwaitingReply);
    }
}
