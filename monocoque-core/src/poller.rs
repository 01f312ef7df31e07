//! User-facing reactor.
//!
//! A single-threaded loop multiplexing three kinds of event sources:
//! pollable sockets (anything that wraps a mailbox-style signaling
//! primitive — in this crate, a `flume` channel), raw OS sockets with
//! user callbacks, and timers (one-shot or periodic).
//!
//! `add_*`/`remove_*` may be called from any thread; mutations are queued
//! behind a lock shared with the running loop and applied between
//! iterations, so a callback never observes a half-mutated registration
//! set and mid-iteration `add`/`remove` from inside a callback can't
//! invalidate the iterator driving it.
//!
//! Ordering guarantee: when a timer and a socket/fd readiness event are
//! both due in the same iteration, timers fire first.

#![allow(unsafe_code)]

use async_lock::Mutex as AsyncMutex;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

/// Maximum time a single iteration will sleep when nothing is due.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Something a [`Poller`] can check for read-readiness without blocking.
///
/// Sockets built on this crate's actor/channel plumbing implement this by
/// inspecting their inbound `flume` channel, which mirrors the mailbox
/// signaling primitive a pollable socket wraps in the wire protocol.
pub trait PollableSocket: Send + 'static {
    /// Non-blocking readiness probe; `true` means a subsequent `recv`
    /// would not block.
    fn is_readable(&mut self) -> bool;
}

/// Adapts any `flume::Receiver<T>` into a [`PollableSocket`].
pub struct ChannelReadiness<T> {
    rx: flume::Receiver<T>,
}

impl<T> ChannelReadiness<T> {
    pub fn new(rx: flume::Receiver<T>) -> Self {
        Self { rx }
    }
}

impl<T: Send + 'static> PollableSocket for ChannelReadiness<T> {
    fn is_readable(&mut self) -> bool {
        !self.rx.is_empty()
    }
}

type Callback = Box<dyn FnMut() + Send>;

/// Opaque handle returned by `add_*`, used with the matching `remove_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollToken(u64);

#[cfg(unix)]
type RawFd = std::os::unix::io::RawFd;
#[cfg(windows)]
type RawFd = std::os::windows::io::RawSocket;

struct SocketSlot {
    id: u64,
    socket: Box<dyn PollableSocket>,
    callback: Callback,
}

struct FdSlot {
    id: u64,
    fd: RawFd,
    callback: Callback,
}

struct TimerSlot {
    id: u64,
    /// `None` means one-shot.
    interval: Option<Duration>,
    next_fire: Instant,
    enabled: bool,
    callback: Callback,
}

enum Mutation {
    AddSocket(SocketSlot),
    RemoveSocket(u64),
    AddFd(FdSlot),
    RemoveFd(u64),
    AddTimer(TimerSlot),
    RemoveTimer(u64),
    SetTimerEnabled(u64, bool),
    SetTimerInterval(u64, Duration),
}

#[derive(Default)]
struct PollerState {
    sockets: Vec<SocketSlot>,
    fds: Vec<FdSlot>,
    timers: Vec<TimerSlot>,
}

/// Single-threaded reactor driving pollable sockets, raw OS sockets, and
/// timers. Cheap to clone: all state is shared via `Arc`, so a handle can
/// be passed to the task that runs [`Poller::poll_till_cancelled`] while
/// other tasks keep registering work on it.
#[derive(Clone)]
pub struct Poller {
    state: Arc<AsyncMutex<PollerState>>,
    pending: Arc<AsyncMutex<VecDeque<Mutation>>>,
    next_id: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Poller {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AsyncMutex::new(PollerState::default())),
            pending: Arc::new(AsyncMutex::new(VecDeque::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a pollable socket; `callback` runs on the poller's thread
    /// whenever it transitions to readable.
    pub async fn add_socket(
        &self,
        socket: impl PollableSocket,
        callback: impl FnMut() + Send + 'static,
    ) -> PollToken {
        let id = self.alloc_id();
        self.pending.lock().await.push_back(Mutation::AddSocket(SocketSlot {
            id,
            socket: Box::new(socket),
            callback: Box::new(callback),
        }));
        PollToken(id)
    }

    pub async fn remove_socket(&self, token: PollToken) {
        self.pending.lock().await.push_back(Mutation::RemoveSocket(token.0));
    }

    /// Register a raw OS socket for read-readiness callbacks.
    pub async fn add_pollin_socket(
        &self,
        fd: RawFd,
        callback: impl FnMut() + Send + 'static,
    ) -> PollToken {
        let id = self.alloc_id();
        self.pending.lock().await.push_back(Mutation::AddFd(FdSlot {
            id,
            fd,
            callback: Box::new(callback),
        }));
        PollToken(id)
    }

    pub async fn remove_pollin_socket(&self, token: PollToken) {
        self.pending.lock().await.push_back(Mutation::RemoveFd(token.0));
    }

    /// Register a timer. `interval` of `None` means one-shot; `Some(d)`
    /// re-arms for `d` after every firing.
    pub async fn add_timer(
        &self,
        delay: Duration,
        interval: Option<Duration>,
        callback: impl FnMut() + Send + 'static,
    ) -> PollToken {
        let id = self.alloc_id();
        self.pending.lock().await.push_back(Mutation::AddTimer(TimerSlot {
            id,
            interval,
            next_fire: Instant::now() + delay,
            enabled: true,
            callback: Box::new(callback),
        }));
        PollToken(id)
    }

    pub async fn remove_timer(&self, token: PollToken) {
        self.pending.lock().await.push_back(Mutation::RemoveTimer(token.0));
    }

    /// Disabling prevents further firings without removing the timer;
    /// re-enabling rearms it from now, not from its original schedule.
    pub async fn set_timer_enabled(&self, token: PollToken, enabled: bool) {
        self.pending
            .lock()
            .await
            .push_back(Mutation::SetTimerEnabled(token.0, enabled));
    }

    /// Takes effect at the timer's next firing.
    pub async fn set_timer_interval(&self, token: PollToken, interval: Duration) {
        self.pending
            .lock()
            .await
            .push_back(Mutation::SetTimerInterval(token.0, interval));
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    async fn apply_pending(&self) {
        let mut pending = self.pending.lock().await;
        if pending.is_empty() {
            return;
        }
        let mut state = self.state.lock().await;
        while let Some(mutation) = pending.pop_front() {
            match mutation {
                Mutation::AddSocket(slot) => state.sockets.push(slot),
                Mutation::RemoveSocket(id) => state.sockets.retain(|s| s.id != id),
                Mutation::AddFd(slot) => state.fds.push(slot),
                Mutation::RemoveFd(id) => state.fds.retain(|f| f.id != id),
                Mutation::AddTimer(slot) => state.timers.push(slot),
                Mutation::RemoveTimer(id) => state.timers.retain(|t| t.id != id),
                Mutation::SetTimerEnabled(id, enabled) => {
                    if let Some(t) = state.timers.iter_mut().find(|t| t.id == id) {
                        if enabled && !t.enabled {
                            t.next_fire = Instant::now();
                        }
                        t.enabled = enabled;
                    }
                }
                Mutation::SetTimerInterval(id, interval) => {
                    if let Some(t) = state.timers.iter_mut().find(|t| t.id == id) {
                        t.interval = Some(interval);
                    }
                }
            }
        }
    }

    /// Runs exactly one iteration: apply queued mutations, fire any due
    /// timers (delivered before readiness events), probe sockets and fds,
    /// and sleep up to `max_wait` if nothing fired.
    pub async fn poll_once(&self, max_wait: Duration) -> io::Result<()> {
        self.apply_pending().await;

        let mut state = self.state.lock().await;
        let now = Instant::now();

        let mut due_timers = Vec::new();
        for timer in state.timers.iter_mut() {
            if timer.enabled && timer.next_fire <= now {
                due_timers.push(timer.id);
                match timer.interval {
                    Some(ivl) => timer.next_fire = now + ivl,
                    None => timer.enabled = false,
                }
            }
        }
        for id in &due_timers {
            if let Some(t) = state.timers.iter_mut().find(|t| t.id == *id) {
                trace!(timer_id = id, "poller: firing timer");
                (t.callback)();
            }
        }

        let mut ready_sockets = Vec::new();
        for slot in state.sockets.iter_mut() {
            if slot.socket.is_readable() {
                ready_sockets.push(slot.id);
            }
        }
        for id in &ready_sockets {
            if let Some(s) = state.sockets.iter_mut().find(|s| s.id == *id) {
                trace!(socket_id = id, "poller: socket readable");
                (s.callback)();
            }
        }

        let mut ready_fds = Vec::new();
        for slot in state.fds.iter() {
            if fd_is_readable(slot.fd) {
                ready_fds.push(slot.id);
            }
        }
        for id in &ready_fds {
            if let Some(f) = state.fds.iter_mut().find(|f| f.id == *id) {
                trace!(fd_id = id, "poller: fd readable");
                (f.callback)();
            }
        }

        let next_deadline = state
            .timers
            .iter()
            .filter(|t| t.enabled)
            .map(|t| t.next_fire)
            .min();
        drop(state);

        if due_timers.is_empty() && ready_sockets.is_empty() && ready_fds.is_empty() {
            let mut wait = max_wait;
            if let Some(deadline) = next_deadline {
                wait = wait.min(deadline.saturating_duration_since(Instant::now()));
            }
            if !wait.is_zero() {
                compio::time::sleep(wait).await;
            }
        }

        Ok(())
    }

    /// Runs iterations until [`Poller::cancel`] is called. Returns on the
    /// next iteration boundary after cancellation; in-flight callbacks
    /// complete.
    pub async fn poll_till_cancelled(&self) -> io::Result<()> {
        while !self.cancelled.load(Ordering::Acquire) {
            self.poll_once(DEFAULT_POLL_TIMEOUT).await?;
        }
        Ok(())
    }

    /// Spawns [`Poller::poll_till_cancelled`] as a background task.
    pub fn spawn(&self) -> compio::runtime::Task<io::Result<()>> {
        let this = self.clone();
        compio::runtime::spawn(async move { this.poll_till_cancelled().await })
    }

    /// Cancels and waits for a previously spawned loop to exit.
    pub async fn cancel_and_join(&self, handle: compio::runtime::Task<io::Result<()>>) -> io::Result<()> {
        self.cancel();
        handle.await
    }
}

/// Non-blocking readiness probe for a raw OS socket: peeks one byte
/// without consuming it, treating `WouldBlock` as "not ready" and
/// anything else (including EOF or an error) as "ready" so the callback
/// can observe and handle it.
#[cfg(unix)]
fn fd_is_readable(fd: RawFd) -> bool {
    use std::os::unix::io::FromRawFd;

    let socket = unsafe { socket2::Socket::from_raw_fd(fd) };
    let mut buf = [std::mem::MaybeUninit::uninit(); 1];
    let result = socket.peek(&mut buf);
    std::mem::forget(socket);

    match result {
        Ok(_) => true,
        Err(e) => e.kind() != io::ErrorKind::WouldBlock,
    }
}

#[cfg(windows)]
fn fd_is_readable(fd: RawFd) -> bool {
    use std::os::windows::io::FromRawSocket;

    let socket = unsafe { socket2::Socket::from_raw_socket(fd) };
    let mut buf = [std::mem::MaybeUninit::uninit(); 1];
    let result = socket.peek(&mut buf);
    std::mem::forget(socket);

    match result {
        Ok(_) => true,
        Err(e) => e.kind() != io::ErrorKind::WouldBlock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[compio::test]
    async fn test_timer_fires_and_reenables() {
        let poller = Poller::new();
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();
        poller
            .add_timer(Duration::from_millis(1), None, move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        // The timer hasn't been applied/fired yet.
        assert_eq!(count.load(Ordering::SeqCst), 0);

        compio::time::sleep(Duration::from_millis(5)).await;
        poller.poll_once(Duration::ZERO).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // One-shot: a further iteration does not refire it.
        poller.poll_once(Duration::ZERO).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[compio::test]
    async fn test_timer_before_socket_readiness() {
        // Scenario: a 50ms timer and a channel that becomes readable
        // 100ms in; the timer callback must run before the socket one.
        let poller = Poller::new();
        let order: Arc<StdMutex<Vec<&'static str>>> = Arc::new(StdMutex::new(Vec::new()));

        let (tx, rx) = flume::unbounded::<()>();

        let order_timer = order.clone();
        poller
            .add_timer(Duration::from_millis(50), None, move || {
                order_timer.lock().unwrap().push("timer");
            })
            .await;

        let order_socket = order.clone();
        poller
            .add_socket(ChannelReadiness::new(rx), move || {
                order_socket.lock().unwrap().push("socket");
            })
            .await;

        compio::time::sleep(Duration::from_millis(60)).await;
        let _ = tx.send(());

        poller.poll_once(Duration::ZERO).await.unwrap();

        let seen = order.lock().unwrap().clone();
        assert_eq!(seen, vec!["timer", "socket"]);
    }

    #[compio::test]
    async fn test_disabled_timer_does_not_fire() {
        let poller = Poller::new();
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();
        let token = poller
            .add_timer(Duration::from_millis(1), Some(Duration::from_millis(1)), move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        poller.set_timer_enabled(token, false).await;
        compio::time::sleep(Duration::from_millis(5)).await;
        poller.poll_once(Duration::ZERO).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[compio::test]
    async fn test_remove_socket_stops_callbacks() {
        let poller = Poller::new();
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();
        let (tx, rx) = flume::unbounded::<()>();
        let token = poller
            .add_socket(ChannelReadiness::new(rx), move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        poller.remove_socket(token).await;
        let _ = tx.send(());
        poller.poll_once(Duration::ZERO).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[compio::test]
    async fn test_cancel_and_join() {
        let poller = Poller::new();
        let handle = poller.spawn();
        compio::time::sleep(Duration::from_millis(5)).await;
        poller.cancel_and_join(handle).await.unwrap();
    }
}
