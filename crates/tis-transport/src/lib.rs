//! UDP transport for the TIS bus
//!
//! This crate owns the socket. [`UdpTransport`] binds a UDP port, runs a
//! single receive loop and hands every decoded frame to the registered
//! [`FrameSubscriber`]s in registration order. Datagrams that fail to
//! decode are counted and dropped; they never terminate the loop.

mod error;

pub use error::{Result, TransportError};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use tis_protocol::{codec, DecodeError, Packet};

/// Largest datagram the receive loop accepts. TIS frames are tiny; this
/// leaves room for future operations without fragmenting.
const MAX_DATAGRAM_LEN: usize = 2048;

/// Shared handle to a [`UdpTransport`]
pub type SharedTransport = Arc<UdpTransport>;

/// Receiver of decoded inbound frames
///
/// Implementations run inline on the receive loop and must not block;
/// anything slow delays the next datagram.
pub trait FrameSubscriber: Send + Sync {
    /// Called once per successfully decoded frame, in registration order
    fn on_frame(&self, packet: &Packet, source: SocketAddr);
}

/// Snapshot of the receive loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Datagrams received, valid or not
    pub datagrams_received: u64,
    /// Frames decoded and dispatched to subscribers
    pub frames_dispatched: u64,
    /// Datagrams dropped because their checksum does not match
    pub checksum_failures: u64,
    /// Datagrams dropped because they are shorter than a frame
    pub malformed_frames: u64,
    /// Datagrams sent
    pub datagrams_sent: u64,
}

#[derive(Default)]
struct Counters {
    datagrams_received: AtomicU64,
    frames_dispatched: AtomicU64,
    checksum_failures: AtomicU64,
    malformed_frames: AtomicU64,
    datagrams_sent: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> TransportStats {
        TransportStats {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            frames_dispatched: self.frames_dispatched.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
        }
    }
}

/// UDP transport: one socket, one receive loop, many subscribers
pub struct UdpTransport {
    /// Port start() binds on all interfaces; 0 lets the OS pick one
    listen_port: u16,
    /// Subscribers in registration order; the loop snapshots this at start
    subscribers: Mutex<Vec<Arc<dyn FrameSubscriber>>>,
    /// Bound socket while running
    socket: RwLock<Option<Arc<UdpSocket>>>,
    /// Running flag, cleared by the loop itself on exit
    running: Arc<AtomicBool>,
    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
    /// Receive loop task, joined by stop()
    task: Mutex<Option<JoinHandle<()>>>,
    /// Receive loop counters
    stats: Arc<Counters>,
}

impl UdpTransport {
    /// Create a transport that will listen on `listen_port`
    pub fn new(listen_port: u16) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            listen_port,
            subscribers: Mutex::new(Vec::new()),
            socket: RwLock::new(None),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: Mutex::new(None),
            stats: Arc::new(Counters::default()),
        }
    }

    /// Register a subscriber; takes effect when the receive loop starts
    pub fn subscribe(&self, subscriber: Arc<dyn FrameSubscriber>) {
        self.subscribers.lock().unwrap().push(subscriber);
    }

    /// Bind the socket and start the receive loop
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Transport already running");
            return Err(TransportError::AlreadyStarted);
        }

        let socket = match Self::bind_socket(self.listen_port).await {
            Ok(socket) => socket,
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(err);
            }
        };
        *self.socket.write().unwrap() = Some(socket.clone());

        let subscribers = self.subscribers.lock().unwrap().clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let stats = self.stats.clone();
        let running = self.running.clone();

        info!(port = self.listen_port, "Transport listening");

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Receive loop got shutdown signal");
                        break;
                    }
                    result = socket.recv_from(&mut buf) => {
                        match result {
                            Ok((len, from)) => {
                                stats.datagrams_received.fetch_add(1, Ordering::Relaxed);
                                match codec::decode(&buf[..len]) {
                                    Ok(packet) => {
                                        trace!(%from, operation = ?packet.operation, len, "Frame received");
                                        for subscriber in &subscribers {
                                            subscriber.on_frame(&packet, from);
                                        }
                                        stats.frames_dispatched.fetch_add(1, Ordering::Relaxed);
                                    }
                                    Err(DecodeError::ChecksumMismatch { computed, received }) => {
                                        stats.checksum_failures.fetch_add(1, Ordering::Relaxed);
                                        debug!(%from, computed, received, "Dropping frame with bad checksum");
                                    }
                                    Err(DecodeError::MalformedFrame { len, min }) => {
                                        stats.malformed_frames.fetch_add(1, Ordering::Relaxed);
                                        debug!(%from, len, min, "Dropping malformed datagram");
                                    }
                                }
                            }
                            Err(err) => {
                                warn!(error = %err, "recv_from failed");
                                tokio::time::sleep(Duration::from_millis(50)).await;
                            }
                        }
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
            info!("Transport stopped");
        });
        *self.task.lock().unwrap() = Some(task);

        Ok(())
    }

    async fn bind_socket(port: u16) -> Result<Arc<UdpSocket>> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .await
            .map_err(|source| TransportError::Bind { port, source })?;
        // Discovery probes go to the broadcast address.
        socket
            .set_broadcast(true)
            .map_err(|source| TransportError::Bind { port, source })?;
        Ok(Arc::new(socket))
    }

    /// Stop the receive loop and release the socket
    ///
    /// Returns after the loop task has actually exited, so a caller may
    /// rebind the port immediately. Calling stop on a stopped transport is
    /// a no-op.
    pub async fn stop(&self) {
        let task = self.task.lock().unwrap().take();
        let Some(task) = task else {
            return;
        };
        info!("Stopping transport");
        let _ = self.shutdown_tx.send(());
        // Join failure means the loop panicked; the transport is still
        // considered stopped.
        if let Err(err) = task.await {
            warn!(error = %err, "Receive loop did not exit cleanly");
        }
        self.running.store(false, Ordering::SeqCst);
        *self.socket.write().unwrap() = None;
    }

    /// Encode and send one packet as a single datagram
    pub async fn send(&self, packet: &Packet, destination: SocketAddr) -> Result<()> {
        let socket = self
            .socket
            .read()
            .unwrap()
            .as_ref()
            .cloned()
            .ok_or(TransportError::NotStarted)?;
        let frame = codec::encode(packet);
        socket.send_to(&frame, destination).await?;
        self.stats.datagrams_sent.fetch_add(1, Ordering::Relaxed);
        trace!(%destination, operation = ?packet.operation, len = frame.len(), "Frame sent");
        Ok(())
    }

    /// The bound local address while running
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let socket = self
            .socket
            .read()
            .unwrap()
            .as_ref()
            .cloned()
            .ok_or(TransportError::NotStarted)?;
        Ok(socket.local_addr()?)
    }

    /// Whether the receive loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the receive loop counters
    pub fn stats(&self) -> TransportStats {
        self.stats.snapshot()
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        // A transport dropped without stop() must not leak its loop task.
        if let Some(task) = self.task.get_mut().unwrap().take() {
            task.abort();
        }
    }
}
