//! Acknowledged sends over the unreliable bus
//!
//! TIS devices confirm control commands with a response frame, nothing
//! more: no sequence numbers, no retransmission. [`PacketSender`] bridges
//! that gap by parking each send in a pending table keyed by device and
//! channel, and resolving it from the feedback stream. One send, one
//! bounded wait; retry policy stays with the caller.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use tis_core::{DeviceId, Feedback, FeedbackEvent};
use tis_event_bus::SharedFeedbackBus;
use tis_protocol::Packet;
use tis_transport::{SharedTransport, TransportError};

use crate::states::ChannelStateCache;

/// What a pending send is waiting to hear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckExpectation {
    /// Device that must answer
    pub device: DeviceId,
    /// Channel the command addressed (1-based)
    pub channel: u8,
    /// Required reported state; `None` accepts any report for the channel
    pub state: Option<bool>,
}

impl AckExpectation {
    /// Expect the channel to report on
    pub const fn on(device: DeviceId, channel: u8) -> Self {
        Self {
            device,
            channel,
            state: Some(true),
        }
    }

    /// Expect the channel to report off
    pub const fn off(device: DeviceId, channel: u8) -> Self {
        Self {
            device,
            channel,
            state: Some(false),
        }
    }

    /// Accept any state report for the channel
    pub const fn any(device: DeviceId, channel: u8) -> Self {
        Self {
            device,
            channel,
            state: None,
        }
    }

    /// Whether this feedback settles the wait
    ///
    /// An offline notification never matches; it reports the absence of an
    /// answer, not an answer.
    pub fn matches(&self, event: &FeedbackEvent) -> bool {
        if event.device != self.device {
            return false;
        }
        match (self.state, event.channel_state(self.channel)) {
            (Some(expected), Some(actual)) => expected == actual,
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }
}

/// How a pending send ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// A matching acknowledgement arrived before the deadline
    Acknowledged,
    /// The deadline passed without a matching acknowledgement
    Expired,
    /// A newer send for the same device and channel took over the slot
    Superseded,
}

impl AckOutcome {
    /// `true` only for [`AckOutcome::Acknowledged`]
    pub fn is_acknowledged(self) -> bool {
        matches!(self, AckOutcome::Acknowledged)
    }
}

type PendingKey = (DeviceId, u8);

struct PendingWait {
    tx: oneshot::Sender<AckOutcome>,
    expectation: AckExpectation,
    token: u64,
}

/// Removes the caller's own pending entry when its wait ends
///
/// The token distinguishes our registration from a superseding one under
/// the same key, so a timed-out or cancelled wait never evicts its
/// successor.
struct PendingGuard<'a> {
    pending: &'a DashMap<PendingKey, PendingWait>,
    key: PendingKey,
    token: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending
            .remove_if(&self.key, |_, wait| wait.token == self.token);
    }
}

/// Sends frames and correlates them with their acknowledgements
pub struct PacketSender {
    transport: SharedTransport,
    bus: SharedFeedbackBus,
    states: Arc<ChannelStateCache>,
    pending: DashMap<PendingKey, PendingWait>,
    next_token: AtomicU64,
}

impl PacketSender {
    /// Create a sender on top of a transport, the feedback bus and the
    /// channel-state cache
    pub fn new(
        transport: SharedTransport,
        bus: SharedFeedbackBus,
        states: Arc<ChannelStateCache>,
    ) -> Self {
        Self {
            transport,
            bus,
            states,
            pending: DashMap::new(),
            next_token: AtomicU64::new(0),
        }
    }

    /// Send without waiting for an acknowledgement
    pub async fn send(
        &self,
        packet: &Packet,
        destination: SocketAddr,
    ) -> Result<(), TransportError> {
        self.transport.send(packet, destination).await
    }

    /// Send one frame and wait for the matching acknowledgement
    ///
    /// Registers the expectation before sending, so a reply cannot slip
    /// past between the two. On expiry the target device counts as
    /// offline: its cached channel states are dropped, then a
    /// [`Feedback::OfflineDevice`] event goes out on the bus. Dropping
    /// the returned future releases the pending slot.
    #[instrument(skip(self, packet))]
    pub async fn send_with_ack(
        &self,
        packet: &Packet,
        destination: SocketAddr,
        expectation: AckExpectation,
        timeout: Duration,
    ) -> Result<AckOutcome, TransportError> {
        let key = (expectation.device, expectation.channel);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        let previous = self.pending.insert(
            key,
            PendingWait {
                tx,
                expectation,
                token,
            },
        );
        if let Some(previous) = previous {
            debug!(device = %key.0, channel = key.1, "Superseding earlier wait");
            let _ = previous.tx.send(AckOutcome::Superseded);
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            key,
            token,
        };

        self.transport.send(packet, destination).await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            // Either the deadline passed or the wait was dropped without a
            // verdict; both mean no acknowledgement arrived.
            Ok(Err(_)) | Err(_) => {
                warn!(device = %key.0, channel = key.1, "No acknowledgement before deadline");
                let offline = FeedbackEvent::new(key.0, Feedback::OfflineDevice);
                self.states.apply(&offline);
                self.bus.publish(offline);
                Ok(AckOutcome::Expired)
            }
        }
    }

    /// [`send_with_ack`](Self::send_with_ack) collapsed to the boolean the
    /// switch entities act on
    pub async fn send_acknowledged(
        &self,
        packet: &Packet,
        destination: SocketAddr,
        expectation: AckExpectation,
        timeout: Duration,
    ) -> Result<bool, TransportError> {
        Ok(self
            .send_with_ack(packet, destination, expectation, timeout)
            .await?
            .is_acknowledged())
    }

    /// Resolve every pending wait this feedback satisfies
    pub(crate) fn observe(&self, event: &FeedbackEvent) {
        let matched: Vec<(PendingKey, u64)> = self
            .pending
            .iter()
            .filter(|entry| entry.value().expectation.matches(event))
            .map(|entry| (*entry.key(), entry.value().token))
            .collect();

        for (key, token) in matched {
            if let Some((_, wait)) = self
                .pending
                .remove_if(&key, |_, wait| wait.token == token)
            {
                debug!(device = %key.0, channel = key.1, "Acknowledgement matched");
                let _ = wait.tx.send(AckOutcome::Acknowledged);
            }
        }
    }

    /// Number of sends still waiting for an acknowledgement
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE: DeviceId = DeviceId::new(1, 10);
    const OTHER: DeviceId = DeviceId::new(1, 11);

    fn response(device: DeviceId, channel: u8, on: bool) -> FeedbackEvent {
        FeedbackEvent::new(device, Feedback::ControlResponse { channel, on })
    }

    #[test]
    fn test_expectation_requires_matching_state() {
        let expectation = AckExpectation::on(DEVICE, 3);
        assert!(expectation.matches(&response(DEVICE, 3, true)));
        assert!(!expectation.matches(&response(DEVICE, 3, false)));
        assert!(!expectation.matches(&response(DEVICE, 4, true)));
        assert!(!expectation.matches(&response(OTHER, 3, true)));
    }

    #[test]
    fn test_any_expectation_takes_either_state() {
        let expectation = AckExpectation::any(DEVICE, 2);
        assert!(expectation.matches(&response(DEVICE, 2, true)));
        assert!(expectation.matches(&response(DEVICE, 2, false)));
        assert!(!expectation.matches(&response(DEVICE, 1, true)));
    }

    #[test]
    fn test_bitmap_can_acknowledge_a_command() {
        let expectation = AckExpectation::off(DEVICE, 2);
        let event = FeedbackEvent::new(
            DEVICE,
            Feedback::BinaryFeedback {
                channels: vec![true, false, true],
            },
        );
        assert!(expectation.matches(&event));
    }

    #[test]
    fn test_offline_never_matches() {
        let event = FeedbackEvent::new(DEVICE, Feedback::OfflineDevice);
        assert!(!AckExpectation::on(DEVICE, 1).matches(&event));
        assert!(!AckExpectation::any(DEVICE, 1).matches(&event));
    }

    #[test]
    fn test_outcome_to_bool() {
        assert!(AckOutcome::Acknowledged.is_acknowledged());
        assert!(!AckOutcome::Expired.is_acknowledged());
        assert!(!AckOutcome::Superseded.is_acknowledged());
    }
}
