//! Feedback bus with per-device pub/sub for the TIS gateway
//!
//! This crate provides the FeedbackBus, the central broker between the
//! frame pipeline and everything that wants to know what devices said.
//! Subscriptions are keyed by [`DeviceId`]; there is no string event-type
//! namespace and no payload downcasting, a receiver always yields
//! [`FeedbackEvent`]s.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use tis_core::{DeviceId, FeedbackEvent};

/// Default channel capacity for feedback subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// The feedback bus for publishing and subscribing to device feedback
///
/// Channels are bounded; a subscriber that stops polling loses the oldest
/// events (`RecvError::Lagged`) instead of stalling the publisher.
pub struct FeedbackBus {
    /// Map of device IDs to their broadcast senders
    listeners: DashMap<DeviceId, broadcast::Sender<FeedbackEvent>>,
    /// Sender for subscribers that want every device
    match_all_sender: broadcast::Sender<FeedbackEvent>,
    /// Channel capacity
    capacity: usize,
}

impl FeedbackBus {
    /// Create a new feedback bus
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new feedback bus with specified channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (match_all_sender, _) = broadcast::channel(capacity);
        Self {
            listeners: DashMap::new(),
            match_all_sender,
            capacity,
        }
    }

    /// Subscribe to feedback from a single device
    ///
    /// Returns a receiver that will see every event attributed to `device`.
    pub fn subscribe(&self, device: DeviceId) -> broadcast::Receiver<FeedbackEvent> {
        trace!(device = %device, "Subscribing to device feedback");

        self.listeners
            .entry(device)
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            })
            .subscribe()
    }

    /// Subscribe to feedback from all devices
    pub fn subscribe_all(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.match_all_sender.subscribe()
    }

    /// Publish a feedback event to all subscribers
    ///
    /// The event is delivered to:
    /// 1. All subscribers of the event's device
    /// 2. All match-all subscribers
    pub fn publish(&self, event: FeedbackEvent) {
        debug!(device = %event.device, kind = %event.kind(), "Publishing feedback");

        // Send to the device's subscribers
        if let Some(sender) = self.listeners.get(&event.device) {
            // Ignore send errors - they just mean no active receivers
            let _ = sender.send(event.clone());
        }

        // Send to match-all subscribers
        let _ = self.match_all_sender.send(event);
    }

    /// Number of devices with at least one past subscription
    pub fn device_channel_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for FeedbackBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for FeedbackBus
pub type SharedFeedbackBus = Arc<FeedbackBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use tis_core::Feedback;

    const DEVICE_A: DeviceId = DeviceId::new(1, 10);
    const DEVICE_B: DeviceId = DeviceId::new(1, 11);

    fn control_event(device: DeviceId, channel: u8) -> FeedbackEvent {
        FeedbackEvent::new(
            device,
            Feedback::ControlResponse {
                channel,
                on: true,
            },
        )
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = FeedbackBus::new();
        let mut rx = bus.subscribe(DEVICE_A);

        bus.publish(control_event(DEVICE_A, 3));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.device, DEVICE_A);
        assert_eq!(received.channel_state(3), Some(true));
    }

    #[tokio::test]
    async fn test_match_all_sees_every_device_in_order() {
        let bus = FeedbackBus::new();
        let mut rx = bus.subscribe_all();

        bus.publish(control_event(DEVICE_A, 1));
        bus.publish(control_event(DEVICE_B, 2));

        assert_eq!(rx.recv().await.unwrap().device, DEVICE_A);
        assert_eq!(rx.recv().await.unwrap().device, DEVICE_B);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = FeedbackBus::new();
        let mut rx1 = bus.subscribe(DEVICE_A);
        let mut rx2 = bus.subscribe(DEVICE_A);

        bus.publish(control_event(DEVICE_A, 5));

        assert_eq!(rx1.recv().await.unwrap().channel_state(5), Some(true));
        assert_eq!(rx2.recv().await.unwrap().channel_state(5), Some(true));
    }

    #[tokio::test]
    async fn test_no_cross_device_pollution() {
        let bus = FeedbackBus::new();
        let mut rx_a = bus.subscribe(DEVICE_A);
        let mut rx_b = bus.subscribe(DEVICE_B);

        bus.publish(control_event(DEVICE_A, 1));

        let received = rx_a.recv().await.unwrap();
        assert_eq!(received.device, DEVICE_A);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_subscriber_loses_oldest() {
        let bus = FeedbackBus::with_capacity(2);
        let mut rx = bus.subscribe_all();

        bus.publish(control_event(DEVICE_A, 1));
        bus.publish(control_event(DEVICE_A, 2));
        bus.publish(control_event(DEVICE_A, 3));

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap().channel_state(2), Some(true));
        assert_eq!(rx.recv().await.unwrap().channel_state(3), Some(true));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_fine() {
        let bus = FeedbackBus::new();
        bus.publish(control_event(DEVICE_A, 1));
        assert_eq!(bus.device_channel_count(), 0);
    }
}
