//! Per-channel control handle handed out by the gateway

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use tis_core::{DeviceId, FeedbackEvent};
use tis_event_bus::SharedFeedbackBus;
use tis_protocol::{commands, Packet};
use tis_transport::TransportError;

use crate::sender::{AckExpectation, PacketSender};
use crate::states::ChannelStateCache;

/// Handle for one output channel of one device
///
/// Host entities hold one of these instead of speaking the protocol
/// themselves. The three command frames are built once at construction;
/// every call reuses them.
pub struct DeviceControl {
    device: DeviceId,
    channel: u8,
    target: SocketAddr,
    ack_timeout: Duration,
    on_packet: Packet,
    off_packet: Packet,
    update_packet: Packet,
    sender: Arc<PacketSender>,
    bus: SharedFeedbackBus,
    states: Arc<ChannelStateCache>,
}

impl DeviceControl {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        device: DeviceId,
        channel: u8,
        source: DeviceId,
        target: SocketAddr,
        ack_timeout: Duration,
        sender: Arc<PacketSender>,
        bus: SharedFeedbackBus,
        states: Arc<ChannelStateCache>,
    ) -> Self {
        Self {
            device,
            channel,
            target,
            ack_timeout,
            on_packet: commands::control_on(source, device, channel),
            off_packet: commands::control_off(source, device, channel),
            update_packet: commands::update_request(source, device),
            sender,
            bus,
            states,
        }
    }

    /// The device this handle controls
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// The channel this handle controls (1-based)
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Switch the channel on
    ///
    /// Returns `true` when the device acknowledged the new state within
    /// the configured deadline, `false` otherwise.
    pub async fn turn_on(&self) -> Result<bool, TransportError> {
        self.sender
            .send_acknowledged(
                &self.on_packet,
                self.target,
                AckExpectation::on(self.device, self.channel),
                self.ack_timeout,
            )
            .await
    }

    /// Switch the channel off
    pub async fn turn_off(&self) -> Result<bool, TransportError> {
        self.sender
            .send_acknowledged(
                &self.off_packet,
                self.target,
                AckExpectation::off(self.device, self.channel),
                self.ack_timeout,
            )
            .await
    }

    /// Ask the device to report all of its channel levels
    ///
    /// Fire-and-forget; the answer arrives as an
    /// [`UpdateResponse`](tis_core::Feedback::UpdateResponse) on the bus.
    pub async fn request_update(&self) -> Result<(), TransportError> {
        self.sender.send(&self.update_packet, self.target).await
    }

    /// Subscribe to every feedback event from this device
    pub fn subscribe(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.bus.subscribe(self.device)
    }

    /// Last reported state of this channel, if any feedback mentioned it
    pub fn is_on(&self) -> Option<bool> {
        self.states.get(self.device, self.channel)
    }
}
