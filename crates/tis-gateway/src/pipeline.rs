//! Frame subscribers wiring the transport into the rest of the stack

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::trace;

use tis_core::DeviceTypeCode;
use tis_event_bus::SharedFeedbackBus;
use tis_protocol::{decode_feedback, OperationCode, Packet};
use tis_registry::SharedDeviceRegistry;
use tis_transport::FrameSubscriber;

use crate::sender::PacketSender;
use crate::states::ChannelStateCache;

/// Routes feedback frames: state cache first, then the correlator, then
/// the bus
///
/// The cache goes first so a caller woken by its acknowledgement already
/// sees the new state, and subscribers likewise. Frames that carry no
/// feedback fall through untouched.
pub(crate) struct FeedbackPipeline {
    sender: Arc<PacketSender>,
    states: Arc<ChannelStateCache>,
    bus: SharedFeedbackBus,
}

impl FeedbackPipeline {
    pub(crate) fn new(
        sender: Arc<PacketSender>,
        states: Arc<ChannelStateCache>,
        bus: SharedFeedbackBus,
    ) -> Self {
        Self {
            sender,
            states,
            bus,
        }
    }
}

impl FrameSubscriber for FeedbackPipeline {
    fn on_frame(&self, packet: &Packet, _source: SocketAddr) {
        let Some(event) = decode_feedback(packet) else {
            return;
        };
        trace!(device = %event.device, kind = %event.kind(), "Feedback received");
        self.states.apply(&event);
        self.sender.observe(&event);
        self.bus.publish(event);
    }
}

/// Records discovery answers in the device registry
pub(crate) struct DiscoveryObserver {
    registry: SharedDeviceRegistry,
}

impl DiscoveryObserver {
    pub(crate) fn new(registry: SharedDeviceRegistry) -> Self {
        Self { registry }
    }
}

impl FrameSubscriber for DiscoveryObserver {
    fn on_frame(&self, packet: &Packet, source: SocketAddr) {
        if packet.operation != OperationCode::DiscoveryResponse {
            return;
        }
        // Payload is the two-byte type code; anything shorter is noise.
        let (Some(&hi), Some(&lo)) = (packet.payload.first(), packet.payload.get(1)) else {
            trace!(device = %packet.source, "Discovery answer without a type code");
            return;
        };
        self.registry
            .record(packet.source, DeviceTypeCode(hi, lo), Some(source));
    }
}
