//! Builders for the frames a controller sends, and the answers devices give
//!
//! The response builders exist for the device side of the conversation:
//! integration tests and simulated devices use them to answer like real
//! hardware would.

use bytes::Bytes;
use tis_core::{DeviceId, DeviceTypeCode};

use crate::codec::Packet;
use crate::opcode::OperationCode;

/// Channel level meaning fully on.
pub const CHANNEL_ON_LEVEL: u8 = 100;

/// Channel level meaning off.
pub const CHANNEL_OFF_LEVEL: u8 = 0;

/// First payload byte of a control response.
pub const CONTROL_ACK_FLAG: u8 = 0xF8;

/// Build a control frame switching `channel` fully on.
pub fn control_on(source: DeviceId, destination: DeviceId, channel: u8) -> Packet {
    control(source, destination, channel, CHANNEL_ON_LEVEL)
}

/// Build a control frame switching `channel` off.
pub fn control_off(source: DeviceId, destination: DeviceId, channel: u8) -> Packet {
    control(source, destination, channel, CHANNEL_OFF_LEVEL)
}

// Control payload is the target level followed by a two-byte ramp time,
// always zero here (switch immediately).
fn control(source: DeviceId, destination: DeviceId, channel: u8, level: u8) -> Packet {
    Packet::new(
        OperationCode::Control,
        source,
        destination,
        channel,
        vec![level, 0x00, 0x00],
    )
}

/// Build an update request polling every channel of `destination`.
pub fn update_request(source: DeviceId, destination: DeviceId) -> Packet {
    Packet::new(
        OperationCode::UpdateRequest,
        source,
        destination,
        0,
        Bytes::new(),
    )
}

/// Build a broadcast discovery probe.
pub fn discovery_request(source: DeviceId) -> Packet {
    Packet::new(
        OperationCode::Discovery,
        source,
        DeviceId::BROADCAST,
        0,
        Bytes::new(),
    )
}

/// Build a control acknowledgement reporting `channel` at `level`.
pub fn control_response(
    source: DeviceId,
    destination: DeviceId,
    channel: u8,
    level: u8,
) -> Packet {
    Packet::new(
        OperationCode::ControlResponse,
        source,
        destination,
        channel,
        vec![CONTROL_ACK_FLAG, level],
    )
}

/// Build an unsolicited channel bitmap; `states[0]` is channel 1.
pub fn binary_feedback(source: DeviceId, destination: DeviceId, states: &[bool]) -> Packet {
    debug_assert!(states.len() <= u8::MAX as usize);
    let mut payload = vec![0u8; 1 + states.len().div_ceil(8)];
    payload[0] = states.len() as u8;
    for (index, &on) in states.iter().enumerate() {
        if on {
            payload[1 + index / 8] |= 0x80 >> (index % 8);
        }
    }
    Packet::new(OperationCode::BinaryFeedback, source, destination, 0, payload)
}

/// Build a full status report; `levels[0]` is channel 1.
pub fn update_response(source: DeviceId, destination: DeviceId, levels: &[u8]) -> Packet {
    debug_assert!(levels.len() <= u8::MAX as usize);
    let mut payload = Vec::with_capacity(1 + levels.len());
    payload.push(levels.len() as u8);
    payload.extend_from_slice(levels);
    Packet::new(OperationCode::UpdateResponse, source, destination, 0, payload)
}

/// Build a discovery answer carrying the device's type code.
pub fn discovery_response(
    source: DeviceId,
    destination: DeviceId,
    type_code: DeviceTypeCode,
) -> Packet {
    Packet::new(
        OperationCode::DiscoveryResponse,
        source,
        destination,
        0,
        type_code.to_bytes().to_vec(),
    )
}
