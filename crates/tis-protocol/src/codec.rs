//! Encoding and decoding of whole TIS datagrams

use bytes::{BufMut, Bytes, BytesMut};
use tis_core::DeviceId;

use crate::checksum::crc16;
use crate::error::{DecodeError, Result};
use crate::opcode::OperationCode;

/// Frame header: operation (2) + source (2) + destination (2) + channel (1).
pub const HEADER_LEN: usize = 7;

/// Trailing big-endian CRC-16.
pub const CHECKSUM_LEN: usize = 2;

/// Shortest valid frame: header plus checksum around an empty payload.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CHECKSUM_LEN;

/// One TIS frame as carried in a single UDP datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// What the frame asks for or reports.
    pub operation: OperationCode,
    /// Device (or controller) the frame originates from.
    pub source: DeviceId,
    /// Addressed device; may be [`DeviceId::BROADCAST`].
    pub destination: DeviceId,
    /// Channel the operation addresses, 0 when not channel-addressed.
    pub channel: u8,
    /// Operation-specific payload, possibly empty.
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(
        operation: OperationCode,
        source: DeviceId,
        destination: DeviceId,
        channel: u8,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            operation,
            source,
            destination,
            channel,
            payload: payload.into(),
        }
    }

    /// The total wire size of this packet (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        HEADER_LEN + self.payload.len() + CHECKSUM_LEN
    }
}

/// Encode a packet into the wire format.
///
/// Wire format (all multi-byte fields big-endian):
/// ```text
/// ┌───────────┬──────────────┬──────────────┬─────────┬──────────┬─────────┐
/// │ Operation │ Source       │ Destination  │ Channel │ Payload  │ CRC-16  │
/// │ (2B)      │ (subnet,dev) │ (subnet,dev) │ (1B)    │ (0..nB)  │ (2B)    │
/// └───────────┴──────────────┴──────────────┴─────────┴──────────┴─────────┘
/// ```
/// The checksum covers every byte before it.
pub fn encode(packet: &Packet) -> Bytes {
    let mut buf = BytesMut::with_capacity(packet.wire_size());
    buf.put_u16(packet.operation.code());
    buf.put_u8(packet.source.subnet);
    buf.put_u8(packet.source.device);
    buf.put_u8(packet.destination.subnet);
    buf.put_u8(packet.destination.device);
    buf.put_u8(packet.channel);
    buf.put_slice(&packet.payload);
    let crc = crc16(&buf);
    buf.put_u16(crc);
    buf.freeze()
}

/// Decode one datagram as a TIS frame.
///
/// The datagram must contain exactly one whole frame. Fails with
/// [`DecodeError::MalformedFrame`] when shorter than [`MIN_FRAME_LEN`] and
/// [`DecodeError::ChecksumMismatch`] when the trailing CRC disagrees with
/// the frame contents. An unrecognized operation code is not an error.
pub fn decode(datagram: &[u8]) -> Result<Packet> {
    if datagram.len() < MIN_FRAME_LEN {
        return Err(DecodeError::MalformedFrame {
            len: datagram.len(),
            min: MIN_FRAME_LEN,
        });
    }

    let (body, trailer) = datagram.split_at(datagram.len() - CHECKSUM_LEN);
    let received = u16::from_be_bytes([trailer[0], trailer[1]]);
    let computed = crc16(body);
    if computed != received {
        return Err(DecodeError::ChecksumMismatch { computed, received });
    }

    Ok(Packet {
        operation: OperationCode::from_code(u16::from_be_bytes([body[0], body[1]])),
        source: DeviceId::new(body[2], body[3]),
        destination: DeviceId::new(body[4], body[5]),
        channel: body[6],
        payload: Bytes::copy_from_slice(&body[HEADER_LEN..]),
    })
}
