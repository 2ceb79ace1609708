//! TIS wire protocol
//!
//! Implements the UDP frame format spoken by TIS bus gateways. Every frame
//! carries a fixed 7-byte header (operation code, source and destination
//! device addresses, channel), an operation-specific payload and a trailing
//! big-endian CRC-16:
//!
//! - [`codec`] encodes and decodes whole datagrams
//! - [`commands`] builds the frames a controller sends (and the answers
//!   devices give, used by tests and simulators)
//! - [`feedback`] classifies inbound frames into [`tis_core::FeedbackEvent`]s
//!
//! Decoding is strict about length and checksum but deliberately lenient
//! about content: unrecognized operation codes and unexpected payloads are
//! data, not errors.

pub mod bits;
pub mod checksum;
pub mod codec;
pub mod commands;
pub mod error;
pub mod feedback;
pub mod opcode;

pub use codec::{decode, encode, Packet, CHECKSUM_LEN, HEADER_LEN, MIN_FRAME_LEN};
pub use error::{DecodeError, Result};
pub use feedback::decode_feedback;
pub use opcode::OperationCode;
