//! Decode errors for the TIS frame codec

use thiserror::Error;

/// Errors that can occur while decoding a TIS frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The datagram is shorter than the minimum frame.
    #[error("malformed frame: {len} bytes, need at least {min}")]
    MalformedFrame { len: usize, min: usize },

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch: computed {computed:#06x}, frame carries {received:#06x}")]
    ChecksumMismatch { computed: u16, received: u16 },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
