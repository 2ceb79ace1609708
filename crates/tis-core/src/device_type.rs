//! Device model identification as reported by discovery responses

use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-byte device type code, high byte first
///
/// TIS devices identify their model with a 16-bit code split across the
/// first two bytes of a discovery response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceTypeCode(pub u8, pub u8);

impl DeviceTypeCode {
    /// Build a type code from its 16-bit form
    pub const fn from_u16(code: u16) -> Self {
        Self((code >> 8) as u8, (code & 0xFF) as u8)
    }

    /// The 16-bit form of the code
    pub const fn as_u16(self) -> u16 {
        ((self.0 as u16) << 8) | self.1 as u16
    }

    /// The two payload bytes, high byte first
    pub const fn to_bytes(self) -> [u8; 2] {
        [self.0, self.1]
    }
}

impl fmt::Display for DeviceTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}{:02X}", self.0, self.1)
    }
}

/// One entry of the device type table: a code and what it stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTypeDef {
    /// The two-byte code as it appears on the wire
    pub code: DeviceTypeCode,

    /// Human-readable model name (e.g., "RCU-8OUT-8IN")
    pub name: String,

    /// Number of controllable output channels, 0 when not applicable
    #[serde(default)]
    pub channels: u8,
}
