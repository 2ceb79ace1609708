//! Device address type for the two-level TIS bus addressing scheme

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid device ID strings
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceIdError {
    #[error("device id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("invalid subnet number: {0}")]
    InvalidSubnet(String),

    #[error("invalid device number: {0}")]
    InvalidDevice(String),
}

/// Bus address of a TIS device (e.g., "1.12" for subnet 1, device 12)
///
/// Every device on a TIS installation is addressed by a subnet number and a
/// device number, one byte each. The pair 255.255 is the broadcast address
/// that reaches every device on every subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId {
    /// Subnet number
    pub subnet: u8,
    /// Device number within the subnet
    pub device: u8,
}

impl DeviceId {
    /// The all-subnets, all-devices broadcast address
    pub const BROADCAST: DeviceId = DeviceId {
        subnet: 0xFF,
        device: 0xFF,
    };

    /// Create a new DeviceId from subnet and device numbers
    pub const fn new(subnet: u8, device: u8) -> Self {
        Self { subnet, device }
    }

    /// Check whether this is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.subnet, self.device)
    }
}

impl FromStr for DeviceId {
    type Err = DeviceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (subnet, device) = s.split_once('.').ok_or(DeviceIdError::InvalidFormat)?;
        if device.contains('.') {
            return Err(DeviceIdError::InvalidFormat);
        }
        let subnet = subnet
            .parse()
            .map_err(|_| DeviceIdError::InvalidSubnet(subnet.to_string()))?;
        let device = device
            .parse()
            .map_err(|_| DeviceIdError::InvalidDevice(device.to_string()))?;
        Ok(Self { subnet, device })
    }
}

impl TryFrom<String> for DeviceId {
    type Error = DeviceIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_round_trip() {
        let id = DeviceId::new(1, 12);
        assert_eq!(id.to_string(), "1.12");
        assert_eq!("1.12".parse::<DeviceId>().unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_bad_strings() {
        assert_eq!(
            "112".parse::<DeviceId>().unwrap_err(),
            DeviceIdError::InvalidFormat
        );
        assert_eq!(
            "1.2.3".parse::<DeviceId>().unwrap_err(),
            DeviceIdError::InvalidFormat
        );
        assert!(matches!(
            "300.1".parse::<DeviceId>().unwrap_err(),
            DeviceIdError::InvalidSubnet(_)
        ));
        assert!(matches!(
            "1.abc".parse::<DeviceId>().unwrap_err(),
            DeviceIdError::InvalidDevice(_)
        ));
    }

    #[test]
    fn test_broadcast_address() {
        assert!(DeviceId::BROADCAST.is_broadcast());
        assert!(!DeviceId::new(255, 1).is_broadcast());
        assert_eq!(DeviceId::BROADCAST.to_string(), "255.255");
    }

    #[test]
    fn test_serializes_as_string() {
        let id = DeviceId::new(3, 200);
        assert_eq!(serde_json::to_value(id).unwrap(), "3.200");
        let back: DeviceId = serde_json::from_value("3.200".into()).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_orders_by_subnet_then_device() {
        let mut ids = vec![
            DeviceId::new(2, 1),
            DeviceId::new(1, 30),
            DeviceId::new(1, 2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                DeviceId::new(1, 2),
                DeviceId::new(1, 30),
                DeviceId::new(2, 1),
            ]
        );
    }
}
