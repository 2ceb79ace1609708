//! Summary of a discovered device handed to host integrations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::{DeviceId, DeviceTypeCode};

/// Everything known about a device after discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Bus address
    pub device: DeviceId,

    /// Raw type code from the discovery response
    pub type_code: DeviceTypeCode,

    /// Model name when the type code is in the device type table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Output channel count, 0 when unknown
    pub channels: u8,

    /// UDP address the device (or its IP gateway) answered from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<SocketAddr>,

    /// When the device was last heard from
    pub last_seen: DateTime<Utc>,
}
