//! Device registry for the TIS gateway
//!
//! Tracks every device that answered a discovery probe, keyed by bus
//! address, and resolves type codes to model names through the configured
//! device type table.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::{debug, info};

use tis_core::{DeviceDescriptor, DeviceId, DeviceTypeCode, DeviceTypeDef};

/// Registry of devices heard from on the bus
pub struct DeviceRegistry {
    /// Primary index: bus address -> descriptor
    devices: DashMap<DeviceId, DeviceDescriptor>,
    /// Type code -> model definition, in configuration order
    types: IndexMap<DeviceTypeCode, DeviceTypeDef>,
}

impl DeviceRegistry {
    /// Create a registry with the given device type table
    pub fn new(types: impl IntoIterator<Item = DeviceTypeDef>) -> Self {
        Self {
            devices: DashMap::new(),
            types: types.into_iter().map(|def| (def.code, def)).collect(),
        }
    }

    /// Record a device answer observed now
    pub fn record(
        &self,
        device: DeviceId,
        type_code: DeviceTypeCode,
        addr: Option<SocketAddr>,
    ) -> DeviceDescriptor {
        self.record_at(device, type_code, addr, Utc::now())
    }

    /// Record a device answer with an explicit timestamp
    ///
    /// Last write wins: a device that reappears with a different type code
    /// is overwritten, not duplicated.
    pub fn record_at(
        &self,
        device: DeviceId,
        type_code: DeviceTypeCode,
        addr: Option<SocketAddr>,
        last_seen: DateTime<Utc>,
    ) -> DeviceDescriptor {
        let def = self.device_type(type_code);
        let descriptor = DeviceDescriptor {
            device,
            type_code,
            model: def.map(|def| def.name.clone()),
            channels: def.map(|def| def.channels).unwrap_or(0),
            addr,
            last_seen,
        };
        match self.devices.insert(device, descriptor.clone()) {
            None => {
                info!(device = %device, type_code = %type_code, model = ?descriptor.model, "Registered new device")
            }
            Some(_) => debug!(device = %device, "Refreshed known device"),
        }
        descriptor
    }

    /// Look up a device by bus address
    pub fn lookup(&self, device: DeviceId) -> Option<DeviceDescriptor> {
        self.devices.get(&device).map(|entry| entry.clone())
    }

    /// Look up a type definition by code
    pub fn device_type(&self, code: DeviceTypeCode) -> Option<&DeviceTypeDef> {
        self.types.get(&code)
    }

    /// All known devices, ordered by bus address
    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        let mut all: Vec<_> = self
            .devices
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|descriptor| descriptor.device);
        all
    }

    /// Number of known devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True when no device has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Thread-safe wrapper for DeviceRegistry
pub type SharedDeviceRegistry = Arc<DeviceRegistry>;
