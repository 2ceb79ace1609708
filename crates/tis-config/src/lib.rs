//! Configuration for the TIS gateway
//!
//! One YAML file covers the whole gateway: the UDP listen port, an optional
//! unicast target, the source address frames are stamped with, ack and
//! discovery timing, and the device type table. Every field has a default,
//! so an empty file is a valid configuration.

mod config;
mod error;

pub use config::{
    default_device_types, GatewayConfig, DEFAULT_ACK_TIMEOUT_MS, DEFAULT_DISCOVERY_WINDOW_MS,
    DEFAULT_LISTEN_PORT,
};
pub use error::{ConfigError, ConfigResult};
