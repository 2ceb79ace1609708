//! Gateway configuration structure and loading

use std::collections::HashSet;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tis_core::{DeviceId, DeviceTypeCode, DeviceTypeDef};

use crate::error::{ConfigError, ConfigResult};

/// Default UDP port TIS IP gateways listen on
pub const DEFAULT_LISTEN_PORT: u16 = 6000;

/// Default time to wait for a command acknowledgement, in milliseconds
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 3_000;

/// Default time to collect discovery answers after a probe, in milliseconds
pub const DEFAULT_DISCOVERY_WINDOW_MS: u64 = 2_000;

/// Gateway configuration
///
/// Every field has a default, so any subset of keys (including none) makes
/// a valid file. `source_id` is written in dotted form and must be quoted
/// in YAML, e.g. `source_id: "1.254"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// UDP port to listen on; TIS equipment talks on 6000
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Unicast destination for outbound frames
    ///
    /// When unset, frames go to the broadcast address on the listen port.
    #[serde(default)]
    pub target_addr: Option<SocketAddr>,

    /// Bus address this gateway stamps on outbound frames
    #[serde(default = "default_source_id")]
    pub source_id: DeviceId,

    /// How long to wait for a command acknowledgement, in milliseconds
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,

    /// How long to collect discovery answers, in milliseconds
    #[serde(default = "default_discovery_window_ms")]
    pub discovery_window_ms: u64,

    /// Device type table mapping discovery codes to models
    #[serde(default = "default_device_types")]
    pub device_types: Vec<DeviceTypeDef>,
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

fn default_source_id() -> DeviceId {
    DeviceId::new(1, 254)
}

fn default_ack_timeout_ms() -> u64 {
    DEFAULT_ACK_TIMEOUT_MS
}

fn default_discovery_window_ms() -> u64 {
    DEFAULT_DISCOVERY_WINDOW_MS
}

/// The device type table TIS equipment ships with
pub fn default_device_types() -> Vec<DeviceTypeDef> {
    vec![
        DeviceTypeDef {
            code: DeviceTypeCode(0x1B, 0xBA),
            name: "RCU-8OUT-8IN".to_string(),
            channels: 8,
        },
        DeviceTypeDef {
            code: DeviceTypeCode(0x80, 0x58),
            name: "IP-COM-PORT".to_string(),
            channels: 0,
        },
    ]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            target_addr: None,
            source_id: default_source_id(),
            ack_timeout_ms: default_ack_timeout_ms(),
            discovery_window_ms: default_discovery_window_ms(),
            device_types: default_device_types(),
        }
    }
}

impl GatewayConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!("Loading gateway configuration from {:?}", path);

        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        // An empty file parses as null, which stands for all defaults.
        let config: Option<Self> =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })?;
        let config = config.unwrap_or_default();

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let config: Option<Self> = serde_yaml::from_str(text)?;
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a loaded configuration must hold
    pub fn validate(&self) -> ConfigResult<()> {
        if self.listen_port == 0 {
            return Err(ConfigError::InvalidListenPort {
                port: self.listen_port,
            });
        }

        let mut seen: HashSet<DeviceTypeCode> = HashSet::new();
        for def in &self.device_types {
            if !seen.insert(def.code) {
                return Err(ConfigError::DuplicateDeviceType { code: def.code });
            }
        }

        Ok(())
    }

    /// Destination for outbound frames
    ///
    /// A configured unicast target wins; otherwise frames are broadcast on
    /// the listen port, which is how gear on the local segment expects to
    /// be reached.
    pub fn target(&self) -> SocketAddr {
        self.target_addr
            .unwrap_or_else(|| (Ipv4Addr::BROADCAST, self.listen_port).into())
    }

    /// Acknowledgement deadline as a [`Duration`]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Discovery collection window as a [`Duration`]
    pub fn discovery_window(&self) -> Duration {
        Duration::from_millis(self.discovery_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_port, 6000);
        assert_eq!(config.target_addr, None);
        assert_eq!(config.source_id, DeviceId::new(1, 254));
        assert_eq!(config.ack_timeout_ms, 3_000);
        assert_eq!(config.discovery_window_ms, 2_000);
        assert_eq!(config.device_types.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_defaults_to_broadcast() {
        let config = GatewayConfig::default();
        assert_eq!(config.target().to_string(), "255.255.255.255:6000");
    }

    #[test]
    fn test_explicit_target_wins() {
        let config = GatewayConfig {
            target_addr: Some("192.168.1.40:6000".parse().unwrap()),
            ..GatewayConfig::default()
        };
        assert_eq!(config.target().to_string(), "192.168.1.40:6000");
    }

    #[test]
    fn test_zero_port_rejected() {
        let config = GatewayConfig {
            listen_port: 0,
            ..GatewayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidListenPort { port: 0 })
        ));
    }

    #[test]
    fn test_duplicate_type_code_rejected() {
        let config = GatewayConfig {
            device_types: vec![
                DeviceTypeDef {
                    code: DeviceTypeCode(0x1B, 0xBA),
                    name: "first".to_string(),
                    channels: 8,
                },
                DeviceTypeDef {
                    code: DeviceTypeCode(0x1B, 0xBA),
                    name: "second".to_string(),
                    channels: 4,
                },
            ],
            ..GatewayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateDeviceType { .. })
        ));
    }

    #[test]
    fn test_durations() {
        let config = GatewayConfig {
            ack_timeout_ms: 250,
            discovery_window_ms: 100,
            ..GatewayConfig::default()
        };
        assert_eq!(config.ack_timeout(), Duration::from_millis(250));
        assert_eq!(config.discovery_window(), Duration::from_millis(100));
    }
}
