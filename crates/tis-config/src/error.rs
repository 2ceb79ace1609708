//! Error types for gateway configuration

use std::path::PathBuf;

use thiserror::Error;
use tis_core::DeviceTypeCode;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading gateway configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML from a configuration file
    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Failed to parse YAML supplied as a string
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The listen port cannot be bound
    #[error("invalid listen port {port}: must be between 1 and 65535")]
    InvalidListenPort { port: u16 },

    /// Two device type entries carry the same code
    #[error("duplicate device type code {code}")]
    DuplicateDeviceType { code: DeviceTypeCode },
}
