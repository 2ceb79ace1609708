//! Error types for the gateway facade

use thiserror::Error;

use tis_config::ConfigError;
use tis_transport::TransportError;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can surface from the gateway facade
///
/// Missed acknowledgements are not errors; they come back as
/// [`AckOutcome::Expired`](crate::AckOutcome::Expired) or plain `false`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The underlying UDP transport failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
