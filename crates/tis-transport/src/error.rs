//! Transport errors

use thiserror::Error;

/// Errors from the UDP transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Binding the listen socket failed.
    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// start() was called while the receive loop is already running.
    #[error("transport already started")]
    AlreadyStarted,

    /// The operation needs a bound socket but start() has not run.
    #[error("transport not started")]
    NotStarted,

    /// An I/O error while sending or inspecting the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
