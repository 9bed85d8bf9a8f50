//! Error types for the exposure module.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while starting or running the exposure service.
#[derive(Debug, Error)]
pub enum ExposureError {
    #[error("failed to bind file server on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("exposed root is not a directory: {0}")]
    NotADirectory(String),

    #[error("tunnel error: {0}")]
    Tunnel(String),

    #[error("tunnel did not come up within {0:?}")]
    TunnelTimeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
