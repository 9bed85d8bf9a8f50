//! Public exposure of the image directory.
//!
//! The Graph API fetches image bytes itself, so every candidate must be
//! reachable at `{public_url}/{filename}` while its container is created and
//! processed. An [`Exposer`] serves a directory over HTTP on a background task
//! and opens a [`Tunnel`] to it; the returned [`Exposure`] is owned by the
//! orchestrator for the duration of one batch and must be shut down on every
//! exit path.
//!
//! The served root is passed explicitly; the process working directory is
//! never changed.

mod error;
mod server;
mod tunnel;

pub use error::ExposureError;
pub use server::{file_router, HttpExposer, ServedDirectory};
pub use tunnel::{NgrokTunnel, StaticTunnel, Tunnel, TunnelHandle};

use async_trait::async_trait;
use std::path::Path;

use crate::config::{ExposureConfig, TunnelProvider};

/// Starts exposure of a directory.
#[async_trait]
pub trait Exposer: Send + Sync {
    /// Serve `root` and make it publicly reachable.
    async fn expose(&self, root: &Path) -> Result<Box<dyn Exposure>, ExposureError>;
}

/// A directory currently reachable through a public URL.
#[async_trait]
pub trait Exposure: Send {
    /// Public base URL, without trailing slash.
    fn public_url(&self) -> &str;

    /// Public URL of a file in the exposed directory.
    fn url_for(&self, filename: &str) -> String {
        public_file_url(self.public_url(), filename)
    }

    /// Stop serving and close the tunnel. Calling it again is a no-op.
    async fn shutdown(&mut self);
}

/// Join a public base URL and a filename, percent-encoding the filename.
pub fn public_file_url(base: &str, filename: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        urlencoding::encode(filename)
    )
}

/// Build the exposer described by the configuration.
pub fn create_exposer(config: &ExposureConfig) -> Result<HttpExposer, ExposureError> {
    let tunnel: Box<dyn Tunnel> = match config.tunnel.provider {
        TunnelProvider::Static => {
            let url = config.tunnel.public_url.clone().ok_or_else(|| {
                ExposureError::Tunnel("static tunnel requires public_url".to_string())
            })?;
            Box::new(StaticTunnel::new(url))
        }
        TunnelProvider::Ngrok => Box::new(NgrokTunnel::new(&config.tunnel)),
    };

    Ok(HttpExposer::new(
        std::net::SocketAddr::new(config.host, config.port),
        tunnel,
    ))
}
