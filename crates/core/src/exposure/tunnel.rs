//! Tunnels that make the local file server publicly reachable.

use async_trait::async_trait;
use serde::Deserialize;
use std::net::SocketAddr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::TunnelConfig;

use super::ExposureError;

/// Interval between ngrok inspection API reads while waiting for the tunnel.
const NGROK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opens a public tunnel to a local address.
#[async_trait]
pub trait Tunnel: Send + Sync {
    /// Name of this tunnel implementation for logging.
    fn name(&self) -> &str;

    /// Open a tunnel forwarding to `local_addr`.
    async fn open(&self, local_addr: SocketAddr) -> Result<Box<dyn TunnelHandle>, ExposureError>;
}

/// An open tunnel.
#[async_trait]
pub trait TunnelHandle: Send {
    /// Public base URL, without trailing slash.
    fn public_url(&self) -> &str;

    /// Close the tunnel. Calling it again is a no-op.
    async fn close(&mut self);
}

// ============================================================================
// Static
// ============================================================================

/// A public URL that already routes to the local server (reverse proxy, ingress).
pub struct StaticTunnel {
    public_url: String,
}

impl StaticTunnel {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }
}

struct StaticHandle {
    public_url: String,
}

#[async_trait]
impl Tunnel for StaticTunnel {
    fn name(&self) -> &str {
        "static"
    }

    async fn open(&self, _local_addr: SocketAddr) -> Result<Box<dyn TunnelHandle>, ExposureError> {
        Ok(Box::new(StaticHandle {
            public_url: self.public_url.clone(),
        }))
    }
}

#[async_trait]
impl TunnelHandle for StaticHandle {
    fn public_url(&self) -> &str {
        &self.public_url
    }

    async fn close(&mut self) {}
}

// ============================================================================
// ngrok
// ============================================================================

/// Runs the ngrok agent for the duration of the batch.
///
/// The agent is started as `ngrok http <port>`; the public URL is read from the
/// agent's local inspection API once the tunnel for that port shows up.
pub struct NgrokTunnel {
    bin: String,
    api_url: String,
    startup_timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct NgrokTunnels {
    #[serde(default)]
    tunnels: Vec<NgrokTunnelInfo>,
}

#[derive(Debug, Deserialize)]
struct NgrokTunnelInfo {
    public_url: String,
    #[serde(default)]
    proto: String,
    #[serde(default)]
    config: Option<NgrokTunnelConfig>,
}

#[derive(Debug, Deserialize)]
struct NgrokTunnelConfig {
    #[serde(default)]
    addr: String,
}

impl NgrokTunnel {
    pub fn new(config: &TunnelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            bin: config.ngrok_bin.clone(),
            api_url: config.ngrok_api_url.trim_end_matches('/').to_string(),
            startup_timeout: Duration::from_secs(config.startup_timeout_secs),
            client,
        }
    }

    async fn read_public_url(&self, port: u16) -> Option<String> {
        let response = self
            .client
            .get(format!("{}/api/tunnels", self.api_url))
            .send()
            .await
            .ok()?;
        let tunnels: NgrokTunnels = response.json().await.ok()?;
        select_public_url(&tunnels.tunnels, port)
    }
}

/// Pick the tunnel forwarding to `port`, preferring https.
fn select_public_url(tunnels: &[NgrokTunnelInfo], port: u16) -> Option<String> {
    let suffix = format!(":{}", port);
    let mut matching: Vec<&NgrokTunnelInfo> = tunnels
        .iter()
        .filter(|t| {
            t.config
                .as_ref()
                .is_some_and(|c| c.addr.trim_end_matches('/').ends_with(&suffix))
        })
        .collect();
    matching.sort_by_key(|t| t.proto != "https");
    matching
        .first()
        .map(|t| t.public_url.trim_end_matches('/').to_string())
}

struct NgrokHandle {
    public_url: String,
    child: Option<Child>,
}

#[async_trait]
impl Tunnel for NgrokTunnel {
    fn name(&self) -> &str {
        "ngrok"
    }

    async fn open(&self, local_addr: SocketAddr) -> Result<Box<dyn TunnelHandle>, ExposureError> {
        let port = local_addr.port();
        let mut child = Command::new(&self.bin)
            .arg("http")
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExposureError::Tunnel(format!("failed to start {}: {}", self.bin, e)))?;

        info!(port, "Started ngrok agent");

        let deadline = Instant::now() + self.startup_timeout;
        loop {
            if let Some(public_url) = self.read_public_url(port).await {
                return Ok(Box::new(NgrokHandle {
                    public_url,
                    child: Some(child),
                }));
            }

            if let Ok(Some(status)) = child.try_wait() {
                return Err(ExposureError::Tunnel(format!(
                    "ngrok exited before the tunnel came up ({})",
                    status
                )));
            }

            if Instant::now() >= deadline {
                let _ = child.kill().await;
                return Err(ExposureError::TunnelTimeout(self.startup_timeout));
            }

            debug!(port, "Waiting for ngrok tunnel");
            tokio::time::sleep(NGROK_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl TunnelHandle for NgrokHandle {
    fn public_url(&self) -> &str {
        &self.public_url
    }

    async fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to stop ngrok agent: {}", e);
            } else {
                info!("ngrok tunnel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunnels(json: &str) -> Vec<NgrokTunnelInfo> {
        serde_json::from_str::<NgrokTunnels>(json).unwrap().tunnels
    }

    #[test]
    fn test_select_prefers_https_for_port() {
        let list = tunnels(
            r#"{"tunnels": [
                {"public_url": "http://a.ngrok.io", "proto": "http", "config": {"addr": "http://localhost:8000"}},
                {"public_url": "https://a.ngrok.io/", "proto": "https", "config": {"addr": "http://localhost:8000"}},
                {"public_url": "https://b.ngrok.io", "proto": "https", "config": {"addr": "http://localhost:9000"}}
            ]}"#,
        );
        assert_eq!(
            select_public_url(&list, 8000).as_deref(),
            Some("https://a.ngrok.io")
        );
        assert_eq!(
            select_public_url(&list, 9000).as_deref(),
            Some("https://b.ngrok.io")
        );
        assert_eq!(select_public_url(&list, 7000), None);
    }

    #[test]
    fn test_select_ignores_tunnels_without_config() {
        let list = tunnels(r#"{"tunnels": [{"public_url": "https://x.ngrok.io", "proto": "https"}]}"#);
        assert_eq!(select_public_url(&list, 8000), None);
    }

    #[tokio::test]
    async fn test_static_tunnel_trims_trailing_slash() {
        let tunnel = StaticTunnel::new("https://images.example.com/");
        let mut handle = tunnel.open("127.0.0.1:8000".parse().unwrap()).await.unwrap();
        assert_eq!(handle.public_url(), "https://images.example.com");
        handle.close().await;
    }

    #[tokio::test]
    async fn test_ngrok_missing_binary_fails() {
        let config = TunnelConfig {
            ngrok_bin: "/nonexistent/ngrok-binary".to_string(),
            ..TunnelConfig::default()
        };
        let tunnel = NgrokTunnel::new(&config);
        let result = tunnel.open("127.0.0.1:8000".parse().unwrap()).await;
        assert!(matches!(result, Err(ExposureError::Tunnel(_))));
    }
}
