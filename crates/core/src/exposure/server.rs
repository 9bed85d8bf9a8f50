//! Static file server for the image directory.

use async_trait::async_trait;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use super::{Exposer, Exposure, ExposureError, Tunnel, TunnelHandle};

/// How long shutdown waits for in-flight requests before aborting the server task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Router serving the files under `root`. Nothing outside `root` is reachable.
pub fn file_router(root: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(TraceLayer::new_for_http())
}

/// Serves a directory with axum and exposes it through a tunnel.
pub struct HttpExposer {
    bind_addr: SocketAddr,
    tunnel: Box<dyn Tunnel>,
}

impl HttpExposer {
    pub fn new(bind_addr: SocketAddr, tunnel: Box<dyn Tunnel>) -> Self {
        Self { bind_addr, tunnel }
    }

    /// Bind and start serving `root` on a background task.
    pub async fn serve(&self, root: &Path) -> Result<RunningServer, ExposureError> {
        if !root.is_dir() {
            return Err(ExposureError::NotADirectory(root.display().to_string()));
        }

        let listener =
            TcpListener::bind(self.bind_addr)
                .await
                .map_err(|source| ExposureError::Bind {
                    addr: self.bind_addr,
                    source,
                })?;
        let local_addr = listener.local_addr()?;
        let router = file_router(root);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!("File server error: {}", e);
            }
        });

        info!(root = %root.display(), addr = %local_addr, "File server started");

        Ok(RunningServer {
            local_addr,
            root: root.to_path_buf(),
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

#[async_trait]
impl Exposer for HttpExposer {
    async fn expose(&self, root: &Path) -> Result<Box<dyn Exposure>, ExposureError> {
        let mut server = self.serve(root).await?;

        let tunnel = match self.tunnel.open(server.local_addr).await {
            Ok(tunnel) => tunnel,
            Err(e) => {
                // Do not leak the server when the tunnel cannot be opened.
                server.stop().await;
                return Err(e);
            }
        };

        info!(
            tunnel = self.tunnel.name(),
            public_url = tunnel.public_url(),
            "Image directory exposed"
        );

        Ok(Box::new(ServedDirectory {
            server,
            tunnel: Some(tunnel),
        }))
    }
}

/// Handle to the background file server task.
pub struct RunningServer {
    local_addr: SocketAddr,
    root: PathBuf,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Signal graceful shutdown and wait for the task. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(_) => debug!(addr = %self.local_addr, "File server stopped"),
                Err(_) => {
                    warn!(
                        addr = %self.local_addr,
                        "File server did not drain within {:?}, aborting", SHUTDOWN_GRACE
                    );
                    task.abort();
                }
            }
        }
    }
}

/// A served directory plus its open tunnel.
pub struct ServedDirectory {
    server: RunningServer,
    tunnel: Option<Box<dyn TunnelHandle>>,
}

#[async_trait]
impl Exposure for ServedDirectory {
    fn public_url(&self) -> &str {
        self.tunnel
            .as_ref()
            .map(|t| t.public_url())
            .unwrap_or_default()
    }

    async fn shutdown(&mut self) {
        if let Some(mut tunnel) = self.tunnel.take() {
            tunnel.close().await;
        }
        self.server.stop().await;
        info!(root = %self.server.root().display(), "Exposure shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::StaticTunnel;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_file_router_serves_files_from_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("dalle_a_b_vivid_1.png"), b"png-bytes").unwrap();

        let response = file_router(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/dalle_a_b_vivid_1.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"png-bytes");
    }

    #[tokio::test]
    async fn test_file_router_missing_file_is_404() {
        let dir = TempDir::new().unwrap();

        let response = file_router(dir.path())
            .oneshot(Request::builder().uri("/nope.png").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_expose_serves_over_tcp_and_shuts_down() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("img.png"), b"abc").unwrap();
        let cwd_before = std::env::current_dir().unwrap();

        let exposer = HttpExposer::new(
            loopback(),
            Box::new(StaticTunnel::new("https://public.example.com/")),
        );
        let mut server = exposer.serve(dir.path()).await.unwrap();
        let addr = server.local_addr();

        let body = reqwest::get(format!("http://{}/img.png", addr))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&body[..], b"abc");
        assert_eq!(std::env::current_dir().unwrap(), cwd_before);

        server.stop().await;
        server.stop().await;
        assert!(reqwest::get(format!("http://{}/img.png", addr)).await.is_err());
    }

    #[tokio::test]
    async fn test_expose_returns_public_url() {
        let dir = TempDir::new().unwrap();
        let exposer = HttpExposer::new(
            loopback(),
            Box::new(StaticTunnel::new("https://public.example.com/")),
        );

        let mut exposure = exposer.expose(dir.path()).await.unwrap();
        assert_eq!(exposure.public_url(), "https://public.example.com");
        assert_eq!(
            exposure.url_for("dalle_a_b_vivid_1.png"),
            "https://public.example.com/dalle_a_b_vivid_1.png"
        );
        exposure.shutdown().await;
    }

    #[tokio::test]
    async fn test_expose_rejects_missing_root() {
        let exposer = HttpExposer::new(loopback(), Box::new(StaticTunnel::new("https://x")));
        let result = exposer.expose(Path::new("/definitely/not/here")).await;
        assert!(matches!(result, Err(ExposureError::NotADirectory(_))));
    }

    struct FailingTunnel;

    #[async_trait]
    impl Tunnel for FailingTunnel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn open(
            &self,
            _local_addr: SocketAddr,
        ) -> Result<Box<dyn TunnelHandle>, ExposureError> {
            Err(ExposureError::Tunnel("refused by test".to_string()))
        }
    }

    fn free_loopback_port() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    #[tokio::test]
    async fn test_expose_stops_server_when_tunnel_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("img.png"), b"x").unwrap();
        let addr = free_loopback_port();

        let exposer = HttpExposer::new(addr, Box::new(FailingTunnel));
        let result = exposer.expose(dir.path()).await;
        assert!(matches!(result, Err(ExposureError::Tunnel(_))));

        assert!(reqwest::get(format!("http://{}/img.png", addr)).await.is_err());
        let rebound = TcpListener::bind(addr).await;
        assert!(rebound.is_ok());
    }
}
