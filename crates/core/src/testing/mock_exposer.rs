//! Mock exposer for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::exposure::{Exposer, Exposure, ExposureError};

/// Mock implementation of the Exposer trait.
///
/// Nothing is served; the exposure only reports a fixed public URL. Every
/// `expose` and `shutdown` call is counted so tests can check teardown.
#[derive(Debug)]
pub struct MockExposer {
    public_url: String,
    fail: bool,
    roots: Arc<RwLock<Vec<PathBuf>>>,
    exposes: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

impl Default for MockExposer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExposer {
    pub fn new() -> Self {
        Self {
            public_url: "https://mock.tunnel.example".to_string(),
            fail: false,
            roots: Arc::new(RwLock::new(Vec::new())),
            exposes: Arc::new(AtomicUsize::new(0)),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An exposer whose startup always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub fn expose_count(&self) -> usize {
        self.exposes.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub async fn exposed_roots(&self) -> Vec<PathBuf> {
        self.roots.read().await.clone()
    }
}

#[async_trait]
impl Exposer for MockExposer {
    async fn expose(&self, root: &Path) -> Result<Box<dyn Exposure>, ExposureError> {
        self.exposes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExposureError::Tunnel("mock tunnel refused".to_string()));
        }
        self.roots.write().await.push(root.to_path_buf());

        Ok(Box::new(MockExposure {
            public_url: self.public_url.clone(),
            shutdowns: self.shutdowns.clone(),
        }))
    }
}

struct MockExposure {
    public_url: String,
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl Exposure for MockExposure {
    fn public_url(&self) -> &str {
        &self.public_url
    }

    async fn shutdown(&mut self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
