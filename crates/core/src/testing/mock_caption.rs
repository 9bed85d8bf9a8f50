//! Mock caption provider for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::caption::{CaptionError, CaptionProvider};

/// Mock implementation of the CaptionProvider trait.
///
/// Returns `"Caption for {filename}"`, or fails every call when built with
/// [`MockCaptionProvider::failing`].
#[derive(Debug, Default)]
pub struct MockCaptionProvider {
    requests: Arc<RwLock<Vec<String>>>,
    fail: bool,
}

impl MockCaptionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Filenames captions were requested for.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl CaptionProvider for MockCaptionProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn caption(&self, filename: &str) -> Result<String, CaptionError> {
        self.requests.write().await.push(filename.to_string());
        if self.fail {
            return Err(CaptionError::Provider("mock provider unavailable".to_string()));
        }
        Ok(format!("Caption for {}", filename))
    }
}
