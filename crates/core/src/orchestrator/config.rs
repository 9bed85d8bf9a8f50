//! Batch pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::naming::DEFAULT_MARKER;

/// Configuration for a publishing batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory scanned for candidate images.
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// First filename token of generated images.
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Pause after each successful publish, except the last (seconds).
    #[serde(default = "default_upload_delay")]
    pub upload_delay_secs: u64,

    /// Interval between container status queries (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up on a container that is still processing after this long (seconds).
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

fn default_upload_delay() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    5
}

fn default_poll_timeout() -> u64 {
    300 // 5 minutes
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            marker: default_marker(),
            upload_delay_secs: default_upload_delay(),
            poll_interval_secs: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl PipelineConfig {
    pub fn upload_delay(&self) -> Duration {
        Duration::from_secs(self.upload_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}
