//! Publish journal trait and types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt journal entry for {filename}: {reason}")]
    Corrupt { filename: String, reason: String },
}

/// Explicit per-file publish status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// A container exists remotely; nothing is published yet.
    ContainerCreated,
    /// The post is live but the file has not been moved to processed/.
    Published,
    /// The file was moved to processed/. Terminal.
    Moved,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::ContainerCreated => "container_created",
            PublishStatus::Published => "published",
            PublishStatus::Moved => "moved",
        }
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "container_created" => Ok(PublishStatus::ContainerCreated),
            "published" => Ok(PublishStatus::Published),
            "moved" => Ok(PublishStatus::Moved),
            other => Err(format!("unknown publish status: {}", other)),
        }
    }
}

/// The journal's record for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub filename: String,
    pub status: PublishStatus,
    pub container_id: Option<String>,
    pub post_id: Option<String>,
    /// sha256 of the file bytes when the entry was written.
    pub content_hash: Option<String>,
    /// Batch run that wrote the entry.
    pub run_id: String,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(filename: impl Into<String>, status: PublishStatus, run_id: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status,
            container_id: None,
            post_id: None,
            content_hash: None,
            run_id: run_id.into(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn with_post(mut self, post_id: impl Into<String>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }

    pub fn with_content_hash(mut self, hash: Option<String>) -> Self {
        self.content_hash = hash;
        self
    }

    /// Published remotely but not yet moved, for the same file content.
    pub fn awaits_move(&self, content_hash: Option<&str>) -> bool {
        self.status == PublishStatus::Published
            && self.content_hash.is_some()
            && self.content_hash.as_deref() == content_hash
    }
}

/// Durable record of publish progress, keyed by filename.
pub trait PublishJournal: Send + Sync {
    /// Fetch the entry for a filename.
    fn get(&self, filename: &str) -> Result<Option<JournalEntry>, JournalError>;

    /// Insert or replace the entry for `entry.filename`.
    fn record(&self, entry: &JournalEntry) -> Result<(), JournalError>;
}
