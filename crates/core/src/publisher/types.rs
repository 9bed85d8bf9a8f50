//! Types for the publisher module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a remote media container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a published post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing status of a media container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    /// Ready to publish.
    Finished,
    /// Remote processing failed.
    Error,
    /// The container was not published in time and can no longer be used.
    Expired,
    /// Any non-terminal value (`IN_PROGRESS`, `PENDING`, ...). Empty when the
    /// response carried no status.
    InProgress(String),
}

impl ContainerStatus {
    /// Parse the Graph API `status_code` field.
    pub fn from_status_code(code: Option<&str>) -> Self {
        match code {
            Some("FINISHED") => ContainerStatus::Finished,
            Some("ERROR") => ContainerStatus::Error,
            Some("EXPIRED") => ContainerStatus::Expired,
            Some(other) => ContainerStatus::InProgress(other.to_string()),
            None => ContainerStatus::InProgress(String::new()),
        }
    }

    /// FINISHED, ERROR and EXPIRED end polling.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ContainerStatus::InProgress(_))
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerStatus::Finished => f.write_str("FINISHED"),
            ContainerStatus::Error => f.write_str("ERROR"),
            ContainerStatus::Expired => f.write_str("EXPIRED"),
            ContainerStatus::InProgress(code) if code.is_empty() => f.write_str("UNKNOWN"),
            ContainerStatus::InProgress(code) => f.write_str(code),
        }
    }
}
