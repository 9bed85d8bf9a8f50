//! Types for the publishing orchestrator.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::exposure::ExposureError;
use crate::publisher::{ContainerStatus, PostId, PublishError};
use crate::tracker::TrackerError;

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The images directory could not be scanned.
    #[error("discovery failed: {0}")]
    Discovery(#[from] TrackerError),

    /// The image directory could not be made publicly reachable.
    #[error("exposure failed: {0}")]
    Exposure(#[from] ExposureError),

    /// The batch task ended without producing a summary.
    #[error("batch aborted: {0}")]
    Aborted(String),
}

/// Errors that fail a single image. The batch continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("remote API error: {0}")]
    Remote(#[from] PublishError),

    #[error("container processing ended with status {status}")]
    ProcessingFailed { status: ContainerStatus },

    #[error("container still processing after {elapsed:?}")]
    ProcessingTimeout { elapsed: Duration },

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl PipelineError {
    /// Terminal stage an item ends in after this error.
    pub fn terminal_stage(&self) -> ItemStage {
        match self {
            PipelineError::ProcessingTimeout { .. } => ItemStage::FailedTimeout,
            PipelineError::Remote(_) | PipelineError::ProcessingFailed { .. } => {
                ItemStage::FailedRemote
            }
            PipelineError::Tracker(_) => ItemStage::Failed,
        }
    }
}

/// Progress of one image through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    Discovered,
    Captioned,
    ContainerCreated,
    Polling,
    /// The container reached FINISHED.
    Processed,
    Published,
    Moved,
    FailedTimeout,
    FailedRemote,
    Failed,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStage::Discovered => "discovered",
            ItemStage::Captioned => "captioned",
            ItemStage::ContainerCreated => "container_created",
            ItemStage::Polling => "polling",
            ItemStage::Processed => "processed",
            ItemStage::Published => "published",
            ItemStage::Moved => "moved",
            ItemStage::FailedTimeout => "failed_timeout",
            ItemStage::FailedRemote => "failed_remote",
            ItemStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How a successful item completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Published in this run.
    Published { post_id: PostId },
    /// Published by an earlier run; only the move was left.
    Recovered,
}

/// An item that failed, with the stage it was in when the error hit.
#[derive(Debug)]
pub struct ItemFailure {
    pub stage: ItemStage,
    pub error: PipelineError,
}

/// A failed image in the batch summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub filename: String,
    /// Stage the item was in when it failed.
    pub stage: ItemStage,
    /// Terminal failure stage.
    pub outcome: ItemStage,
    pub error: String,
}

/// Result of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    /// Successes that only completed an earlier run's move.
    pub recovered: usize,
    pub failures: Vec<FailedItem>,
}

impl BatchSummary {
    pub fn new(attempted: usize) -> Self {
        Self {
            attempted,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self, outcome: &ItemOutcome) {
        self.succeeded += 1;
        if matches!(outcome, ItemOutcome::Recovered) {
            self.recovered += 1;
        }
    }

    pub fn record_failure(&mut self, filename: impl Into<String>, failure: ItemFailure) {
        self.failures.push(FailedItem {
            filename: filename.into(),
            stage: failure.stage,
            outcome: failure.error.terminal_stage(),
            error: failure.error.to_string(),
        });
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn failed_filenames(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.filename.as_str()).collect()
    }

    pub fn log(&self) {
        info!(
            attempted = self.attempted,
            succeeded = self.succeeded,
            recovered = self.recovered,
            failed = self.failed(),
            "Batch complete: uploaded {}/{}",
            self.succeeded,
            self.attempted
        );
        for failure in &self.failures {
            warn!(
                filename = %failure.filename,
                stage = %failure.stage,
                outcome = %failure.outcome,
                error = %failure.error,
                "Image not published"
            );
        }
    }
}
