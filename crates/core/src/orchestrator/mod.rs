//! Publishing orchestrator.
//!
//! Runs one batch per invocation:
//! - **Discovery**: unprocessed images, oldest first
//! - **Exposure**: the image directory is served publicly for the whole batch
//! - **Pipeline**: one image at a time, with a pause after each successful publish

mod config;
mod runner;
mod types;

pub use config::PipelineConfig;
pub use runner::PublishingOrchestrator;
pub use types::{
    BatchSummary, FailedItem, ItemFailure, ItemOutcome, ItemStage, OrchestratorError,
    PipelineError,
};
