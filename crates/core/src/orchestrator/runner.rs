//! Publishing orchestrator implementation.
//!
//! One batch: discover candidates, expose the image directory, then drive each
//! image through caption -> container -> poll -> publish -> move, strictly one
//! at a time. Per-item failures are recorded and the batch continues; the
//! exposure is shut down exactly once, on every exit path.

use std::path::Path;
use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::caption::{caption_or_fallback, CaptionProvider};
use crate::exposure::Exposer;
use crate::publisher::{ContainerId, ContainerStatus, MediaPublisher};
use crate::tracker::{
    file_sha256, Candidate, JournalEntry, ProcessingTracker, PublishJournal, PublishStatus,
};

use super::config::PipelineConfig;
use super::types::{
    BatchSummary, ItemFailure, ItemOutcome, ItemStage, OrchestratorError, PipelineError,
};

/// Drives a batch of images through the publishing pipeline.
#[derive(Clone)]
pub struct PublishingOrchestrator {
    config: PipelineConfig,
    captions: Arc<dyn CaptionProvider>,
    publisher: Arc<dyn MediaPublisher>,
    exposer: Arc<dyn Exposer>,
    journal: Option<Arc<dyn PublishJournal>>,
    fallback_caption: String,
    run_id: String,
}

impl PublishingOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: PipelineConfig,
        captions: Arc<dyn CaptionProvider>,
        publisher: Arc<dyn MediaPublisher>,
        exposer: Arc<dyn Exposer>,
        fallback_caption: impl Into<String>,
    ) -> Self {
        Self {
            config,
            captions,
            publisher,
            exposer,
            journal: None,
            fallback_caption: fallback_caption.into(),
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Record publish progress in a durable journal.
    pub fn with_journal(mut self, journal: Arc<dyn PublishJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one batch over `images_dir`.
    ///
    /// Returns an error only when discovery or exposure startup fails. A panic
    /// inside the batch is re-raised after the exposure has been shut down.
    pub async fn run(&self, images_dir: &Path) -> Result<BatchSummary, OrchestratorError> {
        info!(run_id = %self.run_id, dir = %images_dir.display(), "Starting publishing batch");

        let tracker = ProcessingTracker::new(images_dir, &self.config.marker);
        let candidates = tracker.discover().await.map_err(|e| {
            error!("Image discovery failed: {}", e);
            OrchestratorError::Discovery(e)
        })?;

        if candidates.is_empty() {
            info!("No unprocessed images found");
            return Ok(BatchSummary::default());
        }

        info!(count = candidates.len(), "Found unprocessed images");
        for candidate in &candidates {
            info!(filename = %candidate.filename, "Queued");
        }

        let mut exposure = self.exposer.expose(images_dir).await.map_err(|e| {
            error!("Failed to expose image directory: {}", e);
            OrchestratorError::Exposure(e)
        })?;
        let queued: Vec<(Candidate, String)> = candidates
            .into_iter()
            .map(|candidate| {
                let image_url = exposure.url_for(&candidate.filename);
                (candidate, image_url)
            })
            .collect();

        // The batch runs on its own task so a panic surfaces as a JoinError
        // and teardown still happens here.
        let this = self.clone();
        let batch = tokio::spawn(async move {
            this.process_batch(&tracker, &queued).await
        });
        let result = batch.await;

        exposure.shutdown().await;

        match result {
            Ok(summary) => Ok(summary),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(OrchestratorError::Aborted(e.to_string())),
        }
    }

    async fn process_batch(
        &self,
        tracker: &ProcessingTracker,
        queued: &[(Candidate, String)],
    ) -> BatchSummary {
        let total = queued.len();
        let mut summary = BatchSummary::new(total);

        for (index, (candidate, image_url)) in queued.iter().enumerate() {
            info!(
                filename = %candidate.filename,
                position = index + 1,
                total,
                "Processing image"
            );

            match self.process_item(tracker, candidate, image_url).await {
                Ok(outcome) => {
                    summary.record_success(&outcome);
                    let is_last = index + 1 == total;
                    if matches!(outcome, ItemOutcome::Published { .. }) && !is_last {
                        debug!(delay = ?self.config.upload_delay(), "Waiting before next upload");
                        sleep(self.config.upload_delay()).await;
                    }
                }
                Err(failure) => {
                    warn!(
                        filename = %candidate.filename,
                        stage = %failure.stage,
                        error = %failure.error,
                        "Failed to publish image"
                    );
                    summary.record_failure(&candidate.filename, failure);
                }
            }
        }

        summary.log();
        summary
    }

    /// Run one image through the pipeline, tagging any error with the stage it hit.
    pub async fn process_item(
        &self,
        tracker: &ProcessingTracker,
        candidate: &Candidate,
        image_url: &str,
    ) -> Result<ItemOutcome, ItemFailure> {
        let mut stage = ItemStage::Discovered;
        self.publish_candidate(tracker, candidate, image_url, &mut stage)
            .await
            .map_err(|error| ItemFailure { stage, error })
    }

    async fn publish_candidate(
        &self,
        tracker: &ProcessingTracker,
        candidate: &Candidate,
        image_url: &str,
        stage: &mut ItemStage,
    ) -> Result<ItemOutcome, PipelineError> {
        let filename = candidate.filename.as_str();
        let content_hash = self.content_hash(candidate).await;

        if self.awaits_move(filename, content_hash.as_deref()) {
            info!(filename, "Already published by an earlier run, completing move");
            *stage = ItemStage::Published;
            tracker.mark_processed(&candidate.path).await?;
            self.record(JournalEntry::new(filename, PublishStatus::Moved, &self.run_id));
            *stage = ItemStage::Moved;
            return Ok(ItemOutcome::Recovered);
        }

        let caption =
            caption_or_fallback(self.captions.as_ref(), filename, &self.fallback_caption).await;
        *stage = ItemStage::Captioned;

        let container = self.publisher.create_container(&caption, image_url).await?;
        *stage = ItemStage::ContainerCreated;
        info!(filename, container = %container, "Media container created");
        self.record(
            JournalEntry::new(filename, PublishStatus::ContainerCreated, &self.run_id)
                .with_container(container.as_str())
                .with_content_hash(content_hash.clone()),
        );

        *stage = ItemStage::Polling;
        self.wait_for_container(&container).await?;
        *stage = ItemStage::Processed;

        let post_id = self.publisher.publish(&container).await?;
        *stage = ItemStage::Published;
        info!(filename, post_id = %post_id, "Image published");
        self.record(
            JournalEntry::new(filename, PublishStatus::Published, &self.run_id)
                .with_container(container.as_str())
                .with_post(post_id.as_str())
                .with_content_hash(content_hash),
        );

        if let Err(e) = tracker.mark_processed(&candidate.path).await {
            if self.journal.is_none() {
                warn!(filename, "Published but not moved; it will be published again next run");
            }
            return Err(e.into());
        }
        self.record(JournalEntry::new(filename, PublishStatus::Moved, &self.run_id));
        *stage = ItemStage::Moved;

        Ok(ItemOutcome::Published { post_id })
    }

    /// Poll the container until it reaches a terminal status or the ceiling is exceeded.
    async fn wait_for_container(&self, container: &ContainerId) -> Result<(), PipelineError> {
        let started = Instant::now();

        loop {
            let status = self.publisher.container_status(container).await?;
            if status.is_terminal() {
                if status != ContainerStatus::Finished {
                    return Err(PipelineError::ProcessingFailed { status });
                }
                debug!(container = %container, "Container finished processing");
                return Ok(());
            }

            let elapsed = started.elapsed();
            if elapsed > self.config.poll_timeout() {
                return Err(PipelineError::ProcessingTimeout { elapsed });
            }
            debug!(container = %container, %status, ?elapsed, "Container still processing");
            sleep(self.config.poll_interval()).await;
        }
    }

    async fn content_hash(&self, candidate: &Candidate) -> Option<String> {
        if self.journal.is_none() {
            return None;
        }
        match file_sha256(&candidate.path).await {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(filename = %candidate.filename, "Failed to hash image: {}", e);
                None
            }
        }
    }

    fn awaits_move(&self, filename: &str, content_hash: Option<&str>) -> bool {
        let Some(journal) = &self.journal else {
            return false;
        };
        match journal.get(filename) {
            Ok(Some(entry)) => entry.awaits_move(content_hash),
            Ok(None) => false,
            Err(e) => {
                warn!(filename, "Failed to read publish journal: {}", e);
                false
            }
        }
    }

    fn record(&self, entry: JournalEntry) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record(&entry) {
                warn!(
                    filename = %entry.filename,
                    status = %entry.status,
                    "Failed to write publish journal: {}", e
                );
            }
        }
    }
}
