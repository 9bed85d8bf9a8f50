pub mod caption;
pub mod config;
pub mod exposure;
pub mod generator;
pub mod llm;
pub mod naming;
pub mod orchestrator;
pub mod publisher;
pub mod testing;
pub mod tracker;

pub use caption::{caption_or_fallback, CaptionError, CaptionProvider, LlmCaptionProvider};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use exposure::{create_exposer, Exposer, Exposure, ExposureError, HttpExposer};
pub use generator::{GenerationParams, GeneratorError, ImageGenerator, OpenAiImageGenerator};
pub use orchestrator::{
    BatchSummary, FailedItem, ItemStage, OrchestratorError, PipelineConfig, PipelineError,
    PublishingOrchestrator,
};
pub use publisher::{GraphApiPublisher, MediaPublisher, PublishError};
pub use tracker::{ProcessingTracker, PublishJournal, SqlitePublishJournal, TrackerError};
