//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam of the publishing pipeline, so batches can
//! run end to end without network access or a tunnel.
//!
//! # Example
//!
//! ```rust,ignore
//! use easel_core::testing::{MockCaptionProvider, MockExposer, MockPublisher};
//!
//! let publisher = Arc::new(MockPublisher::new());
//! let exposer = Arc::new(MockExposer::new());
//! let orchestrator = PublishingOrchestrator::new(
//!     PipelineConfig::default(),
//!     Arc::new(MockCaptionProvider::new()),
//!     publisher.clone(),
//!     exposer.clone(),
//!     "fallback",
//! );
//! let summary = orchestrator.run(dir.path()).await?;
//! assert_eq!(exposer.shutdown_count(), 1);
//! ```

mod mock_caption;
mod mock_exposer;
mod mock_publisher;

pub use mock_caption::MockCaptionProvider;
pub use mock_exposer::MockExposer;
pub use mock_publisher::{MockPublisher, RecordedContainer};
