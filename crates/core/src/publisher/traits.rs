//! Trait definitions for the publisher module.

use async_trait::async_trait;

use super::error::PublishError;
use super::types::{ContainerId, ContainerStatus, PostId};

/// A remote media publishing service.
#[async_trait]
pub trait MediaPublisher: Send + Sync {
    /// Returns the name of this publisher implementation.
    fn name(&self) -> &str;

    /// Create a media container for a publicly fetchable image.
    async fn create_container(
        &self,
        caption: &str,
        image_url: &str,
    ) -> Result<ContainerId, PublishError>;

    /// Read the container's current processing status. Always a fresh remote read.
    async fn container_status(&self, container: &ContainerId)
        -> Result<ContainerStatus, PublishError>;

    /// Publish a finished container.
    async fn publish(&self, container: &ContainerId) -> Result<PostId, PublishError>;
}
