//! Mock media publisher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::publisher::{ContainerId, ContainerStatus, MediaPublisher, PostId, PublishError};

/// A recorded create_container call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedContainer {
    pub container_id: ContainerId,
    pub caption: String,
    pub image_url: String,
    /// Last path segment of the image URL.
    pub filename: String,
}

#[derive(Debug, Default)]
struct MockPublisherState {
    containers: Vec<RecordedContainer>,
    /// Scripted statuses per filename, consumed one per status query.
    statuses: HashMap<String, VecDeque<ContainerStatus>>,
    status_queries: usize,
    published: Vec<String>,
    fail_create: HashSet<String>,
    fail_publish: HashSet<String>,
    panic_on_create: HashSet<String>,
    counter: u32,
}

/// Mock implementation of the MediaPublisher trait.
///
/// Containers finish on the first status query unless statuses are scripted
/// for a filename; once a script runs out, the default status is returned.
///
/// # Example
///
/// ```rust,ignore
/// use easel_core::testing::MockPublisher;
///
/// let publisher = MockPublisher::new();
/// publisher.fail_create_for("dalle_a_b_vivid_1.png").await;
/// publisher
///     .set_statuses_for("dalle_c_d_vivid_2.png", vec![ContainerStatus::InProgress("IN_PROGRESS".into())])
///     .await;
/// ```
#[derive(Debug)]
pub struct MockPublisher {
    state: Arc<RwLock<MockPublisherState>>,
    default_status: ContainerStatus,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockPublisherState::default())),
            default_status: ContainerStatus::Finished,
        }
    }

    /// Status returned when no scripted status is left.
    pub fn with_default_status(mut self, status: ContainerStatus) -> Self {
        self.default_status = status;
        self
    }

    pub async fn set_statuses_for(&self, filename: &str, statuses: Vec<ContainerStatus>) {
        self.state
            .write()
            .await
            .statuses
            .insert(filename.to_string(), statuses.into());
    }

    pub async fn fail_create_for(&self, filename: &str) {
        self.state
            .write()
            .await
            .fail_create
            .insert(filename.to_string());
    }

    pub async fn fail_publish_for(&self, filename: &str) {
        self.state
            .write()
            .await
            .fail_publish
            .insert(filename.to_string());
    }

    pub async fn panic_on_create_for(&self, filename: &str) {
        self.state
            .write()
            .await
            .panic_on_create
            .insert(filename.to_string());
    }

    pub async fn containers(&self) -> Vec<RecordedContainer> {
        self.state.read().await.containers.clone()
    }

    /// Filenames that were published, in order.
    pub async fn published(&self) -> Vec<String> {
        self.state.read().await.published.clone()
    }

    pub async fn status_queries(&self) -> usize {
        self.state.read().await.status_queries
    }

    fn filename_of(image_url: &str) -> String {
        image_url
            .rsplit('/')
            .next()
            .unwrap_or(image_url)
            .to_string()
    }

    fn rejected(message: &str) -> PublishError {
        PublishError::Api {
            status: 400,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl MediaPublisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_container(
        &self,
        caption: &str,
        image_url: &str,
    ) -> Result<ContainerId, PublishError> {
        let filename = Self::filename_of(image_url);
        let mut state = self.state.write().await;

        if state.panic_on_create.contains(&filename) {
            panic!("mock publisher panicked on {}", filename);
        }
        if state.fail_create.contains(&filename) {
            return Err(Self::rejected("Invalid image URL"));
        }

        state.counter += 1;
        let container_id = ContainerId::new(format!("container-{}", state.counter));
        state.containers.push(RecordedContainer {
            container_id: container_id.clone(),
            caption: caption.to_string(),
            image_url: image_url.to_string(),
            filename,
        });
        Ok(container_id)
    }

    async fn container_status(
        &self,
        container: &ContainerId,
    ) -> Result<ContainerStatus, PublishError> {
        let mut state = self.state.write().await;
        state.status_queries += 1;

        let filename = state
            .containers
            .iter()
            .find(|c| &c.container_id == container)
            .map(|c| c.filename.clone())
            .ok_or_else(|| Self::rejected("Unknown container"))?;

        let scripted = state
            .statuses
            .get_mut(&filename)
            .and_then(|queue| queue.pop_front());
        Ok(scripted.unwrap_or_else(|| self.default_status.clone()))
    }

    async fn publish(&self, container: &ContainerId) -> Result<PostId, PublishError> {
        let mut state = self.state.write().await;

        let filename = state
            .containers
            .iter()
            .find(|c| &c.container_id == container)
            .map(|c| c.filename.clone())
            .ok_or_else(|| Self::rejected("Unknown container"))?;

        if state.fail_publish.contains(&filename) {
            return Err(Self::rejected("Media ID is not available"));
        }

        state.published.push(filename);
        Ok(PostId::new(format!("post-{}", container.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_statuses_then_default() {
        let publisher = MockPublisher::new();
        publisher
            .set_statuses_for(
                "a.png",
                vec![ContainerStatus::InProgress("IN_PROGRESS".to_string())],
            )
            .await;

        let container = publisher
            .create_container("caption", "https://x/a.png")
            .await
            .unwrap();
        assert_eq!(
            publisher.container_status(&container).await.unwrap(),
            ContainerStatus::InProgress("IN_PROGRESS".to_string())
        );
        assert_eq!(
            publisher.container_status(&container).await.unwrap(),
            ContainerStatus::Finished
        );
        assert_eq!(publisher.status_queries().await, 2);

        publisher.publish(&container).await.unwrap();
        assert_eq!(publisher.published().await, vec!["a.png"]);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let publisher = MockPublisher::new();
        publisher.fail_create_for("bad.png").await;
        publisher.fail_publish_for("late.png").await;

        assert!(publisher
            .create_container("c", "https://x/bad.png")
            .await
            .is_err());

        let container = publisher
            .create_container("c", "https://x/late.png")
            .await
            .unwrap();
        assert!(publisher.publish(&container).await.unwrap_err().is_api_error());
        assert!(publisher.published().await.is_empty());
    }
}
