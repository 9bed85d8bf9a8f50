//! Remote publishing client for the Instagram Graph API.
//!
//! Publishing an image is a three-step remote protocol:
//!
//! 1. create a media container that references a publicly fetchable image URL
//! 2. poll the container's `status_code` until processing reaches a terminal status
//! 3. publish the finished container
//!
//! Each step is a single request; non-success HTTP statuses surface as
//! [`PublishError::Api`]. Polling policy lives in the orchestrator.

mod error;
mod graph;
mod traits;
mod types;

pub use error::PublishError;
pub use graph::GraphApiPublisher;
pub use traits::MediaPublisher;
pub use types::{ContainerId, ContainerStatus, PostId};
