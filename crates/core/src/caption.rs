//! Best-effort caption synthesis.
//!
//! Captions are drafted by a completion model from the prompt and style encoded
//! in the image filename. Any failure (malformed name, provider error) is
//! recoverable: callers use [`caption_or_fallback`] and publish with a generic
//! caption instead.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::naming::{CandidateName, NamingError};

/// Errors that can occur while drafting a caption.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("malformed filename: {0}")]
    MalformedFilename(#[from] NamingError),

    #[error("caption provider failed: {0}")]
    Provider(String),
}

impl From<LlmError> for CaptionError {
    fn from(e: LlmError) -> Self {
        CaptionError::Provider(e.to_string())
    }
}

/// Produces a caption for a generated image.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Name of this provider for logging.
    fn name(&self) -> &str;

    /// Draft a caption for the image with the given filename.
    async fn caption(&self, filename: &str) -> Result<String, CaptionError>;
}

/// Caption provider backed by a completion model.
pub struct LlmCaptionProvider {
    client: Arc<dyn LlmClient>,
    marker: String,
}

impl LlmCaptionProvider {
    pub fn new(client: Arc<dyn LlmClient>, marker: impl Into<String>) -> Self {
        Self {
            client,
            marker: marker.into(),
        }
    }
}

/// Build the instruction sent to the completion model.
pub fn caption_instructions(prompt: &str, style: &str) -> String {
    format!(
        "Create Instagram caption for AI art with:\n\
         - Prompt: \"{prompt}\"\n\
         - Style: \"{style}\"\n\
         - 5-7 emojis\n\
         - 3-5 hashtags\n\
         - Mysterious tone\n\
         - <220 characters\n\
         - No markdown"
    )
}

#[async_trait]
impl CaptionProvider for LlmCaptionProvider {
    fn name(&self) -> &str {
        self.client.provider()
    }

    async fn caption(&self, filename: &str) -> Result<String, CaptionError> {
        let name = CandidateName::parse(filename, &self.marker)?;

        let request = CompletionRequest::new(caption_instructions(&name.prompt, &name.style))
            .with_max_tokens(300)
            .with_temperature(0.9);

        let response = self.client.complete(request).await?;
        let caption = response.text.trim().to_string();
        if caption.is_empty() {
            return Err(CaptionError::Provider(format!(
                "{} returned an empty caption",
                self.client.model()
            )));
        }

        Ok(caption)
    }
}

/// Draft a caption, substituting `fallback` on any failure. Never fails.
pub async fn caption_or_fallback(
    provider: &dyn CaptionProvider,
    filename: &str,
    fallback: &str,
) -> String {
    match provider.caption(filename).await {
        Ok(caption) => {
            info!(filename, caption = %caption, "Caption generated");
            caption
        }
        Err(e) => {
            warn!(
                filename,
                provider = provider.name(),
                error = %e,
                "Caption generation failed, using fallback caption"
            );
            fallback.to_string()
        }
    }
}
