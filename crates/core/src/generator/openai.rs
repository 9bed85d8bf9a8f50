//! OpenAI images API generator.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::naming::generated_filename;

use super::{validate_params, GenerationParams, GeneratorError, ImageGenerator};

const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Generates images with the OpenAI images endpoint and saves them as PNG.
pub struct OpenAiImageGenerator {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    images_dir: PathBuf,
    marker: String,
}

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    n: u32,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl OpenAiImageGenerator {
    pub fn new(
        api_key: impl Into<String>,
        images_dir: impl Into<PathBuf>,
        marker: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            api_base: "https://api.openai.com".to_string(),
            images_dir: images_dir.into(),
            marker: marker.into(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from configuration. The key falls back to `OPENAI_API_KEY`.
    pub fn from_config(
        config: &GeneratorConfig,
        images_dir: impl Into<PathBuf>,
        marker: impl Into<String>,
    ) -> Result<Self, GeneratorError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()))
            .ok_or_else(|| {
                GeneratorError::NotConfigured("generator.api_key or OPENAI_API_KEY".to_string())
            })?;

        let mut generator = Self::new(api_key, images_dir, marker);
        if let Some(base) = &config.api_base {
            generator = generator.with_api_base(base);
        }
        Ok(generator)
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    async fn request_image_url(&self, params: &GenerationParams) -> Result<String, GeneratorError> {
        let styled = params.supports_style();
        let request = ImagesRequest {
            model: &params.model,
            prompt: &params.prompt,
            size: &params.size,
            n: 1,
            response_format: "url",
            style: styled.then_some(params.style.as_str()),
            quality: styled.then_some(params.quality.as_str()),
        };

        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::Http(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(GeneratorError::Api { status, message });
        }

        let body: ImagesResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::InvalidResponse(e.to_string()))?;

        body.data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| GeneratorError::InvalidResponse("no image url in response".to_string()))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, GeneratorError> {
        let response = self
            .client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| GeneratorError::Download(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeneratorError::Download(format!(
                "status {}",
                response.status().as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GeneratorError::Download(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, params: &GenerationParams) -> Result<PathBuf, GeneratorError> {
        validate_params(params)?;

        debug!(model = %params.model, size = %params.size, "Requesting image generation");
        let url = self.request_image_url(params).await?;
        let bytes = self.download(&url).await?;

        let timestamp = Utc::now().timestamp().max(0) as u64;
        let filename =
            generated_filename(&self.marker, &params.prompt, &params.style, timestamp, "png");
        let path = self.images_dir.join(filename);

        tokio::fs::create_dir_all(&self.images_dir)
            .await
            .map_err(|source| GeneratorError::Write {
                path: self.images_dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| GeneratorError::Write {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), bytes = bytes.len(), "Image saved");
        Ok(path)
    }
}
