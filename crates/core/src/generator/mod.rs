//! Image generation from text prompts.
//!
//! Produces the candidate images the publishing pipeline consumes: each
//! generated image is written to the images directory under the naming
//! convention from [`crate::naming`].

mod openai;

pub use openai::OpenAiImageGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::GeneratorConfig;

/// A supported output size and the models that accept it.
#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    pub size: &'static str,
    pub models: &'static [&'static str],
}

pub const RESOLUTIONS: &[Resolution] = &[
    Resolution {
        size: "256x256",
        models: &["dall-e-2"],
    },
    Resolution {
        size: "512x512",
        models: &["dall-e-2"],
    },
    Resolution {
        size: "1024x1024",
        models: &["dall-e-2", "dall-e-3"],
    },
    Resolution {
        size: "1024x1792",
        models: &["dall-e-3"],
    },
    Resolution {
        size: "1792x1024",
        models: &["dall-e-3"],
    },
];

pub const STYLES: &[&str] = &["vivid", "natural"];
pub const QUALITIES: &[&str] = &["standard", "hd"];

/// Model that accepts `style` and `quality`.
pub const STYLED_MODEL: &str = "dall-e-3";

/// Errors that can occur during image generation.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("failed to download generated image: {0}")]
    Download(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not configured: {0}")]
    NotConfigured(String),
}

/// Parameters of one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub model: String,
    pub size: String,
    pub style: String,
    pub quality: String,
}

impl GenerationParams {
    /// Parameters for `prompt` using the configured defaults.
    pub fn from_defaults(prompt: impl Into<String>, config: &GeneratorConfig) -> Self {
        Self {
            prompt: prompt.into(),
            model: config.model.clone(),
            size: config.size.clone(),
            style: config.style.clone(),
            quality: config.quality.clone(),
        }
    }

    /// Whether style and quality are sent to the API.
    pub fn supports_style(&self) -> bool {
        self.model == STYLED_MODEL
    }
}

/// Check the model/size combination, style, quality and prompt.
pub fn validate_params(params: &GenerationParams) -> Result<(), GeneratorError> {
    if params.prompt.trim().is_empty() {
        return Err(GeneratorError::InvalidParams(
            "prompt cannot be empty".to_string(),
        ));
    }

    let size_ok = RESOLUTIONS
        .iter()
        .any(|r| r.size == params.size && r.models.contains(&params.model.as_str()));
    if !size_ok {
        return Err(GeneratorError::InvalidParams(format!(
            "size {} is not available for model {}",
            params.size, params.model
        )));
    }

    if !STYLES.contains(&params.style.as_str()) {
        return Err(GeneratorError::InvalidParams(format!(
            "unknown style {} (expected one of {})",
            params.style,
            STYLES.join(", ")
        )));
    }

    if !QUALITIES.contains(&params.quality.as_str()) {
        return Err(GeneratorError::InvalidParams(format!(
            "unknown quality {} (expected one of {})",
            params.quality,
            QUALITIES.join(", ")
        )));
    }

    Ok(())
}

/// Generates an image and stores it locally.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image and return the path it was saved to.
    async fn generate(&self, params: &GenerationParams) -> Result<PathBuf, GeneratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(model: &str, size: &str) -> GenerationParams {
        GenerationParams {
            prompt: "a lonely robot".to_string(),
            model: model.to_string(),
            size: size.to_string(),
            style: "vivid".to_string(),
            quality: "hd".to_string(),
        }
    }

    #[test]
    fn test_valid_combinations() {
        assert!(validate_params(&params("dall-e-2", "256x256")).is_ok());
        assert!(validate_params(&params("dall-e-2", "1024x1024")).is_ok());
        assert!(validate_params(&params("dall-e-3", "1024x1024")).is_ok());
        assert!(validate_params(&params("dall-e-3", "1792x1024")).is_ok());
    }

    #[test]
    fn test_incompatible_size_rejected() {
        assert!(validate_params(&params("dall-e-3", "256x256")).is_err());
        assert!(validate_params(&params("dall-e-2", "1024x1792")).is_err());
        assert!(validate_params(&params("dall-e-4", "1024x1024")).is_err());
    }

    #[test]
    fn test_style_quality_and_prompt_checked() {
        let mut p = params("dall-e-3", "1024x1024");
        p.style = "baroque".to_string();
        assert!(validate_params(&p).is_err());

        let mut p = params("dall-e-3", "1024x1024");
        p.quality = "ultra".to_string();
        assert!(validate_params(&p).is_err());

        let mut p = params("dall-e-3", "1024x1024");
        p.prompt = "   ".to_string();
        assert!(validate_params(&p).is_err());
    }

    #[test]
    fn test_from_defaults() {
        let p = GenerationParams::from_defaults("neon city", &GeneratorConfig::default());
        assert_eq!(p.model, "dall-e-3");
        assert_eq!(p.size, "1024x1024");
        assert_eq!(p.style, "vivid");
        assert_eq!(p.quality, "hd");
        assert!(p.supports_style());
    }
}
