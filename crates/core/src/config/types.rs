use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::orchestrator::PipelineConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub exposure: ExposureConfig,
    #[serde(default)]
    pub caption: CaptionConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

/// Instagram Graph API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublisherConfig {
    /// Graph API base URL, including the version segment and a trailing slash
    #[serde(default = "default_endpoint_base")]
    pub endpoint_base: String,
    /// Instagram business account id
    pub account_id: String,
    /// Long-lived access token
    pub access_token: String,
    /// Media type sent on container creation (default: "IMAGE")
    #[serde(default = "default_media_type")]
    pub media_type: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_endpoint_base() -> String {
    "https://graph.facebook.com/v19.0/".to_string()
}

fn default_media_type() -> String {
    "IMAGE".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Local file server + tunnel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExposureConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tunnel: TunnelConfig,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tunnel: TunnelConfig::default(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8000
}

/// Available tunnel providers
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TunnelProvider {
    /// Spawn the ngrok agent and read the public URL from its local API
    Ngrok,
    /// Use a fixed, already reachable public URL (reverse proxy, ingress)
    Static,
}

/// Tunnel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TunnelConfig {
    #[serde(default = "default_tunnel_provider")]
    pub provider: TunnelProvider,
    /// Public base URL (required when provider = "static")
    #[serde(default)]
    pub public_url: Option<String>,
    /// ngrok executable
    #[serde(default = "default_ngrok_bin")]
    pub ngrok_bin: String,
    /// ngrok agent inspection API
    #[serde(default = "default_ngrok_api_url")]
    pub ngrok_api_url: String,
    /// How long to wait for the tunnel to come up (default: 15)
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            provider: default_tunnel_provider(),
            public_url: None,
            ngrok_bin: default_ngrok_bin(),
            ngrok_api_url: default_ngrok_api_url(),
            startup_timeout_secs: default_startup_timeout(),
        }
    }
}

fn default_tunnel_provider() -> TunnelProvider {
    TunnelProvider::Ngrok
}

fn default_ngrok_bin() -> String {
    "ngrok".to_string()
}

fn default_ngrok_api_url() -> String {
    "http://127.0.0.1:4040".to_string()
}

fn default_startup_timeout() -> u64 {
    15
}

/// Available completion providers for captions
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4",
            LlmProvider::Anthropic => "claude-3-haiku-20240307",
            LlmProvider::Ollama => "llama3",
        }
    }
}

/// Caption generation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptionConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: LlmProvider,
    /// API key (falls back to OPENAI_API_KEY / ANTHROPIC_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    /// Caption used whenever generation fails
    #[serde(default = "default_fallback_caption")]
    pub fallback: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            model: None,
            api_base: None,
            fallback: default_fallback_caption(),
        }
    }
}

impl CaptionConfig {
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

fn default_llm_provider() -> LlmProvider {
    LlmProvider::OpenAi
}

pub fn default_fallback_caption() -> String {
    "AI-generated artwork #DigitalArt #AICreativity".to_string()
}

/// Image generation defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// API key (falls back to OPENAI_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default = "default_image_size")]
    pub size: String,
    #[serde(default = "default_image_style")]
    pub style: String,
    #[serde(default = "default_image_quality")]
    pub quality: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            model: default_image_model(),
            size: default_image_size(),
            style: default_image_style(),
            quality: default_image_quality(),
        }
    }
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_image_style() -> String {
    "vivid".to_string()
}

fn default_image_quality() -> String {
    "hd".to_string()
}

/// Publish journal configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JournalConfig {
    /// SQLite database path. When absent only the processed/ directory
    /// records completion.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub publisher: SanitizedPublisherConfig,
    pub pipeline: PipelineConfig,
    pub exposure: ExposureConfig,
    pub caption: SanitizedCaptionConfig,
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPublisherConfig {
    pub endpoint_base: String,
    pub account_id: String,
    pub access_token_configured: bool,
    pub media_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCaptionConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            publisher: SanitizedPublisherConfig {
                endpoint_base: config.publisher.endpoint_base.clone(),
                account_id: config.publisher.account_id.clone(),
                access_token_configured: !config.publisher.access_token.is_empty(),
                media_type: config.publisher.media_type.clone(),
            },
            pipeline: config.pipeline.clone(),
            exposure: config.exposure.clone(),
            caption: SanitizedCaptionConfig {
                provider: config.caption.provider,
                model: config.caption.model_name().to_string(),
                api_key_configured: config
                    .caption
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            journal: config.journal.clone(),
        }
    }
}
