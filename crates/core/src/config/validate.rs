use super::{types::Config, ConfigError, TunnelProvider};
use crate::generator::{validate_params, GenerationParams};

/// Validate configuration
/// Currently validates:
/// - Publisher credentials are present (enforced by serde, checked for emptiness here)
/// - Exposure port is not 0
/// - Polling cadence is sane (interval > 0, ceiling >= interval)
/// - A static tunnel has a public URL
/// - Generator defaults form a valid model/size/style/quality combination
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.publisher.account_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "publisher.account_id cannot be empty".to_string(),
        ));
    }
    if config.publisher.access_token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "publisher.access_token cannot be empty".to_string(),
        ));
    }

    if config.exposure.port == 0 {
        return Err(ConfigError::ValidationError(
            "exposure.port cannot be 0".to_string(),
        ));
    }

    if config.pipeline.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.poll_interval_secs cannot be 0".to_string(),
        ));
    }
    if config.pipeline.poll_timeout_secs < config.pipeline.poll_interval_secs {
        return Err(ConfigError::ValidationError(
            "pipeline.poll_timeout_secs must be >= pipeline.poll_interval_secs".to_string(),
        ));
    }

    if config.exposure.tunnel.provider == TunnelProvider::Static
        && config
            .exposure
            .tunnel
            .public_url
            .as_deref()
            .map_or(true, |u| u.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "exposure.tunnel.public_url is required for the static tunnel".to_string(),
        ));
    }

    // The prompt is supplied per invocation; validate everything else.
    let defaults = GenerationParams {
        prompt: "validation".to_string(),
        model: config.generator.model.clone(),
        size: config.generator.size.clone(),
        style: config.generator.style.clone(),
        quality: config.generator.quality.clone(),
    };
    validate_params(&defaults)
        .map_err(|e| ConfigError::ValidationError(format!("generator: {}", e)))?;

    Ok(())
}
