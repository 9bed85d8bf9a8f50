//! Filename convention for generated images.
//!
//! Generated images are stored as `{marker}_{prompt tokens}_{style}_{unix ts}.{ext}`,
//! e.g. `dalle_a_lonely_robot_vivid_1700000000.png`. The prompt and style are
//! recovered from the name when captioning, and the timestamp orders candidates.

use std::path::Path;

use thiserror::Error;

/// Default marker prefixed to every generated filename.
pub const DEFAULT_MARKER: &str = "dalle";

/// Maximum number of prompt characters kept in a filename.
pub const MAX_PROMPT_CHARS: usize = 50;

/// Image extensions accepted as publish candidates.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("filename has {found} underscore-separated tokens, need at least 4: {filename}")]
    TooFewTokens { filename: String, found: usize },

    #[error("filename does not start with marker '{marker}': {filename}")]
    WrongMarker { filename: String, marker: String },

    #[error("last token is not a unix timestamp: {token}")]
    InvalidTimestamp { token: String },
}

/// Metadata recovered from a generated image's filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateName {
    pub filename: String,
    pub prompt: String,
    pub style: String,
    pub timestamp: u64,
}

impl CandidateName {
    /// Parse a filename (or path) following the naming convention.
    pub fn parse(filename: &str, marker: &str) -> Result<Self, NamingError> {
        let base = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename);
        let stem = Path::new(base)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(base);

        let tokens: Vec<&str> = stem.split('_').collect();
        if tokens.len() < 4 {
            return Err(NamingError::TooFewTokens {
                filename: base.to_string(),
                found: tokens.len(),
            });
        }

        if tokens[0] != marker {
            return Err(NamingError::WrongMarker {
                filename: base.to_string(),
                marker: marker.to_string(),
            });
        }

        let last = tokens[tokens.len() - 1];
        let timestamp = last
            .parse::<u64>()
            .map_err(|_| NamingError::InvalidTimestamp {
                token: last.to_string(),
            })?;

        let style = tokens[tokens.len() - 2].to_string();
        let prompt = tokens[1..tokens.len() - 2].join(" ");

        Ok(Self {
            filename: base.to_string(),
            prompt,
            style,
            timestamp,
        })
    }
}

/// Whether the filename carries the marker prefix and an accepted image extension.
pub fn is_candidate_filename(filename: &str, marker: &str) -> bool {
    let has_marker = filename
        .strip_prefix(marker)
        .is_some_and(|rest| rest.starts_with('_'));
    if !has_marker {
        return false;
    }

    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Keep alphanumerics, spaces and underscores, trim trailing whitespace and
/// turn spaces into underscores.
pub fn sanitize_component(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    kept.trim_end().replace(' ', "_")
}

/// Build the filename for a freshly generated image.
pub fn generated_filename(
    marker: &str,
    prompt: &str,
    style: &str,
    timestamp: u64,
    extension: &str,
) -> String {
    let truncated: String = prompt.chars().take(MAX_PROMPT_CHARS).collect();
    format!(
        "{}_{}_{}_{}.{}",
        marker,
        sanitize_component(&truncated),
        sanitize_component(style),
        timestamp,
        extension
    )
}
