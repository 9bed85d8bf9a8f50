//! Error types for the publisher module.

use thiserror::Error;

/// Errors returned by the remote publishing API.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The API answered with a non-success HTTP status.
    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// Could not connect to the API.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other transport failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body could not be decoded or lacked a required field.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl PublishError {
    /// Whether the error came from the remote side answering with an error status.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        // Strip the URL: it carries the access token as a query parameter.
        let e = e.without_url();
        if e.is_timeout() {
            PublishError::Timeout
        } else if e.is_connect() {
            PublishError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            PublishError::InvalidResponse(e.to_string())
        } else {
            PublishError::Http(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PublishError::Api {
            status: 400,
            message: "Invalid parameter".to_string(),
        };
        assert_eq!(err.to_string(), "API error: HTTP 400: Invalid parameter");
        assert!(err.is_api_error());
        assert!(!PublishError::Timeout.is_api_error());
    }
}
