//! Error types for the composer client

use composer_core::dto::error::ErrorResponse;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the composer client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error object
    #[error("API error (status {status}, {}): {}", .error.code, .error.reason)]
    Service {
        /// HTTP status code
        status: u16,
        error: ErrorResponse,
    },

    /// API returned an error status without an error object
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Builds the error of a failed response from its status and body
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(error) if error.kind == "Error" => Self::Service { status, error },
            _ => Self::ApiError {
                status,
                message: body.to_string(),
            },
        }
    }

    /// HTTP status of a failed response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } | Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Numeric service error code reported by the API
    pub fn service_code(&self) -> Option<u32> {
        match self {
            Self::Service { error, .. } => error.service_code(),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s >= 500)
    }
}
