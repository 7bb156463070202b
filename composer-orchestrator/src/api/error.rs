//! API Error Handling
//!
//! Maps service errors to an HTTP status and a numeric service error code,
//! rendered as an `Error` object of the compose API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use composer_core::dto::error::ErrorResponse;

use crate::service::error::{ComposerError, ErrorKind};

/// API error type
#[derive(Debug)]
pub struct ApiError(pub ComposerError);

impl ApiError {
    /// Numeric service error code, stable across releases
    pub fn code(&self) -> u32 {
        match &self.0 {
            ComposerError::InvalidComposeId(_) => 1,
            ComposerError::BodyDecoding(_) => 2,
            ComposerError::InvalidNumberOfImageBuilds => 3,
            ComposerError::MissingUploadTarget => 4,
            ComposerError::InvalidUploadOptions { .. } => 5,
            ComposerError::InvalidRepository => 6,
            ComposerError::NoGpgKey => 7,
            ComposerError::LocalSaveNotEnabled => 8,
            ComposerError::ComposeNotFound(_) => 10,
            ComposerError::UnsupportedDistribution(_) => 20,
            ComposerError::UnsupportedArchitecture(_) => 21,
            ComposerError::UnsupportedUploadType(_) => 22,
            ComposerError::InvalidJobType { .. } => 23,
            ComposerError::ComposeBadState(_) => 24,
            ComposerError::SeveralUploadTargets { .. } => 25,
            ComposerError::UnsupportedCloneTarget(_) => 26,
            ComposerError::UnknownUploadTarget(_) => 30,
            ComposerError::MalformedChain { .. } => 31,
            ComposerError::MalformedJob { .. } => 32,
            ComposerError::MissingBuildOutput(_) => 33,
            ComposerError::MissingManifest(_) => 34,
            ComposerError::Store(_) => 35,
            ComposerError::MissingJob(_) => 36,
            ComposerError::Enqueue { .. } => 40,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::MalformedInput | ErrorKind::Unsupported => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvariantViolation | ErrorKind::Enqueue => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let reason = if status.is_server_error() {
            tracing::error!("Internal error (COMPOSER-{}): {}", code, self.0);
            "Internal server error".to_string()
        } else {
            tracing::debug!("Request rejected (COMPOSER-{}): {}", code, self.0);
            self.0.to_string()
        };

        (status, Json(ErrorResponse::new(code, reason))).into_response()
    }
}

impl From<ComposerError> for ApiError {
    fn from(err: ComposerError) -> Self {
        ApiError(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
