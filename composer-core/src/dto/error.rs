//! Error object of the compose API

use serde::{Deserialize, Serialize};

use crate::dto::BASE_PATH;

/// Body of every failed API response
///
/// `id` is the numeric service error code; `code` is the same value in the
/// `COMPOSER-<id>` form clients match on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub id: String,
    pub code: String,
    pub href: String,
    pub reason: String,
}

impl ErrorResponse {
    pub fn new(code: u32, reason: impl Into<String>) -> Self {
        Self {
            kind: "Error".to_string(),
            id: code.to_string(),
            code: format!("COMPOSER-{}", code),
            href: format!("{}/errors/{}", BASE_PATH, code),
            reason: reason.into(),
        }
    }

    /// Numeric service error code, if `id` carries one
    pub fn service_code(&self) -> Option<u32> {
        self.id.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response_shape() {
        let err = ErrorResponse::new(10, "compose not found");

        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({
                "kind": "Error",
                "id": "10",
                "code": "COMPOSER-10",
                "href": "/api/image-builder-composer/v2/errors/10",
                "reason": "compose not found"
            })
        );
        assert_eq!(err.service_code(), Some(10));
    }
}
