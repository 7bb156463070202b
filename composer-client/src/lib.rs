//! Composer HTTP Client
//!
//! A typed HTTP client for the image composer API: submitting composes,
//! following their status and cloning built images.
//!
//! # Example
//!
//! ```no_run
//! use composer_client::ComposerClient;
//! use composer_core::dto::compose::ComposeRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ComposerClient::new("http://localhost:8080");
//!
//!     let request: ComposeRequest = serde_json::from_str(r#"{
//!         "distribution": "rhel-9",
//!         "image_request": {
//!             "architecture": "x86_64",
//!             "image_type": "aws",
//!             "upload_options": { "region": "us-east-1" }
//!         }
//!     }"#)?;
//!     let compose = client.post_compose(&request).await?;
//!
//!     let status = client.compose_status(compose.reference.id).await?;
//!     println!("Compose {} is {:?}", compose.reference.id, status.status);
//!     Ok(())
//! }
//! ```

mod clones;
mod composes;
pub mod error;

// Re-export commonly used types
pub use error::{ClientError, Result};

use composer_core::dto::BASE_PATH;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header carrying the tenant channel of a request
const TENANT_CHANNEL_HEADER: &str = "X-Tenant-Channel";

/// HTTP client for the compose API
///
/// Requests are scoped to a tenant channel when one is set with
/// [`ComposerClient::with_channel`]; otherwise the server applies no tenant
/// scoping.
#[derive(Debug, Clone)]
pub struct ComposerClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
    channel: Option<String>,
}

impl ComposerClient {
    /// Create a new composer client
    ///
    /// # Example
    /// ```
    /// use composer_client::ComposerClient;
    ///
    /// let client = ComposerClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new composer client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            channel: None,
        }
    }

    /// Scope every request of this client to a tenant channel
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, BASE_PATH, path)
    }

    fn scoped(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.channel {
            Some(channel) => builder.header(TENANT_CHANNEL_HEADER, channel),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// A failed response is turned into a [`ClientError`], keeping the error
    /// object of the API when the body carries one.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Request failed with {}: {}", status, error_text);
            return Err(ClientError::from_response(status.as_u16(), &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
