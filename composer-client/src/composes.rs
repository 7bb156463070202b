//! Compose endpoints

use composer_core::dto::compose::{ComposeId, ComposeRequest};
use composer_core::dto::status::{ComposeLogs, ComposeManifests, ComposeMetadata, ComposeStatus};
use uuid::Uuid;

use crate::ComposerClient;
use crate::error::Result;

impl ComposerClient {
    /// Submit a compose
    ///
    /// # Returns
    /// The id to poll the compose with
    pub async fn post_compose(&self, req: &ComposeRequest) -> Result<ComposeId> {
        let url = self.url("/compose");
        let response = self.scoped(self.client.post(&url)).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Get the status of a compose and of each of its images
    pub async fn compose_status(&self, id: Uuid) -> Result<ComposeStatus> {
        self.get(&format!("/composes/{}", id)).await
    }

    /// Get the packages and ostree commit of a successful compose
    pub async fn compose_metadata(&self, id: Uuid) -> Result<ComposeMetadata> {
        self.get(&format!("/composes/{}/metadata", id)).await
    }

    /// Get the raw job results of a compose
    pub async fn compose_logs(&self, id: Uuid) -> Result<ComposeLogs> {
        self.get(&format!("/composes/{}/logs", id)).await
    }

    /// Get the manifest of each image of a compose
    pub async fn compose_manifests(&self, id: Uuid) -> Result<ComposeManifests> {
        self.get(&format!("/composes/{}/manifests", id)).await
    }

    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self.scoped(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }
}
