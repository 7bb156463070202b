//! Clone endpoints

use composer_core::dto::clone::{AwsEc2CloneCompose, CloneComposeResponse, CloneStatus};
use uuid::Uuid;

use crate::ComposerClient;
use crate::error::Result;

impl ComposerClient {
    /// Clone the EC2 image of a compose to another region and/or accounts
    ///
    /// # Returns
    /// The id to poll with [`ComposerClient::clone_status`]
    ///
    /// # Example
    /// ```no_run
    /// # use composer_client::ComposerClient;
    /// # use composer_core::dto::clone::AwsEc2CloneCompose;
    /// # use uuid::Uuid;
    /// # async fn example(compose_id: Uuid) -> anyhow::Result<()> {
    /// let client = ComposerClient::new("http://localhost:8080");
    /// let clone = client.clone_compose(compose_id, &AwsEc2CloneCompose {
    ///     region: "eu-west-1".to_string(),
    ///     share_with_accounts: Some(vec!["123456789012".to_string()]),
    /// }).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn clone_compose(
        &self,
        compose_id: Uuid,
        req: &AwsEc2CloneCompose,
    ) -> Result<CloneComposeResponse> {
        let url = self.url(&format!("/composes/{}/clone", compose_id));
        let response = self.scoped(self.client.post(&url)).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Get the status of a clone
    pub async fn clone_status(&self, clone_id: Uuid) -> Result<CloneStatus> {
        self.get(&format!("/clones/{}", clone_id)).await
    }
}
