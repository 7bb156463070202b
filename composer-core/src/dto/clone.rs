//! Clone DTOs

use serde::{Deserialize, Serialize};

use crate::dto::ObjectReference;
use crate::dto::upload::UploadStatus;

/// Request to deliver an already built EC2 image to another region and/or
/// more accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsEc2CloneCompose {
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_with_accounts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneComposeResponse {
    /// The referenced id is the job to poll for completion of the clone
    #[serde(flatten)]
    pub reference: ObjectReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneStatus {
    #[serde(flatten)]
    pub reference: ObjectReference,
    #[serde(flatten)]
    pub upload_status: UploadStatus,
}
