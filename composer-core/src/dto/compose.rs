//! Compose request DTOs

use serde::{Deserialize, Serialize};

use crate::domain::image::ImageType;
use crate::dto::ObjectReference;

/// Request to build one or more images
///
/// Exactly one of `image_request` and `image_requests` must be set; the
/// single form is kept for older clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeRequest {
    pub distribution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_request: Option<ImageRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_requests: Option<Vec<ImageRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub koji: Option<Koji>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Customizations>,
}

/// Customizations of the image content
///
/// Passed through to the manifest job; only the payload repositories are
/// interpreted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customizations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payload_repositories: Vec<Repository>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub architecture: String,
    pub image_type: ImageType,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    /// Options of the upload; the expected shape depends on the image type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_options: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirrorlist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpgkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_gpg: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_repo_gpg: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhsm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_sets: Option<Vec<String>>,
}

/// Koji build the compose is imported into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Koji {
    pub server: String,
    pub task_id: u64,
    pub name: String,
    pub version: String,
    pub release: String,
}

// =============================================================================
// Upload Options
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsEc2UploadOptions {
    pub region: String,
    #[serde(default)]
    pub share_with_accounts: Vec<String>,
    #[serde(default)]
    pub snapshot_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsS3UploadOptions {
    pub region: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GcpUploadOptions {
    pub region: String,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub share_with_accounts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AzureUploadOptions {
    pub tenant_id: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    #[serde(default)]
    pub image_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerUploadOptions {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Upload options asking the worker server to keep the artifact
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalUploadOptions {
    #[serde(default)]
    pub local_save: bool,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeId {
    #[serde(flatten)]
    pub reference: ObjectReference,
}
