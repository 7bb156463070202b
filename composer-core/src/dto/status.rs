//! Compose read models
//!
//! Status, metadata, logs and manifests of a compose as returned to clients.

use serde::{Deserialize, Serialize};

use crate::domain::job::JobError;
use crate::dto::ObjectReference;
use crate::dto::upload::UploadStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeStatusValue {
    Pending,
    Success,
    Failure,
}

/// Status of a single image of a compose
///
/// `Uploading` and `Registering` are part of the API but never produced: an
/// image that is still being uploaded is reported as `Building`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatusValue {
    Pending,
    Building,
    Uploading,
    Registering,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeStatus {
    #[serde(flatten)]
    pub reference: ObjectReference,
    pub status: ComposeStatusValue,
    /// First image of the compose, for clients predating multi-image composes
    pub image_status: ImageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_statuses: Option<Vec<ImageStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub koji_status: Option<KojiStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStatus {
    pub status: ImageStatusValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ComposeStatusError>,
    /// First upload status, kept next to the full list for older clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<UploadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_statuses: Option<Vec<UploadStatus>>,
}

impl ImageStatus {
    /// Build an image status, keeping the first upload in the legacy field.
    /// An empty upload list is reported as absent.
    pub fn new(
        status: ImageStatusValue,
        error: Option<ComposeStatusError>,
        uploads: Vec<UploadStatus>,
    ) -> Self {
        let upload_status = uploads.first().cloned();
        let upload_statuses = if uploads.is_empty() {
            None
        } else {
            Some(uploads)
        };

        Self {
            status,
            error,
            upload_status,
            upload_statuses,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeStatusError {
    pub id: u32,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<JobError> for ComposeStatusError {
    fn from(err: JobError) -> Self {
        Self {
            id: err.id,
            reason: err.reason,
            details: err.details,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KojiStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<u64>,
}

// =============================================================================
// Metadata
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeMetadata {
    #[serde(flatten)]
    pub reference: ObjectReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<PackageMetadata>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ostree_commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    #[serde(rename = "type")]
    pub package_type: String,
    pub name: String,
    pub version: String,
    pub release: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<String>,
    pub arch: String,
    pub sigmd5: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

// =============================================================================
// Logs & Manifests
// =============================================================================

/// Raw job results of a compose
///
/// The content of `image_builds` is not part of the API; it is meant for a
/// human reading the logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeLogs {
    #[serde(flatten)]
    pub reference: ObjectReference,
    pub image_builds: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub koji: Option<KojiLogs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KojiLogs {
    pub init: serde_json::Value,
    pub import: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeManifests {
    #[serde(flatten)]
    pub reference: ObjectReference,
    pub manifests: Vec<serde_json::Value>,
}
