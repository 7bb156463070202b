//! Job arguments and results exchanged with the workers
//!
//! Each job kind has an arguments payload (written at submission) and a result
//! payload (written by the worker). The traits tie both to their [`JobKind`] so
//! the orchestrator can read and submit them without stringly-typed dispatch.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::image::RepoConfig;
use crate::domain::job::{JobError, JobKind};
use crate::domain::osbuild::OsBuildOutput;
use crate::domain::target::{Target, TargetResult};

/// Arguments of a job of a fixed kind
pub trait JobArgs: Serialize + DeserializeOwned + Send + Sync {
    const KIND: JobKind;
}

/// Result of a job of a fixed kind
///
/// A job that has not finished yet has no result; readers then see
/// `Default::default()`.
pub trait JobResultPayload: DeserializeOwned + Default + Send {
    const KIND: JobKind;

    fn job_error(&self) -> Option<&JobError>;
}

/// Result fields shared by every job kind
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenericJobResult {
    #[serde(default)]
    pub job_error: Option<JobError>,
}

/// Names of the pipelines of a manifest, split by role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineNames {
    #[serde(default)]
    pub build: Vec<String>,
    #[serde(default)]
    pub payload: Vec<String>,
}

// =============================================================================
// Image Build
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsBuildJob {
    /// Manifest, when it was known at submission time. Otherwise it is the
    /// result of the manifest job this build depends on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<serde_json::Value>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub pipeline_names: PipelineNames,
}

impl JobArgs for OsBuildJob {
    const KIND: JobKind = JobKind::OsBuild;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsBuildJobResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osbuild_output: Option<OsBuildOutput>,
    #[serde(default)]
    pub target_results: Vec<TargetResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_error: Option<JobError>,
}

impl JobResultPayload for OsBuildJobResult {
    const KIND: JobKind = JobKind::OsBuild;

    fn job_error(&self) -> Option<&JobError> {
        self.job_error.as_ref()
    }
}

impl OsBuildJobResult {
    /// True only when osbuild produced output and reported failure in it
    pub fn output_failed(&self) -> bool {
        self.osbuild_output.as_ref().is_some_and(|o| !o.success)
    }
}

// =============================================================================
// Manifest
// =============================================================================

/// Request for the manifest of a single image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestJobById {
    pub distribution: String,
    pub architecture: String,
    pub image_type: String,
    #[serde(default)]
    pub repositories: Vec<RepoConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<serde_json::Value>,
    pub seed: i64,
}

impl JobArgs for ManifestJobById {
    const KIND: JobKind = JobKind::ManifestIdOnly;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestJobByIdResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_error: Option<JobError>,
}

impl JobResultPayload for ManifestJobByIdResult {
    const KIND: JobKind = JobKind::ManifestIdOnly;

    fn job_error(&self) -> Option<&JobError> {
        self.job_error.as_ref()
    }
}

// =============================================================================
// Koji
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KojiInitJob {
    pub server: String,
    pub name: String,
    pub version: String,
    pub release: String,
}

impl JobArgs for KojiInitJob {
    const KIND: JobKind = JobKind::KojiInit;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KojiInitJobResult {
    #[serde(default)]
    pub build_id: u64,
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_error: Option<JobError>,
}

impl JobResultPayload for KojiInitJobResult {
    const KIND: JobKind = JobKind::KojiInit;

    fn job_error(&self) -> Option<&JobError> {
        self.job_error.as_ref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KojiFinalizeJob {
    pub server: String,
    pub name: String,
    pub version: String,
    pub release: String,
    #[serde(default)]
    pub koji_filenames: Vec<String>,
    pub koji_directory: String,
    pub task_id: u64,
    /// Unix timestamp of the compose submission
    pub start_time: u64,
}

impl JobArgs for KojiFinalizeJob {
    const KIND: JobKind = JobKind::KojiFinalize;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KojiFinalizeJobResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_error: Option<JobError>,
}

impl JobResultPayload for KojiFinalizeJobResult {
    const KIND: JobKind = JobKind::KojiFinalize;

    fn job_error(&self) -> Option<&JobError> {
        self.job_error.as_ref()
    }
}

// =============================================================================
// AWS EC2 Copy / Share
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsEc2CopyJob {
    pub ami: String,
    pub source_region: String,
    pub target_region: String,
    pub target_name: String,
}

impl JobArgs for AwsEc2CopyJob {
    const KIND: JobKind = JobKind::AwsEc2Copy;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsEc2CopyJobResult {
    #[serde(default)]
    pub ami: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_error: Option<JobError>,
}

impl JobResultPayload for AwsEc2CopyJobResult {
    const KIND: JobKind = JobKind::AwsEc2Copy;

    fn job_error(&self) -> Option<&JobError> {
        self.job_error.as_ref()
    }
}

/// Share an image with other accounts
///
/// Empty `ami` and `region` mean the values come from the output of the job
/// this one depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsEc2ShareJob {
    pub ami: String,
    pub region: String,
    pub share_with_accounts: Vec<String>,
}

impl JobArgs for AwsEc2ShareJob {
    const KIND: JobKind = JobKind::AwsEc2Share;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsEc2ShareJobResult {
    #[serde(default)]
    pub ami: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_error: Option<JobError>,
}

impl JobResultPayload for AwsEc2ShareJobResult {
    const KIND: JobKind = JobKind::AwsEc2Share;

    fn job_error(&self) -> Option<&JobError> {
        self.job_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_failed_requires_output() {
        let mut result = OsBuildJobResult::default();
        assert!(!result.output_failed());

        result.osbuild_output = Some(OsBuildOutput {
            success: false,
            ..Default::default()
        });
        assert!(result.output_failed());
    }

    #[test]
    fn test_generic_result_reads_job_error_of_any_kind() {
        let value = json!({
            "ami": "ami-1",
            "region": "eu-west-1",
            "job_error": { "id": 10, "reason": "copy failed" }
        });

        let generic: GenericJobResult = serde_json::from_value(value).unwrap();
        assert_eq!(generic.job_error, Some(JobError::new(10, "copy failed")));
    }

    #[test]
    fn test_missing_result_fields_default() {
        let result: KojiInitJobResult = serde_json::from_value(json!({})).unwrap();
        assert_eq!(result.build_id, 0);
        assert!(result.job_error().is_none());
    }
}
