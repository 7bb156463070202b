//! Upload targets and their results
//!
//! A [`Target`] is declared when a build job is submitted; the worker that runs
//! the build reports one [`TargetResult`] per target it executed. Both are
//! closed tagged unions keyed on the target name.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Export produced by the build that a target delivers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsbuildArtifact {
    pub export_filename: String,
    pub export_name: String,
}

/// Delivery destination declared at submission time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub uuid: Uuid,
    pub image_name: String,
    pub artifact: OsbuildArtifact,
    pub options: TargetOptions,
}

impl Target {
    pub fn new(
        image_name: impl Into<String>,
        artifact: OsbuildArtifact,
        options: TargetOptions,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            image_name: image_name.into(),
            artifact,
            options,
        }
    }

    pub fn name(&self) -> TargetName {
        self.options.name()
    }
}

/// Closed set of target names understood by the workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetName {
    #[serde(rename = "org.osbuild.aws")]
    Aws,
    #[serde(rename = "org.osbuild.aws.s3")]
    AwsS3,
    #[serde(rename = "org.osbuild.gcp")]
    Gcp,
    #[serde(rename = "org.osbuild.azure.image")]
    AzureImage,
    #[serde(rename = "org.osbuild.container")]
    Container,
    #[serde(rename = "org.osbuild.oci.objectstorage")]
    OciObjectStorage,
    #[serde(rename = "org.osbuild.pulp.ostree")]
    PulpOstree,
    #[serde(rename = "org.osbuild.koji")]
    Koji,
    #[serde(rename = "org.osbuild.worker.server")]
    WorkerServer,
}

impl TargetName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetName::Aws => "org.osbuild.aws",
            TargetName::AwsS3 => "org.osbuild.aws.s3",
            TargetName::Gcp => "org.osbuild.gcp",
            TargetName::AzureImage => "org.osbuild.azure.image",
            TargetName::Container => "org.osbuild.container",
            TargetName::OciObjectStorage => "org.osbuild.oci.objectstorage",
            TargetName::PulpOstree => "org.osbuild.pulp.ostree",
            TargetName::Koji => "org.osbuild.koji",
            TargetName::WorkerServer => "org.osbuild.worker.server",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [
            TargetName::Aws,
            TargetName::AwsS3,
            TargetName::Gcp,
            TargetName::AzureImage,
            TargetName::Container,
            TargetName::OciObjectStorage,
            TargetName::PulpOstree,
            TargetName::Koji,
            TargetName::WorkerServer,
        ]
        .into_iter()
        .find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for TargetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Target Options
// =============================================================================

/// Kind-specific options of a declared target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum TargetOptions {
    #[serde(rename = "org.osbuild.aws")]
    Aws(AwsTargetOptions),
    #[serde(rename = "org.osbuild.aws.s3")]
    AwsS3(AwsS3TargetOptions),
    #[serde(rename = "org.osbuild.gcp")]
    Gcp(GcpTargetOptions),
    #[serde(rename = "org.osbuild.azure.image")]
    AzureImage(AzureImageTargetOptions),
    #[serde(rename = "org.osbuild.container")]
    Container(ContainerTargetOptions),
    #[serde(rename = "org.osbuild.oci.objectstorage")]
    OciObjectStorage(OciObjectStorageTargetOptions),
    #[serde(rename = "org.osbuild.pulp.ostree")]
    PulpOstree(PulpOstreeTargetOptions),
    #[serde(rename = "org.osbuild.koji")]
    Koji(KojiTargetOptions),
    #[serde(rename = "org.osbuild.worker.server")]
    WorkerServer(WorkerServerTargetOptions),
}

impl TargetOptions {
    pub fn name(&self) -> TargetName {
        match self {
            TargetOptions::Aws(_) => TargetName::Aws,
            TargetOptions::AwsS3(_) => TargetName::AwsS3,
            TargetOptions::Gcp(_) => TargetName::Gcp,
            TargetOptions::AzureImage(_) => TargetName::AzureImage,
            TargetOptions::Container(_) => TargetName::Container,
            TargetOptions::OciObjectStorage(_) => TargetName::OciObjectStorage,
            TargetOptions::PulpOstree(_) => TargetName::PulpOstree,
            TargetOptions::Koji(_) => TargetName::Koji,
            TargetOptions::WorkerServer(_) => TargetName::WorkerServer,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsTargetOptions {
    pub region: String,
    pub key: String,
    #[serde(default)]
    pub share_with_accounts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsS3TargetOptions {
    pub region: String,
    pub key: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpTargetOptions {
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub object: String,
    #[serde(default)]
    pub share_with_accounts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureImageTargetOptions {
    pub tenant_id: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerTargetOptions {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_verify: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OciObjectStorageTargetOptions {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulpOstreeTargetOptions {
    pub server_address: String,
    pub repository: String,
    #[serde(default)]
    pub basepath: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KojiTargetOptions {
    pub server: String,
    pub upload_directory: String,
}

/// Keep the artifact on the worker server instead of uploading it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerServerTargetOptions {}

// =============================================================================
// Target Results
// =============================================================================

/// Outcome of a target reported by the worker
///
/// Results with a name outside the known set are kept as [`TargetResult::Unknown`]
/// so a record written by a newer worker can still be read; translating such a
/// result into an upload status fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTargetResult", into = "RawTargetResult")]
pub enum TargetResult {
    Aws(AwsTargetResultOptions),
    AwsS3(AwsS3TargetResultOptions),
    Gcp(GcpTargetResultOptions),
    AzureImage(AzureImageTargetResultOptions),
    Container(ContainerTargetResultOptions),
    OciObjectStorage(OciObjectStorageTargetResultOptions),
    PulpOstree(PulpOstreeTargetResultOptions),
    Koji(KojiTargetResultOptions),
    WorkerServer,
    Unknown {
        name: String,
        options: serde_json::Value,
    },
}

impl TargetResult {
    /// Name of the result, `None` for a result outside the known set
    pub fn target_name(&self) -> Option<TargetName> {
        match self {
            TargetResult::Aws(_) => Some(TargetName::Aws),
            TargetResult::AwsS3(_) => Some(TargetName::AwsS3),
            TargetResult::Gcp(_) => Some(TargetName::Gcp),
            TargetResult::AzureImage(_) => Some(TargetName::AzureImage),
            TargetResult::Container(_) => Some(TargetName::Container),
            TargetResult::OciObjectStorage(_) => Some(TargetName::OciObjectStorage),
            TargetResult::PulpOstree(_) => Some(TargetName::PulpOstree),
            TargetResult::Koji(_) => Some(TargetName::Koji),
            TargetResult::WorkerServer => Some(TargetName::WorkerServer),
            TargetResult::Unknown { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TargetResult::Unknown { name, .. } => name.as_str(),
            known => known.target_name().map(|n| n.as_str()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsTargetResultOptions {
    pub ami: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsS3TargetResultOptions {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpTargetResultOptions {
    pub image_name: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureImageTargetResultOptions {
    pub image_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerTargetResultOptions {
    pub url: String,
    pub digest: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OciObjectStorageTargetResultOptions {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulpOstreeTargetResultOptions {
    pub repo_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KojiTargetResultOptions {
    pub image_md5: String,
    pub image_size: u64,
}

/// Wire shape of a target result: `{"name": ..., "options": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTargetResult {
    name: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    options: serde_json::Value,
}

impl TryFrom<RawTargetResult> for TargetResult {
    type Error = serde_json::Error;

    fn try_from(raw: RawTargetResult) -> Result<Self, Self::Error> {
        let Some(name) = TargetName::from_name(&raw.name) else {
            return Ok(TargetResult::Unknown {
                name: raw.name,
                options: raw.options,
            });
        };

        let options = raw.options;
        let result = match name {
            TargetName::Aws => TargetResult::Aws(serde_json::from_value(options)?),
            TargetName::AwsS3 => TargetResult::AwsS3(serde_json::from_value(options)?),
            TargetName::Gcp => TargetResult::Gcp(serde_json::from_value(options)?),
            TargetName::AzureImage => TargetResult::AzureImage(serde_json::from_value(options)?),
            TargetName::Container => TargetResult::Container(serde_json::from_value(options)?),
            TargetName::OciObjectStorage => {
                TargetResult::OciObjectStorage(serde_json::from_value(options)?)
            }
            TargetName::PulpOstree => TargetResult::PulpOstree(serde_json::from_value(options)?),
            TargetName::Koji => TargetResult::Koji(serde_json::from_value(options)?),
            TargetName::WorkerServer => TargetResult::WorkerServer,
        };

        Ok(result)
    }
}

impl From<TargetResult> for RawTargetResult {
    fn from(result: TargetResult) -> Self {
        let name = result.name().to_string();
        let options = match result {
            TargetResult::Aws(o) => serde_json::to_value(o),
            TargetResult::AwsS3(o) => serde_json::to_value(o),
            TargetResult::Gcp(o) => serde_json::to_value(o),
            TargetResult::AzureImage(o) => serde_json::to_value(o),
            TargetResult::Container(o) => serde_json::to_value(o),
            TargetResult::OciObjectStorage(o) => serde_json::to_value(o),
            TargetResult::PulpOstree(o) => serde_json::to_value(o),
            TargetResult::Koji(o) => serde_json::to_value(o),
            TargetResult::WorkerServer => Ok(serde_json::Value::Null),
            TargetResult::Unknown { options, .. } => Ok(options),
        };

        RawTargetResult {
            name,
            options: options.unwrap_or_default(),
        }
    }
}
