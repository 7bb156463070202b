//! Upload status
//!
//! The client-facing view of a target result, and the translation from the
//! worker's [`TargetResult`] into it.

use serde::{Deserialize, Serialize};

use crate::domain::image::UploadType;
use crate::domain::target::TargetResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatusValue {
    Pending,
    Running,
    Success,
    Failure,
}

/// Status of one upload of a compose
///
/// `status` is a property of the job that ran the upload, not of the result
/// shape, so translation leaves it unset and the caller fills it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UploadStatusValue>,
    #[serde(flatten)]
    pub options: UploadStatusOptions,
}

impl UploadStatus {
    pub fn new(status: UploadStatusValue, options: UploadStatusOptions) -> Self {
        Self {
            status: Some(status),
            options,
        }
    }

    pub fn with_status(mut self, status: UploadStatusValue) -> Self {
        self.status = Some(status);
        self
    }

    pub fn upload_type(&self) -> UploadType {
        self.options.upload_type()
    }
}

/// Kind-specific part of an upload status, tagged by the upload type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options")]
pub enum UploadStatusOptions {
    #[serde(rename = "aws")]
    Aws(AwsEc2UploadStatus),
    #[serde(rename = "aws.s3")]
    AwsS3(AwsS3UploadStatus),
    #[serde(rename = "gcp")]
    Gcp(GcpUploadStatus),
    #[serde(rename = "azure")]
    Azure(AzureUploadStatus),
    #[serde(rename = "container")]
    Container(ContainerUploadStatus),
    #[serde(rename = "oci.objectstorage")]
    OciObjectStorage(OciUploadStatus),
    #[serde(rename = "pulp.ostree")]
    PulpOstree(PulpOstreeUploadStatus),
}

impl UploadStatusOptions {
    pub fn upload_type(&self) -> UploadType {
        match self {
            UploadStatusOptions::Aws(_) => UploadType::Aws,
            UploadStatusOptions::AwsS3(_) => UploadType::AwsS3,
            UploadStatusOptions::Gcp(_) => UploadType::Gcp,
            UploadStatusOptions::Azure(_) => UploadType::Azure,
            UploadStatusOptions::Container(_) => UploadType::Container,
            UploadStatusOptions::OciObjectStorage(_) => UploadType::OciObjectStorage,
            UploadStatusOptions::PulpOstree(_) => UploadType::PulpOstree,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsEc2UploadStatus {
    pub ami: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsS3UploadStatus {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpUploadStatus {
    pub image_name: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureUploadStatus {
    pub image_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerUploadStatus {
    pub url: String,
    pub digest: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OciUploadStatus {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulpOstreeUploadStatus {
    pub repo_url: String,
}

/// A target result that has no client-facing upload status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown upload target: {0}")]
pub struct UnknownUploadTarget(pub String);

impl TryFrom<&TargetResult> for UploadStatus {
    type Error = UnknownUploadTarget;

    fn try_from(result: &TargetResult) -> Result<Self, Self::Error> {
        let options = match result {
            TargetResult::Aws(o) => UploadStatusOptions::Aws(AwsEc2UploadStatus {
                ami: o.ami.clone(),
                region: o.region.clone(),
            }),
            TargetResult::AwsS3(o) => UploadStatusOptions::AwsS3(AwsS3UploadStatus {
                url: o.url.clone(),
            }),
            TargetResult::Gcp(o) => UploadStatusOptions::Gcp(GcpUploadStatus {
                image_name: o.image_name.clone(),
                project_id: o.project_id.clone(),
            }),
            TargetResult::AzureImage(o) => UploadStatusOptions::Azure(AzureUploadStatus {
                image_name: o.image_name.clone(),
            }),
            TargetResult::Container(o) => UploadStatusOptions::Container(ContainerUploadStatus {
                url: o.url.clone(),
                digest: o.digest.clone(),
            }),
            TargetResult::OciObjectStorage(o) => {
                UploadStatusOptions::OciObjectStorage(OciUploadStatus { url: o.url.clone() })
            }
            TargetResult::PulpOstree(o) => UploadStatusOptions::PulpOstree(PulpOstreeUploadStatus {
                repo_url: o.repo_url.clone(),
            }),
            TargetResult::Koji(_) | TargetResult::WorkerServer | TargetResult::Unknown { .. } => {
                return Err(UnknownUploadTarget(result.name().to_string()));
            }
        };

        Ok(UploadStatus {
            status: None,
            options,
        })
    }
}
