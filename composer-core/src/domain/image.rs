//! Image types, architectures and repositories
//!
//! The static part of the catalog the orchestrator needs to route a request:
//! which internal image type an API image type maps to, where it is delivered
//! by default and which pipelines carry its payload. Everything else about an
//! image type is resolved by the manifest job.

use serde::{Deserialize, Serialize};

use crate::domain::worker::PipelineNames;

/// Architectures a compose may target
pub const ARCHITECTURES: &[&str] = &["x86_64", "aarch64", "ppc64le", "s390x"];

/// Image type as exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageType {
    Aws,
    AwsRhui,
    AwsHaRhui,
    AwsSapRhui,
    Gcp,
    GcpRhui,
    Azure,
    AzureRhui,
    AzureEap7Rhui,
    AzureSapRhui,
    GuestImage,
    Vsphere,
    VsphereOva,
    ImageInstaller,
    EdgeCommit,
    EdgeContainer,
    EdgeInstaller,
    IotCommit,
    IotContainer,
    IotInstaller,
    IotRawImage,
    LiveInstaller,
    Oci,
    Wsl,
}

/// Delivery kind of an upload, as exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadType {
    #[serde(rename = "aws")]
    Aws,
    #[serde(rename = "aws.s3")]
    AwsS3,
    #[serde(rename = "gcp")]
    Gcp,
    #[serde(rename = "azure")]
    Azure,
    #[serde(rename = "container")]
    Container,
    #[serde(rename = "oci.objectstorage")]
    OciObjectStorage,
    #[serde(rename = "pulp.ostree")]
    PulpOstree,
}

impl ImageType {
    /// Name of the image type in the distribution catalog
    pub fn internal_name(&self) -> &'static str {
        match self {
            ImageType::Aws => "ami",
            ImageType::AwsRhui => "ec2",
            ImageType::AwsHaRhui => "ec2-ha",
            ImageType::AwsSapRhui => "ec2-sap",
            ImageType::Gcp => "gce",
            ImageType::GcpRhui => "gce-rhui",
            ImageType::Azure => "vhd",
            ImageType::AzureRhui => "azure-rhui",
            ImageType::AzureEap7Rhui => "azure-eap7-rhui",
            ImageType::AzureSapRhui => "azure-sap-rhui",
            ImageType::GuestImage => "qcow2",
            ImageType::Vsphere => "vmdk",
            ImageType::VsphereOva => "ova",
            ImageType::ImageInstaller => "image-installer",
            ImageType::EdgeCommit => "rhel-edge-commit",
            ImageType::EdgeContainer => "rhel-edge-container",
            ImageType::EdgeInstaller => "rhel-edge-installer",
            ImageType::IotCommit => "iot-commit",
            ImageType::IotContainer => "iot-container",
            ImageType::IotInstaller => "iot-installer",
            ImageType::IotRawImage => "iot-raw-image",
            ImageType::LiveInstaller => "live-installer",
            ImageType::Oci => "oci",
            ImageType::Wsl => "wsl",
        }
    }

    /// Where images of this type are uploaded when the request names no other
    pub fn default_upload_type(&self) -> UploadType {
        match self {
            ImageType::Aws | ImageType::AwsRhui | ImageType::AwsHaRhui | ImageType::AwsSapRhui => {
                UploadType::Aws
            }
            ImageType::Gcp | ImageType::GcpRhui => UploadType::Gcp,
            ImageType::Azure
            | ImageType::AzureRhui
            | ImageType::AzureEap7Rhui
            | ImageType::AzureSapRhui => UploadType::Azure,
            ImageType::EdgeContainer | ImageType::IotContainer => UploadType::Container,
            ImageType::Oci => UploadType::OciObjectStorage,
            ImageType::GuestImage
            | ImageType::Vsphere
            | ImageType::VsphereOva
            | ImageType::ImageInstaller
            | ImageType::EdgeCommit
            | ImageType::EdgeInstaller
            | ImageType::IotCommit
            | ImageType::IotInstaller
            | ImageType::IotRawImage
            | ImageType::LiveInstaller
            | ImageType::Wsl => UploadType::AwsS3,
        }
    }

    /// File name of the exported image
    pub fn filename(&self) -> &'static str {
        match self {
            ImageType::Aws | ImageType::AwsRhui | ImageType::AwsHaRhui | ImageType::AwsSapRhui => {
                "image.raw"
            }
            ImageType::Gcp | ImageType::GcpRhui => "image.tar.gz",
            ImageType::Azure
            | ImageType::AzureRhui
            | ImageType::AzureEap7Rhui
            | ImageType::AzureSapRhui => "disk.vhd",
            ImageType::GuestImage | ImageType::Oci => "disk.qcow2",
            ImageType::Vsphere => "disk.vmdk",
            ImageType::VsphereOva => "image.ova",
            ImageType::ImageInstaller
            | ImageType::EdgeInstaller
            | ImageType::IotInstaller
            | ImageType::LiveInstaller => "installer.iso",
            ImageType::EdgeCommit | ImageType::IotCommit => "commit.tar",
            ImageType::EdgeContainer | ImageType::IotContainer => "container.tar",
            ImageType::IotRawImage => "image.raw.xz",
            ImageType::Wsl => "disk.tar.gz",
        }
    }

    /// Name of the pipeline whose output is exported
    pub fn export_name(&self) -> &'static str {
        match self {
            ImageType::Aws | ImageType::AwsRhui | ImageType::AwsHaRhui | ImageType::AwsSapRhui => {
                "image"
            }
            ImageType::Gcp | ImageType::GcpRhui | ImageType::VsphereOva | ImageType::Wsl => {
                "archive"
            }
            ImageType::Azure
            | ImageType::AzureRhui
            | ImageType::AzureEap7Rhui
            | ImageType::AzureSapRhui => "vpc",
            ImageType::GuestImage | ImageType::Oci => "qcow2",
            ImageType::Vsphere => "vmdk",
            ImageType::ImageInstaller
            | ImageType::EdgeInstaller
            | ImageType::IotInstaller
            | ImageType::LiveInstaller => "bootiso",
            ImageType::EdgeCommit | ImageType::IotCommit => "commit-archive",
            ImageType::EdgeContainer | ImageType::IotContainer => "container",
            ImageType::IotRawImage => "xz",
        }
    }

    /// Package sets installed into the image itself
    pub fn payload_package_sets(&self) -> Vec<String> {
        match self {
            ImageType::ImageInstaller
            | ImageType::EdgeInstaller
            | ImageType::IotInstaller
            | ImageType::LiveInstaller => vec!["os".to_string(), "installer".to_string()],
            _ => vec!["os".to_string()],
        }
    }

    /// Pipelines of the manifest: the buildroot, then the payload up to the
    /// exported pipeline
    pub fn pipeline_names(&self) -> PipelineNames {
        PipelineNames {
            build: vec!["build".to_string()],
            payload: vec!["os".to_string(), self.export_name().to_string()],
        }
    }
}

/// Package repository as handed to the manifest job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpg_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_gpg: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_repo_gpg: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_ssl: Option<bool>,
    #[serde(default)]
    pub rhsm: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_sets: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_type_api_names() {
        let it: ImageType = serde_json::from_str("\"aws-ha-rhui\"").unwrap();
        assert_eq!(it, ImageType::AwsHaRhui);
        assert_eq!(it.internal_name(), "ec2-ha");

        let it: ImageType = serde_json::from_str("\"guest-image\"").unwrap();
        assert_eq!(it.internal_name(), "qcow2");
        assert_eq!(it.default_upload_type(), UploadType::AwsS3);
    }

    #[test]
    fn test_upload_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&UploadType::OciObjectStorage).unwrap(),
            "\"oci.objectstorage\""
        );
        assert_eq!(serde_json::to_string(&UploadType::AwsS3).unwrap(), "\"aws.s3\"");
    }

    #[test]
    fn test_payload_pipelines_end_with_export() {
        let names = ImageType::EdgeCommit.pipeline_names();
        assert_eq!(names.build, vec!["build"]);
        assert_eq!(names.payload.last().map(String::as_str), Some("commit-archive"));
    }
}
