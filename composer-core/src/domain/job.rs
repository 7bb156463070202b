//! Job domain types
//!
//! A job is owned by the external job store. The orchestrator only reads the
//! fields below and, when cloning or composing, submits new jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a job, as declared when it was enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// Single image build
    #[serde(rename = "osbuild")]
    OsBuild,
    /// Manifest resolution, result is the manifest only
    #[serde(rename = "manifest-id-only")]
    ManifestIdOnly,
    #[serde(rename = "koji-init")]
    KojiInit,
    #[serde(rename = "koji-finalize")]
    KojiFinalize,
    /// Copy of an EC2 image into another region
    #[serde(rename = "aws-ec2-copy")]
    AwsEc2Copy,
    /// Sharing of an EC2 image with other accounts
    #[serde(rename = "aws-ec2-share")]
    AwsEc2Share,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::OsBuild => "osbuild",
            JobKind::ManifestIdOnly => "manifest-id-only",
            JobKind::KojiInit => "koji-init",
            JobKind::KojiFinalize => "koji-finalize",
            JobKind::AwsEc2Copy => "aws-ec2-copy",
            JobKind::AwsEc2Share => "aws-ec2-share",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a job kind string is not part of the closed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job kind: {0}")]
pub struct UnknownJobKind(pub String);

impl FromStr for JobKind {
    type Err = UnknownJobKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "osbuild" => Ok(JobKind::OsBuild),
            "manifest-id-only" => Ok(JobKind::ManifestIdOnly),
            "koji-init" => Ok(JobKind::KojiInit),
            "koji-finalize" => Ok(JobKind::KojiFinalize),
            "aws-ec2-copy" => Ok(JobKind::AwsEc2Copy),
            "aws-ec2-share" => Ok(JobKind::AwsEc2Share),
            other => Err(UnknownJobKind(other.to_string())),
        }
    }
}

/// Generic execution status of a job
///
/// Timestamps are unset until the worker reaches the matching stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub queued: Option<DateTime<Utc>>,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub canceled: bool,
}

impl JobStatus {
    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }
}

/// Structured error recorded by a worker for a failed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub id: u32,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl JobError {
    pub fn new(id: u32, reason: impl Into<String>) -> Self {
        Self {
            id,
            reason: reason.into(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_string_matches_serde_name() {
        for kind in [
            JobKind::OsBuild,
            JobKind::ManifestIdOnly,
            JobKind::KojiInit,
            JobKind::KojiFinalize,
            JobKind::AwsEc2Copy,
            JobKind::AwsEc2Share,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.to_string()));
            assert_eq!(kind.as_str().parse::<JobKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_job_kind() {
        let err = "depsolve".parse::<JobKind>().unwrap_err();
        assert_eq!(err, UnknownJobKind("depsolve".to_string()));
    }
}
