//! osbuild output
//!
//! Structured output of an osbuild run as reported by the worker: a log and a
//! per-pipeline map of stage metadata. Only the stage kinds the orchestrator
//! exposes are decoded; everything else stays opaque.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const RPM_STAGE: &str = "org.osbuild.rpm";
pub const OSTREE_COMMIT_STAGE: &str = "org.osbuild.ostree.commit";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsBuildOutput {
    #[serde(default)]
    pub success: bool,
    /// Per-pipeline log, opaque to the orchestrator
    #[serde(default)]
    pub log: BTreeMap<String, serde_json::Value>,
    /// Pipeline name → stage type → stage metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

/// Decoded metadata of a single stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageMetadata {
    Rpm(RpmStageMetadata),
    OstreeCommit(OstreeCommitStageMetadata),
}

impl OsBuildOutput {
    /// Decoded stage metadata of one pipeline, skipping stage kinds that carry
    /// nothing of interest. A missing pipeline yields nothing.
    pub fn stage_metadata(
        &self,
        pipeline: &str,
    ) -> impl Iterator<Item = Result<StageMetadata, serde_json::Error>> + '_ {
        self.metadata
            .get(pipeline)
            .into_iter()
            .flat_map(|stages| stages.iter())
            .filter_map(|(stage, value)| match stage.as_str() {
                RPM_STAGE => Some(
                    serde_json::from_value::<RpmStageMetadata>(value.clone())
                        .map(StageMetadata::Rpm),
                ),
                OSTREE_COMMIT_STAGE => Some(
                    serde_json::from_value::<OstreeCommitStageMetadata>(value.clone())
                        .map(StageMetadata::OstreeCommit),
                ),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpmStageMetadata {
    #[serde(default)]
    pub packages: Vec<RpmPackageMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpmPackageMetadata {
    pub name: String,
    pub version: String,
    pub release: String,
    #[serde(default)]
    pub epoch: Option<String>,
    pub arch: String,
    #[serde(default)]
    pub sigmd5: String,
    #[serde(default)]
    pub sigpgp: String,
    #[serde(default)]
    pub siggpg: String,
}

impl RpmPackageMetadata {
    /// PGP signature of the package, falling back to the GPG header
    pub fn signature(&self) -> Option<String> {
        if !self.sigpgp.is_empty() {
            Some(self.sigpgp.clone())
        } else if !self.siggpg.is_empty() {
            Some(self.siggpg.clone())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OstreeCommitStageMetadata {
    pub compose: OstreeCommitCompose,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OstreeCommitCompose {
    #[serde(rename = "ostree-commit")]
    pub ostree_commit: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signature_prefers_pgp() {
        let mut pkg = RpmPackageMetadata {
            sigpgp: "pgp".to_string(),
            siggpg: "gpg".to_string(),
            ..Default::default()
        };
        assert_eq!(pkg.signature().as_deref(), Some("pgp"));

        pkg.sigpgp.clear();
        assert_eq!(pkg.signature().as_deref(), Some("gpg"));

        pkg.siggpg.clear();
        assert_eq!(pkg.signature(), None);
    }

    #[test]
    fn test_stage_metadata_skips_unknown_stages() {
        let output: OsBuildOutput = serde_json::from_value(json!({
            "success": true,
            "log": { "os": [] },
            "metadata": {
                "os": {
                    "org.osbuild.selinux": { "labels": 3 },
                    "org.osbuild.rpm": {
                        "packages": [{
                            "name": "bash", "version": "5.2", "release": "1",
                            "arch": "x86_64", "sigmd5": "abc"
                        }]
                    }
                }
            }
        }))
        .unwrap();

        let stages: Vec<_> = output.stage_metadata("os").collect();
        assert_eq!(stages.len(), 1);
        match &stages[0] {
            Ok(StageMetadata::Rpm(md)) => assert_eq!(md.packages[0].name, "bash"),
            other => panic!("unexpected stage: {:?}", other),
        }

        assert_eq!(output.stage_metadata("build").count(), 0);
    }
}
