//! Compose metadata
//!
//! Packages installed into the image and the ostree commit it produced, read
//! from the osbuild output of a successful build.

use composer_core::domain::job::JobKind;
use composer_core::domain::osbuild::{OsBuildOutput, RpmPackageMetadata, StageMetadata};
use composer_core::domain::worker::{OsBuildJob, OsBuildJobResult};
use composer_core::dto::ObjectReference;
use composer_core::dto::status::{ComposeMetadata, PackageMetadata};
use uuid::Uuid;

use crate::service::BASE_PATH;
use crate::service::error::ComposerError;
use crate::service::workers::{Workers, ensure_channel};

pub async fn get_compose_metadata(
    workers: &Workers,
    id: Uuid,
    channel: &str,
) -> Result<ComposeMetadata, ComposerError> {
    let kind = workers.compose_kind(id).await?;
    // TODO: collect metadata of every build of a Koji compose
    if kind != JobKind::OsBuild {
        return Err(ComposerError::InvalidJobType { id, kind });
    }

    let build = workers.job_info::<OsBuildJobResult>(id).await?;
    ensure_channel(&build, channel)?;
    let job: OsBuildJob = build.args()?;

    let mut metadata = ComposeMetadata {
        reference: ObjectReference::new(
            format!("{}/composes/{}/metadata", BASE_PATH, id),
            id,
            "ComposeMetadata",
        ),
        packages: None,
        ostree_commit: None,
    };

    // Only a finished, successful build has metadata worth reporting
    if !build.status.is_finished() || build.status.canceled || !build.result.success {
        return Ok(metadata);
    }

    let output = match &build.result.osbuild_output {
        Some(output) if !output.log.is_empty() => output,
        _ => {
            tracing::error!("Build job {} succeeded without osbuild output", id);
            return Err(ComposerError::MissingBuildOutput(id));
        }
    };

    let (packages, ostree_commit) = extract(id, output, &job.pipeline_names.payload)?;
    metadata.packages = Some(packages);
    metadata.ostree_commit = ostree_commit;

    Ok(metadata)
}

/// Walks the payload pipelines in order, collecting installed packages and
/// the last ostree commit
fn extract(
    id: Uuid,
    output: &OsBuildOutput,
    payload_pipelines: &[String],
) -> Result<(Vec<PackageMetadata>, Option<String>), ComposerError> {
    let mut packages = Vec::new();
    let mut ostree_commit = None;

    for pipeline in payload_pipelines {
        for stage in output.stage_metadata(pipeline) {
            let stage = stage.map_err(|e| ComposerError::MalformedJob {
                id,
                reason: format!("stage metadata of pipeline {}: {}", pipeline, e),
            })?;

            match stage {
                StageMetadata::Rpm(rpm) => {
                    packages.extend(rpm.packages.iter().map(package_metadata));
                }
                StageMetadata::OstreeCommit(commit) => {
                    ostree_commit = Some(commit.compose.ostree_commit);
                }
            }
        }
    }

    Ok((packages, ostree_commit))
}

fn package_metadata(rpm: &RpmPackageMetadata) -> PackageMetadata {
    PackageMetadata {
        package_type: "rpm".to_string(),
        name: rpm.name.clone(),
        version: rpm.version.clone(),
        release: rpm.release.clone(),
        epoch: rpm.epoch.clone(),
        arch: rpm.arch.clone(),
        sigmd5: rpm.sigmd5.clone(),
        signature: rpm.signature(),
    }
}
