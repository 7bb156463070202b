//! Compose status
//!
//! Derives the user-facing status of a compose from the raw state of its
//! jobs. A compose is either a single build job or a Koji chain (see
//! [`KojiChain`]). Every rule below is a pure function of job statuses and
//! results so it can be checked without a job store.

use composer_core::domain::job::{JobError, JobKind, JobStatus};
use composer_core::domain::target::TargetResult;
use composer_core::domain::worker::{KojiFinalizeJobResult, KojiInitJobResult, OsBuildJobResult};
use composer_core::dto::ObjectReference;
use composer_core::dto::status::{
    ComposeStatus, ComposeStatusValue, ImageStatus, ImageStatusValue, KojiStatus,
};
use composer_core::dto::upload::{UploadStatus, UploadStatusValue};
use uuid::Uuid;

use crate::service::BASE_PATH;
use crate::service::chain::KojiChain;
use crate::service::error::ComposerError;
use crate::service::workers::{Workers, ensure_channel};

// =============================================================================
// Status Rules
// =============================================================================

/// Status of the image built by a standalone build job
pub fn build_image_status(status: &JobStatus, result: &OsBuildJobResult) -> ImageStatusValue {
    if status.canceled {
        return ImageStatusValue::Failure;
    }
    if !status.is_started() {
        return ImageStatusValue::Pending;
    }
    if !status.is_finished() {
        return ImageStatusValue::Building;
    }
    if result.success {
        ImageStatusValue::Success
    } else {
        ImageStatusValue::Failure
    }
}

/// Status of a compose made of a single build job
pub fn build_compose_status(status: &JobStatus, result: &OsBuildJobResult) -> ComposeStatusValue {
    if status.canceled {
        return ComposeStatusValue::Failure;
    }
    if !status.is_finished() {
        return ComposeStatusValue::Pending;
    }
    if result.success {
        ComposeStatusValue::Success
    } else {
        ComposeStatusValue::Failure
    }
}

/// Status of one image of a Koji compose
///
/// A failed init job fails every image of the compose.
pub fn koji_image_status(
    status: &JobStatus,
    init: &KojiInitJobResult,
    build: &OsBuildJobResult,
) -> ImageStatusValue {
    if status.canceled || init.job_error.is_some() {
        return ImageStatusValue::Failure;
    }
    if !status.is_started() {
        return ImageStatusValue::Pending;
    }
    if !status.is_finished() {
        return ImageStatusValue::Building;
    }
    if build.job_error.is_some() || build.output_failed() {
        return ImageStatusValue::Failure;
    }
    ImageStatusValue::Success
}

/// Status of a Koji compose, read off its finalize job
///
/// Once the finalize job is done the compose succeeds only if no member of
/// the chain failed.
pub fn koji_compose_status(
    status: &JobStatus,
    init: &KojiInitJobResult,
    builds: &[OsBuildJobResult],
    finalize: &KojiFinalizeJobResult,
) -> ComposeStatusValue {
    if status.canceled {
        return ComposeStatusValue::Failure;
    }
    if !status.is_finished() {
        return ComposeStatusValue::Pending;
    }

    let init_ok = init.job_error.is_none();
    let builds_ok = builds
        .iter()
        .all(|b| b.job_error.is_none() && !b.output_failed());
    let finalize_ok = finalize.job_error.is_none();

    if init_ok && builds_ok && finalize_ok {
        ComposeStatusValue::Success
    } else {
        ComposeStatusValue::Failure
    }
}

/// Status of an upload run by a job, either a build or a clone job
pub fn upload_status(status: &JobStatus, job_error: Option<&JobError>) -> UploadStatusValue {
    if job_error.is_some() || status.canceled {
        return UploadStatusValue::Failure;
    }
    if !status.is_started() {
        return UploadStatusValue::Pending;
    }
    if !status.is_finished() {
        return UploadStatusValue::Running;
    }
    UploadStatusValue::Success
}

/// Upload statuses of a build's target results
///
/// Koji imports and local saves are not uploads the user asked for and are
/// left out.
fn upload_statuses(
    result: &OsBuildJobResult,
    status: UploadStatusValue,
) -> Result<Vec<UploadStatus>, ComposerError> {
    result
        .target_results
        .iter()
        .filter(|tr| !matches!(tr, TargetResult::Koji(_) | TargetResult::WorkerServer))
        .map(|tr| Ok(UploadStatus::try_from(tr)?.with_status(status)))
        .collect()
}

// =============================================================================
// Compose Status
// =============================================================================

/// Status of the compose whose id is `id`
pub async fn get_compose_status(
    workers: &Workers,
    id: Uuid,
    channel: &str,
) -> Result<ComposeStatus, ComposerError> {
    let reference = ObjectReference::new(
        format!("{}/composes/{}", BASE_PATH, id),
        id,
        "ComposeStatus",
    );

    match workers.compose_kind(id).await? {
        JobKind::OsBuild => {
            let build = workers.job_info::<OsBuildJobResult>(id).await?;
            ensure_channel(&build, channel)?;

            let error = workers.dependency_chain_error(id).await?;
            let uploads = upload_statuses(
                &build.result,
                upload_status(&build.status, build.result.job_error.as_ref()),
            )?;

            Ok(ComposeStatus {
                reference,
                status: build_compose_status(&build.status, &build.result),
                image_status: ImageStatus::new(
                    build_image_status(&build.status, &build.result),
                    error.map(Into::into),
                    uploads,
                ),
                image_statuses: None,
                koji_status: None,
            })
        }
        JobKind::KojiFinalize => {
            let finalize = workers.job_info::<KojiFinalizeJobResult>(id).await?;
            ensure_channel(&finalize, channel)?;

            let chain = KojiChain::from_finalize(id, &finalize.dependencies)?;
            let init = workers.job_info::<KojiInitJobResult>(chain.init).await?;

            let mut build_results = Vec::with_capacity(chain.builds().len());
            let mut image_statuses = Vec::with_capacity(chain.builds().len());
            for build_id in chain.builds() {
                let build = workers.job_info::<OsBuildJobResult>(*build_id).await?;
                let error = workers.dependency_chain_error(*build_id).await?;
                let uploads = upload_statuses(
                    &build.result,
                    upload_status(&build.status, build.result.job_error.as_ref()),
                )?;

                image_statuses.push(ImageStatus::new(
                    koji_image_status(&build.status, &init.result, &build.result),
                    error.map(Into::into),
                    uploads,
                ));
                build_results.push(build.result);
            }

            let image_status = image_statuses
                .first()
                .cloned()
                .ok_or(ComposerError::MalformedChain {
                    id,
                    dependencies: finalize.dependencies.len(),
                })?;
            let build_id = init.result.build_id;

            Ok(ComposeStatus {
                reference,
                status: koji_compose_status(
                    &finalize.status,
                    &init.result,
                    &build_results,
                    &finalize.result,
                ),
                image_status,
                image_statuses: Some(image_statuses),
                koji_status: Some(KojiStatus {
                    build_id: (build_id != 0).then_some(build_id),
                }),
            })
        }
        kind => Err(ComposerError::InvalidJobType { id, kind }),
    }
}
