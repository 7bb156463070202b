//! Clone orchestration
//!
//! Delivers an already built EC2 image to another region and/or more
//! accounts without rebuilding it: an optional region copy job on the build,
//! then an optional share job on whatever is last in the chain.

use composer_core::domain::job::JobKind;
use composer_core::domain::target::{TargetOptions, TargetResult};
use composer_core::domain::worker::{
    AwsEc2CopyJob, AwsEc2CopyJobResult, AwsEc2ShareJob, AwsEc2ShareJobResult, JobResultPayload,
    OsBuildJob, OsBuildJobResult,
};
use composer_core::dto::ObjectReference;
use composer_core::dto::clone::{AwsEc2CloneCompose, CloneComposeResponse, CloneStatus};
use composer_core::dto::upload::{
    AwsEc2UploadStatus, UploadStatus, UploadStatusOptions, UploadStatusValue,
};
use uuid::Uuid;

use crate::service::BASE_PATH;
use crate::service::error::ComposerError;
use crate::service::status::upload_status;
use crate::service::workers::{JobInfo, Workers, ensure_channel};

/// Clones the image built by compose `id`
///
/// Returns the job to poll for completion of the clone: the share job if one
/// was needed, else the copy job, else the build itself.
pub async fn clone_compose(
    workers: &Workers,
    id: Uuid,
    request: AwsEc2CloneCompose,
    channel: &str,
) -> Result<CloneComposeResponse, ComposerError> {
    let kind = workers.compose_kind(id).await?;
    if kind != JobKind::OsBuild {
        return Err(ComposerError::InvalidJobType { id, kind });
    }

    let build = workers.job_info::<OsBuildJobResult>(id).await?;
    ensure_channel(&build, channel)?;

    if !build.status.is_finished() || !build.result.success {
        return Err(ComposerError::ComposeBadState(id));
    }

    let [target_result] = build.result.target_results.as_slice() else {
        return Err(ComposerError::SeveralUploadTargets {
            id,
            count: build.result.target_results.len(),
        });
    };
    // Known targets without an upload status; anything unknown is left to
    // the translation below
    if matches!(target_result, TargetResult::WorkerServer | TargetResult::Koji(_)) {
        return Err(ComposerError::UnsupportedCloneTarget(
            target_result.name().to_string(),
        ));
    }
    let upload = UploadStatus::try_from(target_result)?;

    let job: OsBuildJob = build.args()?;
    let [target] = job.targets.as_slice() else {
        return Err(ComposerError::SeveralUploadTargets {
            id,
            count: job.targets.len(),
        });
    };

    let UploadStatusOptions::Aws(source) = upload.options else {
        return Err(ComposerError::UnsupportedCloneTarget(
            target_result.name().to_string(),
        ));
    };
    let TargetOptions::Aws(declared) = &target.options else {
        tracing::error!(
            "Build job {} reported an EC2 image for a {} target",
            id,
            target.name()
        );
        return Err(ComposerError::MalformedJob {
            id,
            reason: format!("aws target result for a {} target", target.name()),
        });
    };

    // Image and region the share job works on; empty values are filled in by
    // the worker from the output of the copy job
    let (mut share_ami, mut share_region) = (source.ami.clone(), request.region.clone());
    let mut tail = id;

    if request.region != source.region {
        share_ami.clear();
        share_region.clear();

        tail = match find_copy(workers, &build, &request.region).await? {
            Some(copy) => {
                tracing::info!("Reusing copy job {} of compose {}", copy, id);
                copy
            }
            None => {
                let copy = AwsEc2CopyJob {
                    ami: source.ami.clone(),
                    source_region: source.region.clone(),
                    target_region: request.region.clone(),
                    target_name: format!("composer-api-{}", Uuid::new_v4()),
                };
                let copy_id = workers.enqueue(&copy, vec![tail], channel).await?;
                tracing::info!(
                    "Copy job {} enqueued for compose {} ({} -> {})",
                    copy_id,
                    id,
                    copy.source_region,
                    copy.target_region
                );
                copy_id
            }
        };
    }

    let accounts = share_accounts(
        &declared.share_with_accounts,
        request.share_with_accounts.as_deref().unwrap_or_default(),
    );
    if !accounts.is_empty() {
        let share = AwsEc2ShareJob {
            ami: share_ami,
            region: share_region,
            share_with_accounts: accounts,
        };
        tail = workers.enqueue(&share, vec![tail], channel).await?;
        tracing::info!("Share job {} enqueued for compose {}", tail, id);
    }

    Ok(CloneComposeResponse {
        reference: ObjectReference::new(
            format!("{}/composes/{}/clone", BASE_PATH, id),
            tail,
            "CloneComposeId",
        ),
    })
}

/// Status of the job returned by [`clone_compose`]
pub async fn get_clone_status(
    workers: &Workers,
    id: Uuid,
    channel: &str,
) -> Result<CloneStatus, ComposerError> {
    let upload_status = match workers.compose_kind(id).await? {
        JobKind::AwsEc2Copy => {
            let copy = workers.job_info::<AwsEc2CopyJobResult>(id).await?;
            ensure_channel(&copy, channel)?;
            clone_upload_status(&copy, &copy.result.ami, &copy.result.region)
        }
        JobKind::AwsEc2Share => {
            let share = workers.job_info::<AwsEc2ShareJobResult>(id).await?;
            ensure_channel(&share, channel)?;
            clone_upload_status(&share, &share.result.ami, &share.result.region)
        }
        kind => return Err(ComposerError::InvalidJobType { id, kind }),
    };

    Ok(CloneStatus {
        reference: ObjectReference::new(
            format!("{}/clones/{}", BASE_PATH, id),
            id,
            "CloneComposeStatus",
        ),
        upload_status,
    })
}

/// Existing copy of the build into `region` that has not failed
///
/// A canceled copy counts as failed, like a copy with a job error. Best
/// effort: two concurrent requests may both miss and enqueue a copy.
async fn find_copy(
    workers: &Workers,
    build: &JobInfo<OsBuildJobResult>,
    region: &str,
) -> Result<Option<Uuid>, ComposerError> {
    for dependent in &build.dependents {
        if workers.job_kind(*dependent).await? != JobKind::AwsEc2Copy {
            continue;
        }

        let copy = workers.job_info::<AwsEc2CopyJobResult>(*dependent).await?;
        let args: AwsEc2CopyJob = copy.args()?;
        let failed = upload_status(&copy.status, copy.result.job_error())
            == UploadStatusValue::Failure;
        if args.target_region == region && !failed {
            return Ok(Some(copy.id));
        }
    }

    Ok(None)
}

/// Accounts shared at build time followed by the requested ones, without
/// repeats
fn share_accounts(declared: &[String], requested: &[String]) -> Vec<String> {
    let mut accounts: Vec<String> = Vec::with_capacity(declared.len() + requested.len());
    for account in declared.iter().chain(requested) {
        if !accounts.contains(account) {
            accounts.push(account.clone());
        }
    }
    accounts
}

fn clone_upload_status<R: JobResultPayload>(
    info: &JobInfo<R>,
    ami: &str,
    region: &str,
) -> UploadStatus {
    UploadStatus::new(
        upload_status(&info.status, info.result.job_error()),
        UploadStatusOptions::Aws(AwsEc2UploadStatus {
            ami: ami.to_string(),
            region: region.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{JobStore, MemoryJobStore};
    use composer_core::domain::target::{
        AwsS3TargetOptions, AwsTargetOptions, OsbuildArtifact, Target,
    };
    use crate::service::error::ErrorKind;
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryJobStore>,
        workers: Workers,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryJobStore::new());
            let workers = Workers::new(store.clone());
            Self { store, workers }
        }

        /// A finished EC2 build in us-east-1, shared with `accounts`
        async fn aws_build(&self, accounts: &[&str]) -> Uuid {
            let job = OsBuildJob {
                targets: vec![Target::new(
                    "composer-api-image",
                    OsbuildArtifact::default(),
                    TargetOptions::Aws(AwsTargetOptions {
                        region: "us-east-1".to_string(),
                        key: "composer-api-image".to_string(),
                        share_with_accounts: accounts.iter().map(|a| a.to_string()).collect(),
                        snapshot_name: None,
                    }),
                )],
                ..Default::default()
            };
            let id = self.workers.enqueue(&job, vec![], "").await.unwrap();
            self.store
                .finish(
                    id,
                    json!({
                        "success": true,
                        "target_results": [
                            { "name": "org.osbuild.aws", "options": { "ami": "ami-src", "region": "us-east-1" } }
                        ]
                    }),
                )
                .await;
            id
        }

        async fn dependents_of_kind(&self, id: Uuid, kind: JobKind) -> Vec<Uuid> {
            let mut found = Vec::new();
            for dep in self.store.job(id).await.unwrap().dependents {
                if self.store.job_kind(dep).await.unwrap() == kind {
                    found.push(dep);
                }
            }
            found
        }
    }

    fn request(region: &str, accounts: Option<&[&str]>) -> AwsEc2CloneCompose {
        AwsEc2CloneCompose {
            region: region.to_string(),
            share_with_accounts: accounts.map(|a| a.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[tokio::test]
    async fn test_same_region_without_accounts_returns_build() {
        let f = Fixture::new();
        let build = f.aws_build(&[]).await;

        let resp = clone_compose(&f.workers, build, request("us-east-1", None), "")
            .await
            .unwrap();

        assert_eq!(resp.reference.id, build);
        assert!(f.store.job(build).await.unwrap().dependents.is_empty());
    }

    #[tokio::test]
    async fn test_same_region_shares_source_image() {
        let f = Fixture::new();
        let build = f.aws_build(&["111"]).await;

        let resp = clone_compose(&f.workers, build, request("us-east-1", Some(&["222"])), "")
            .await
            .unwrap();

        assert!(f.dependents_of_kind(build, JobKind::AwsEc2Copy).await.is_empty());
        let share = f.workers.job_info::<AwsEc2ShareJobResult>(resp.reference.id).await.unwrap();
        let args: AwsEc2ShareJob = share.args().unwrap();
        assert_eq!(
            args,
            AwsEc2ShareJob {
                ami: "ami-src".to_string(),
                region: "us-east-1".to_string(),
                share_with_accounts: vec!["111".to_string(), "222".to_string()],
            }
        );
        assert_eq!(share.dependencies, vec![build]);
    }

    #[tokio::test]
    async fn test_other_region_enqueues_one_copy() {
        let f = Fixture::new();
        let build = f.aws_build(&[]).await;

        let resp = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap();

        let copies = f.dependents_of_kind(build, JobKind::AwsEc2Copy).await;
        assert_eq!(copies, vec![resp.reference.id]);

        let copy = f.workers.job_info::<AwsEc2CopyJobResult>(copies[0]).await.unwrap();
        let args: AwsEc2CopyJob = copy.args().unwrap();
        assert_eq!(args.ami, "ami-src");
        assert_eq!(args.source_region, "us-east-1");
        assert_eq!(args.target_region, "eu-west-1");
        assert!(args.target_name.starts_with("composer-api-"));
    }

    #[tokio::test]
    async fn test_repeated_clone_reuses_copy() {
        let f = Fixture::new();
        let build = f.aws_build(&[]).await;

        let first = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap();
        let second = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap();

        assert_eq!(first.reference.id, second.reference.id);
        assert_eq!(f.dependents_of_kind(build, JobKind::AwsEc2Copy).await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_copy_is_not_reused() {
        let f = Fixture::new();
        let build = f.aws_build(&[]).await;

        let first = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap();
        f.store
            .finish(
                first.reference.id,
                json!({ "job_error": { "id": 30, "reason": "copy failed" } }),
            )
            .await;

        let second = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap();
        assert_ne!(first.reference.id, second.reference.id);
    }

    #[tokio::test]
    async fn test_canceled_copy_fails_and_is_not_reused() {
        let f = Fixture::new();
        let build = f.aws_build(&[]).await;

        let first = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap();
        f.store.cancel(first.reference.id).await;

        let status = get_clone_status(&f.workers, first.reference.id, "").await.unwrap();
        assert_eq!(status.upload_status.status, Some(UploadStatusValue::Failure));

        let second = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap();
        assert_ne!(first.reference.id, second.reference.id);
        assert_eq!(f.dependents_of_kind(build, JobKind::AwsEc2Copy).await.len(), 2);
    }

    #[tokio::test]
    async fn test_other_region_share_is_deferred_to_copy() {
        let f = Fixture::new();
        let build = f.aws_build(&["111"]).await;

        let resp = clone_compose(
            &f.workers,
            build,
            request("eu-west-1", Some(&["111", "333"])),
            "",
        )
        .await
        .unwrap();

        let share = f.workers.job_info::<AwsEc2ShareJobResult>(resp.reference.id).await.unwrap();
        let args: AwsEc2ShareJob = share.args().unwrap();
        assert!(args.ami.is_empty());
        assert!(args.region.is_empty());
        assert_eq!(args.share_with_accounts, vec!["111", "333"]);

        let copies = f.dependents_of_kind(build, JobKind::AwsEc2Copy).await;
        assert_eq!(share.dependencies, copies);
    }

    #[tokio::test]
    async fn test_clone_preconditions() {
        let f = Fixture::new();

        // not finished
        let pending = f.workers.enqueue(&OsBuildJob::default(), vec![], "").await.unwrap();
        let err = clone_compose(&f.workers, pending, request("eu-west-1", None), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::ComposeBadState(_)));

        // zero target results
        f.store.finish(pending, json!({ "success": true })).await;
        let err = clone_compose(&f.workers, pending, request("eu-west-1", None), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::SeveralUploadTargets { count: 0, .. }));

        // not a build
        let copy = f.workers.enqueue(&AwsEc2CopyJob::default(), vec![], "").await.unwrap();
        let err = clone_compose(&f.workers, copy, request("eu-west-1", None), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::InvalidJobType { .. }));
    }

    #[tokio::test]
    async fn test_s3_upload_cannot_be_cloned() {
        let f = Fixture::new();
        let job = OsBuildJob {
            targets: vec![Target::new(
                "image.raw",
                OsbuildArtifact::default(),
                TargetOptions::AwsS3(AwsS3TargetOptions::default()),
            )],
            ..Default::default()
        };
        let build = f.workers.enqueue(&job, vec![], "").await.unwrap();
        f.store
            .finish(
                build,
                json!({
                    "success": true,
                    "target_results": [{ "name": "org.osbuild.aws.s3", "options": { "url": "https://s3" } }]
                }),
            )
            .await;

        let err = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::UnsupportedCloneTarget(name) if name == "org.osbuild.aws.s3"));
    }

    #[tokio::test]
    async fn test_local_and_koji_builds_cannot_be_cloned() {
        let f = Fixture::new();
        let results = [
            json!({ "name": "org.osbuild.worker.server" }),
            json!({ "name": "org.osbuild.koji", "options": { "image_md5": "abc", "image_size": 1 } }),
        ];

        for result in results {
            let name = result["name"].as_str().unwrap().to_string();
            let build = f.workers.enqueue(&OsBuildJob::default(), vec![], "").await.unwrap();
            f.store
                .finish(build, json!({ "success": true, "target_results": [result] }))
                .await;

            let err = clone_compose(&f.workers, build, request("eu-west-1", None), "")
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unsupported);
            assert!(matches!(err, ComposerError::UnsupportedCloneTarget(found) if found == name));
        }
    }

    #[tokio::test]
    async fn test_unknown_target_cannot_be_translated() {
        let f = Fixture::new();
        let build = f.workers.enqueue(&OsBuildJob::default(), vec![], "").await.unwrap();
        f.store
            .finish(
                build,
                json!({ "success": true, "target_results": [{ "name": "org.osbuild.vmware" }] }),
            )
            .await;

        let err = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::UnknownUploadTarget(_)));
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    }

    #[tokio::test]
    async fn test_clone_status() {
        let f = Fixture::new();
        let build = f.aws_build(&[]).await;
        let resp = clone_compose(&f.workers, build, request("eu-west-1", None), "")
            .await
            .unwrap();
        let copy = resp.reference.id;

        let status = get_clone_status(&f.workers, copy, "").await.unwrap();
        assert_eq!(status.upload_status.status, Some(UploadStatusValue::Pending));

        f.store.start(copy).await;
        let status = get_clone_status(&f.workers, copy, "").await.unwrap();
        assert_eq!(status.upload_status.status, Some(UploadStatusValue::Running));

        f.store
            .finish(copy, json!({ "ami": "ami-copy", "region": "eu-west-1" }))
            .await;
        let status = get_clone_status(&f.workers, copy, "").await.unwrap();
        assert_eq!(status.upload_status.status, Some(UploadStatusValue::Success));
        assert_eq!(
            status.upload_status.options,
            UploadStatusOptions::Aws(AwsEc2UploadStatus {
                ami: "ami-copy".to_string(),
                region: "eu-west-1".to_string(),
            })
        );

        let err = get_clone_status(&f.workers, build, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::InvalidJobType { kind: JobKind::OsBuild, .. }));
    }

    #[test]
    fn test_share_accounts_union() {
        let declared = vec!["1".to_string(), "2".to_string()];
        let requested = vec!["2".to_string(), "3".to_string(), "3".to_string()];

        assert_eq!(share_accounts(&declared, &requested), vec!["1", "2", "3"]);
        assert!(share_accounts(&[], &[]).is_empty());
    }
}
