//! Compose logs and manifests
//!
//! Both hand back raw job data for a human to read; none of it is
//! interpreted here.

use composer_core::domain::job::JobKind;
use composer_core::domain::worker::{
    KojiFinalizeJobResult, KojiInitJobResult, ManifestJobByIdResult, OsBuildJob, OsBuildJobResult,
};
use composer_core::dto::ObjectReference;
use composer_core::dto::status::{ComposeLogs, ComposeManifests, KojiLogs};
use uuid::Uuid;

use crate::service::BASE_PATH;
use crate::service::chain::KojiChain;
use crate::service::error::ComposerError;
use crate::service::workers::{JobInfo, Workers, ensure_channel};

pub async fn get_compose_logs(
    workers: &Workers,
    id: Uuid,
    channel: &str,
) -> Result<ComposeLogs, ComposerError> {
    let mut logs = ComposeLogs {
        reference: ObjectReference::new(
            format!("{}/composes/{}/logs", BASE_PATH, id),
            id,
            "ComposeLogs",
        ),
        image_builds: Vec::new(),
        koji: None,
    };

    match workers.compose_kind(id).await? {
        JobKind::OsBuild => {
            let build = workers.job_info::<OsBuildJobResult>(id).await?;
            ensure_channel(&build, channel)?;
            logs.image_builds.push(raw_result(&build));
        }
        JobKind::KojiFinalize => {
            let finalize = workers.job_info::<KojiFinalizeJobResult>(id).await?;
            ensure_channel(&finalize, channel)?;

            let chain = KojiChain::from_finalize(id, &finalize.dependencies)?;
            let init = workers.job_info::<KojiInitJobResult>(chain.init).await?;

            for build_id in chain.builds() {
                let build = koji_build(workers, *build_id).await?;
                logs.image_builds.push(raw_result(&build));
            }

            logs.koji = Some(KojiLogs {
                init: raw_result(&init),
                import: raw_result(&finalize),
            });
        }
        kind => return Err(ComposerError::InvalidJobType { id, kind }),
    }

    Ok(logs)
}

pub async fn get_compose_manifests(
    workers: &Workers,
    id: Uuid,
    channel: &str,
) -> Result<ComposeManifests, ComposerError> {
    let mut manifests = ComposeManifests {
        reference: ObjectReference::new(
            format!("{}/composes/{}/manifests", BASE_PATH, id),
            id,
            "ComposeManifests",
        ),
        manifests: Vec::new(),
    };

    match workers.compose_kind(id).await? {
        JobKind::OsBuild => {
            let build = workers.job_info::<OsBuildJobResult>(id).await?;
            ensure_channel(&build, channel)?;
            manifests.manifests.push(manifest(workers, &build).await?);
        }
        JobKind::KojiFinalize => {
            let finalize = workers.job_info::<KojiFinalizeJobResult>(id).await?;
            ensure_channel(&finalize, channel)?;

            let chain = KojiChain::from_finalize(id, &finalize.dependencies)?;
            for build_id in chain.builds() {
                let build = koji_build(workers, *build_id).await?;
                manifests.manifests.push(manifest(workers, &build).await?);
            }
        }
        kind => return Err(ComposerError::InvalidJobType { id, kind }),
    }

    Ok(manifests)
}

/// Reads a build of a Koji chain, rejecting members of another kind
async fn koji_build(
    workers: &Workers,
    id: Uuid,
) -> Result<JobInfo<OsBuildJobResult>, ComposerError> {
    let kind = workers.job_kind(id).await?;
    if kind != JobKind::OsBuild {
        tracing::warn!("Unexpected {} job {} in koji compose dependencies", kind, id);
        return Err(ComposerError::InvalidJobType { id, kind });
    }
    workers.job_info(id).await
}

/// Manifest of a build, from its arguments or else from the manifest job it
/// depends on
async fn manifest(
    workers: &Workers,
    build: &JobInfo<OsBuildJobResult>,
) -> Result<serde_json::Value, ComposerError> {
    let job: OsBuildJob = build.args()?;
    if let Some(manifest) = job.manifest.filter(|m| !m.is_null()) {
        return Ok(manifest);
    }

    let manifest_id = workers
        .find_dependency(&build.dependencies, JobKind::ManifestIdOnly)
        .await?
        .ok_or_else(|| {
            tracing::error!("Build job {} has no manifest job among its dependencies", build.id);
            ComposerError::MissingManifest(build.id)
        })?;

    let result = workers.job_info::<ManifestJobByIdResult>(manifest_id).await?;
    Ok(result.result.manifest.unwrap_or(serde_json::Value::Null))
}

fn raw_result<R>(info: &JobInfo<R>) -> serde_json::Value {
    info.raw_result.clone().unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryJobStore;
    use composer_core::domain::worker::{
        AwsEc2CopyJob, KojiFinalizeJob, KojiInitJob, ManifestJobById,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn workers() -> (Arc<MemoryJobStore>, Workers) {
        let store = Arc::new(MemoryJobStore::new());
        (store.clone(), Workers::new(store))
    }

    #[tokio::test]
    async fn test_logs_of_single_build() {
        let (store, workers) = workers();
        let id = workers.enqueue(&OsBuildJob::default(), vec![], "").await.unwrap();

        let logs = get_compose_logs(&workers, id, "").await.unwrap();
        assert_eq!(logs.image_builds, vec![serde_json::Value::Null]);

        store.finish(id, json!({ "success": true })).await;
        let logs = get_compose_logs(&workers, id, "").await.unwrap();
        assert_eq!(logs.image_builds, vec![json!({ "success": true })]);
        assert!(logs.koji.is_none());
    }

    #[tokio::test]
    async fn test_logs_of_koji_compose() {
        let (store, workers) = workers();
        let init = workers.enqueue(&KojiInitJob::default(), vec![], "").await.unwrap();
        let build = workers.enqueue(&OsBuildJob::default(), vec![init], "").await.unwrap();
        let finalize = workers
            .enqueue(
                &KojiFinalizeJob::default(),
                KojiChain::finalize_dependencies(init, &[build]),
                "",
            )
            .await
            .unwrap();

        store.finish(init, json!({ "build_id": 3 })).await;
        store.finish(build, json!({ "success": true })).await;
        store.finish(finalize, json!({})).await;

        let logs = get_compose_logs(&workers, finalize, "").await.unwrap();
        assert_eq!(logs.image_builds.len(), 1);
        let koji = logs.koji.unwrap();
        assert_eq!(koji.init, json!({ "build_id": 3 }));
        assert_eq!(koji.import, json!({}));
    }

    #[tokio::test]
    async fn test_logs_reject_foreign_chain_member() {
        let (_, workers) = workers();
        let init = workers.enqueue(&KojiInitJob::default(), vec![], "").await.unwrap();
        let copy = workers.enqueue(&AwsEc2CopyJob::default(), vec![], "").await.unwrap();
        let finalize = workers
            .enqueue(&KojiFinalizeJob::default(), vec![init, copy], "")
            .await
            .unwrap();

        let err = get_compose_logs(&workers, finalize, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::InvalidJobType { id, kind: JobKind::AwsEc2Copy } if id == copy));
    }

    #[tokio::test]
    async fn test_manifests_from_args_and_manifest_job() {
        let (store, workers) = workers();
        let inline = workers
            .enqueue(
                &OsBuildJob {
                    manifest: Some(json!({ "version": "2", "pipelines": [] })),
                    ..Default::default()
                },
                vec![],
                "",
            )
            .await
            .unwrap();

        let manifests = get_compose_manifests(&workers, inline, "").await.unwrap();
        assert_eq!(manifests.manifests, vec![json!({ "version": "2", "pipelines": [] })]);

        let init = workers.enqueue(&KojiInitJob::default(), vec![], "").await.unwrap();
        let manifest_job = workers
            .enqueue(&ManifestJobById::default(), vec![], "")
            .await
            .unwrap();
        let build = workers
            .enqueue(&OsBuildJob::default(), vec![init, manifest_job], "")
            .await
            .unwrap();
        let finalize = workers
            .enqueue(
                &KojiFinalizeJob::default(),
                KojiChain::finalize_dependencies(init, &[build]),
                "",
            )
            .await
            .unwrap();
        store
            .finish(manifest_job, json!({ "manifest": { "version": "2", "sources": {} } }))
            .await;

        let manifests = get_compose_manifests(&workers, finalize, "").await.unwrap();
        assert_eq!(manifests.manifests, vec![json!({ "version": "2", "sources": {} })]);
    }

    #[tokio::test]
    async fn test_manifest_missing_is_an_error() {
        let (_, workers) = workers();
        let id = workers.enqueue(&OsBuildJob::default(), vec![], "").await.unwrap();

        let err = get_compose_manifests(&workers, id, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::MissingManifest(found) if found == id));
    }

    #[tokio::test]
    async fn test_manifests_of_short_chain() {
        let (_, workers) = workers();
        let finalize = workers
            .enqueue(&KojiFinalizeJob::default(), vec![], "")
            .await
            .unwrap();

        let err = get_compose_manifests(&workers, finalize, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::MalformedChain { dependencies: 0, .. }));
    }
}
