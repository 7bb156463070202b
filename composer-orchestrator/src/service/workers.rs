//! Typed access to the job store
//!
//! Wraps a [`JobStore`] so the compose services read arguments and results
//! of a known job kind instead of raw JSON.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use composer_core::domain::job::{JobError, JobKind, JobStatus};
use composer_core::domain::worker::{GenericJobResult, JobArgs, JobResultPayload};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::repository::{JobRecord, JobStore, NewJob, StoreError};
use crate::service::error::ComposerError;

/// A job with its result decoded
#[derive(Debug, Clone)]
pub struct JobInfo<R> {
    pub id: Uuid,
    pub channel: String,
    pub status: JobStatus,
    pub dependencies: Vec<Uuid>,
    pub dependents: Vec<Uuid>,
    /// Decoded result, `Default` while the job has not finished
    pub result: R,
    /// Undecoded arguments, see [`JobInfo::args`]
    pub raw_args: serde_json::Value,
    /// Undecoded result, for callers passing it through
    pub raw_result: Option<serde_json::Value>,
}

impl<R> JobInfo<R> {
    pub fn args<A: JobArgs>(&self) -> Result<A, ComposerError> {
        decode(self.id, self.raw_args.clone())
    }
}

#[derive(Clone)]
pub struct Workers {
    store: Arc<dyn JobStore>,
}

impl Workers {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn job_kind(&self, id: Uuid) -> Result<JobKind, ComposerError> {
        Ok(self.store.job_kind(id).await?)
    }

    /// Kind of the job a request names, `ComposeNotFound` if there is none
    pub async fn compose_kind(&self, id: Uuid) -> Result<JobKind, ComposerError> {
        match self.store.job_kind(id).await {
            Err(StoreError::NotFound(_)) => Err(ComposerError::ComposeNotFound(id)),
            res => Ok(res?),
        }
    }

    /// Reads a job of kind `R::KIND` and decodes its result
    pub async fn job_info<R: JobResultPayload>(&self, id: Uuid) -> Result<JobInfo<R>, ComposerError> {
        let record = self.store.job(id).await?;
        if record.kind != R::KIND {
            return Err(StoreError::KindMismatch {
                id,
                expected: R::KIND,
                found: record.kind,
            }
            .into());
        }

        let result = match &record.result {
            Some(value) => decode(id, value.clone())?,
            None => R::default(),
        };

        Ok(JobInfo {
            id,
            channel: record.channel,
            status: record.status,
            dependencies: record.dependencies,
            dependents: record.dependents,
            result,
            raw_args: record.args,
            raw_result: record.result,
        })
    }

    /// Enqueues a job with `args`, waiting on `dependencies`
    pub async fn enqueue<A: JobArgs>(
        &self,
        args: &A,
        dependencies: Vec<Uuid>,
        channel: &str,
    ) -> Result<Uuid, ComposerError> {
        let args = serde_json::to_value(args).map_err(|e| ComposerError::Enqueue {
            kind: A::KIND,
            source: StoreError::Malformed {
                id: Uuid::nil(),
                reason: e.to_string(),
            },
        })?;

        let id = self
            .store
            .enqueue(NewJob {
                kind: A::KIND,
                args,
                dependencies,
                channel: channel.to_string(),
            })
            .await
            .map_err(|source| ComposerError::Enqueue {
                kind: A::KIND,
                source,
            })?;

        tracing::debug!("Enqueued {} job {}", A::KIND, id);

        Ok(id)
    }

    /// First job error of a job and everything it depends on
    ///
    /// The job's own error wins; otherwise dependencies are searched breadth
    /// first, so the nearest failed ancestor is reported.
    pub async fn dependency_chain_error(&self, id: Uuid) -> Result<Option<JobError>, ComposerError> {
        let mut queue = VecDeque::from([id]);
        let mut seen = HashSet::from([id]);

        while let Some(current) = queue.pop_front() {
            let record = self.store.job(current).await?;
            if let Some(error) = job_error(&record)? {
                return Ok(Some(error));
            }

            for dep in record.dependencies {
                if seen.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }

        Ok(None)
    }

    /// Nearest job of `kind` among the (transitive) dependencies
    pub async fn find_dependency(
        &self,
        dependencies: &[Uuid],
        kind: JobKind,
    ) -> Result<Option<Uuid>, ComposerError> {
        let mut queue: VecDeque<Uuid> = dependencies.iter().copied().collect();
        let mut seen: HashSet<Uuid> = queue.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            let record = self.store.job(current).await?;
            if record.kind == kind {
                return Ok(Some(current));
            }

            for dep in record.dependencies {
                if seen.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }

        Ok(None)
    }
}

/// Hides jobs of other tenants
///
/// An empty request channel means the request is not scoped to a tenant.
pub fn ensure_channel<R>(info: &JobInfo<R>, channel: &str) -> Result<(), ComposerError> {
    if !channel.is_empty() && info.channel != channel {
        tracing::debug!(
            "Job {} belongs to channel {:?}, request is on {:?}",
            info.id,
            info.channel,
            channel
        );
        return Err(ComposerError::ComposeNotFound(info.id));
    }
    Ok(())
}

fn job_error(record: &JobRecord) -> Result<Option<JobError>, ComposerError> {
    match &record.result {
        Some(value) => {
            let generic: GenericJobResult = decode(record.id, value.clone())?;
            Ok(generic.job_error)
        }
        None => Ok(None),
    }
}

fn decode<T: DeserializeOwned>(id: Uuid, value: serde_json::Value) -> Result<T, ComposerError> {
    serde_json::from_value(value).map_err(|e| ComposerError::MalformedJob {
        id,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryJobStore;
    use composer_core::domain::worker::{
        AwsEc2CopyJob, KojiInitJob, KojiInitJobResult, ManifestJobById, OsBuildJob,
        OsBuildJobResult,
    };
    use serde_json::json;

    fn workers() -> (Arc<MemoryJobStore>, Workers) {
        let store = Arc::new(MemoryJobStore::new());
        (store.clone(), Workers::new(store))
    }

    #[tokio::test]
    async fn test_job_info_decodes_result() {
        let (store, workers) = workers();
        let id = workers
            .enqueue(&KojiInitJob::default(), vec![], "")
            .await
            .unwrap();

        let info = workers.job_info::<KojiInitJobResult>(id).await.unwrap();
        assert_eq!(info.result.build_id, 0);
        assert!(info.raw_result.is_none());

        store.finish(id, json!({ "build_id": 7, "token": "t" })).await;
        let info = workers.job_info::<KojiInitJobResult>(id).await.unwrap();
        assert_eq!(info.result.build_id, 7);
        assert!(info.args::<KojiInitJob>().is_ok());
    }

    #[tokio::test]
    async fn test_job_info_rejects_other_kind() {
        let (_, workers) = workers();
        let id = workers
            .enqueue(&KojiInitJob::default(), vec![], "")
            .await
            .unwrap();

        let err = workers.job_info::<OsBuildJobResult>(id).await.unwrap_err();
        assert!(matches!(err, ComposerError::MalformedJob { .. }));
    }

    #[tokio::test]
    async fn test_chain_error_prefers_own_error() {
        let (store, workers) = workers();
        let manifest = workers
            .enqueue(&ManifestJobById::default(), vec![], "")
            .await
            .unwrap();
        let build = workers
            .enqueue(&OsBuildJob::default(), vec![manifest], "")
            .await
            .unwrap();

        assert_eq!(workers.dependency_chain_error(build).await.unwrap(), None);

        store
            .finish(
                manifest,
                json!({ "job_error": { "id": 22, "reason": "depsolve failed" } }),
            )
            .await;
        let err = workers.dependency_chain_error(build).await.unwrap().unwrap();
        assert_eq!(err.id, 22);

        store
            .finish(
                build,
                json!({ "job_error": { "id": 5, "reason": "dependency failed" } }),
            )
            .await;
        let err = workers.dependency_chain_error(build).await.unwrap().unwrap();
        assert_eq!(err.id, 5);
    }

    #[tokio::test]
    async fn test_find_dependency_walks_through_intermediates() {
        let (_, workers) = workers();
        let manifest = workers
            .enqueue(&ManifestJobById::default(), vec![], "")
            .await
            .unwrap();
        let init = workers
            .enqueue(&KojiInitJob::default(), vec![], "")
            .await
            .unwrap();
        let copy = workers
            .enqueue(&AwsEc2CopyJob::default(), vec![manifest], "")
            .await
            .unwrap();

        let found = workers
            .find_dependency(&[init, copy], JobKind::ManifestIdOnly)
            .await
            .unwrap();
        assert_eq!(found, Some(manifest));

        let found = workers
            .find_dependency(&[init], JobKind::ManifestIdOnly)
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_missing_job_depends_on_who_asked() {
        let (_, workers) = workers();
        let id = Uuid::new_v4();

        let err = workers.compose_kind(id).await.unwrap_err();
        assert!(matches!(err, ComposerError::ComposeNotFound(found) if found == id));

        let err = workers.job_kind(id).await.unwrap_err();
        assert!(matches!(err, ComposerError::MissingJob(found) if found == id));

        let err = workers.dependency_chain_error(id).await.unwrap_err();
        assert!(matches!(err, ComposerError::MissingJob(_)));
    }

    #[tokio::test]
    async fn test_ensure_channel() {
        let (_, workers) = workers();
        let id = workers
            .enqueue(&OsBuildJob::default(), vec![], "tenant-a")
            .await
            .unwrap();
        let info = workers.job_info::<OsBuildJobResult>(id).await.unwrap();

        assert!(ensure_channel(&info, "").is_ok());
        assert!(ensure_channel(&info, "tenant-a").is_ok());
        assert!(matches!(
            ensure_channel(&info, "tenant-b"),
            Err(ComposerError::ComposeNotFound(_))
        ));
    }
}
