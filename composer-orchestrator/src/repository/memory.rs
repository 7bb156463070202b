//! In-memory job store
//!
//! Used when no database is configured and by the service tests, which drive
//! jobs through their lifecycle the way a worker would.

use std::collections::HashMap;

use async_trait::async_trait;
use composer_core::domain::job::{JobKind, JobStatus};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repository::{JobRecord, JobStore, NewJob, StoreError};

#[derive(Default)]
pub struct MemoryJobStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, StoredJob>,
    /// Ids in enqueue order
    order: Vec<Uuid>,
}

struct StoredJob {
    kind: JobKind,
    channel: String,
    args: serde_json::Value,
    result: Option<serde_json::Value>,
    status: JobStatus,
    dependencies: Vec<Uuid>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn job_kind(&self, id: Uuid) -> Result<JobKind, StoreError> {
        let inner = self.inner.read().await;
        inner
            .jobs
            .get(&id)
            .map(|job| job.kind)
            .ok_or(StoreError::NotFound(id))
    }

    async fn job(&self, id: Uuid) -> Result<JobRecord, StoreError> {
        let inner = self.inner.read().await;
        let job = inner.jobs.get(&id).ok_or(StoreError::NotFound(id))?;

        let dependents = inner
            .order
            .iter()
            .filter(|other| {
                inner
                    .jobs
                    .get(*other)
                    .is_some_and(|j| j.dependencies.contains(&id))
            })
            .copied()
            .collect();

        Ok(JobRecord {
            id,
            kind: job.kind,
            channel: job.channel.clone(),
            args: job.args.clone(),
            result: job.result.clone(),
            status: job.status.clone(),
            dependencies: job.dependencies.clone(),
            dependents,
        })
    }

    async fn enqueue(&self, job: NewJob) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.write().await;

        if let Some(missing) = job
            .dependencies
            .iter()
            .find(|dep| !inner.jobs.contains_key(*dep))
        {
            return Err(StoreError::NotFound(*missing));
        }

        let id = Uuid::new_v4();
        inner.jobs.insert(
            id,
            StoredJob {
                kind: job.kind,
                channel: job.channel,
                args: job.args,
                result: None,
                status: JobStatus {
                    queued: Some(chrono::Utc::now()),
                    ..Default::default()
                },
                dependencies: job.dependencies,
            },
        );
        inner.order.push(id);

        Ok(id)
    }
}

// =============================================================================
// Worker Simulation
// =============================================================================

#[cfg(test)]
impl MemoryJobStore {
    /// Marks a job as picked up by a worker
    pub async fn start(&self, id: Uuid) {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).expect("job exists");
        job.status.started = Some(chrono::Utc::now());
    }

    /// Records the result of a job, starting it first if needed
    pub async fn finish(&self, id: Uuid, result: serde_json::Value) {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).expect("job exists");
        let now = chrono::Utc::now();
        job.status.started.get_or_insert(now);
        job.status.finished = Some(now);
        job.result = Some(result);
    }

    pub async fn cancel(&self, id: Uuid) {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).expect("job exists");
        job.status.canceled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_job(kind: JobKind, dependencies: Vec<Uuid>) -> NewJob {
        NewJob {
            kind,
            args: json!({}),
            dependencies,
            channel: String::new(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_read_back() {
        let store = MemoryJobStore::new();
        let id = store
            .enqueue(new_job(JobKind::OsBuild, vec![]))
            .await
            .unwrap();

        assert_eq!(store.job_kind(id).await.unwrap(), JobKind::OsBuild);

        let job = store.job(id).await.unwrap();
        assert!(job.status.queued.is_some());
        assert!(!job.status.is_started());
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_dependents_in_enqueue_order() {
        let store = MemoryJobStore::new();
        let source = store
            .enqueue(new_job(JobKind::OsBuild, vec![]))
            .await
            .unwrap();
        let first = store
            .enqueue(new_job(JobKind::AwsEc2Copy, vec![source]))
            .await
            .unwrap();
        let second = store
            .enqueue(new_job(JobKind::AwsEc2Share, vec![source]))
            .await
            .unwrap();

        let job = store.job(source).await.unwrap();
        assert_eq!(job.dependents, vec![first, second]);
        assert_eq!(store.job(first).await.unwrap().dependencies, vec![source]);
    }

    #[tokio::test]
    async fn test_enqueue_with_missing_dependency_fails() {
        let store = MemoryJobStore::new();
        let missing = Uuid::new_v4();

        let err = store
            .enqueue(new_job(JobKind::AwsEc2Share, vec![missing]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_finish_sets_result_and_timestamps() {
        let store = MemoryJobStore::new();
        let id = store
            .enqueue(new_job(JobKind::KojiInit, vec![]))
            .await
            .unwrap();

        store.finish(id, json!({ "build_id": 42 })).await;

        let job = store.job(id).await.unwrap();
        assert!(job.status.is_started());
        assert!(job.status.is_finished());
        assert_eq!(job.result, Some(json!({ "build_id": 42 })));
    }
}
