//! Repository Module
//!
//! Access to the external job store. The orchestrator never executes jobs; it
//! reads their state and enqueues new ones. The [`JobStore`] trait is the only
//! seam, with a PostgreSQL implementation for deployments and an in-memory one
//! for development and tests.

pub mod job;
pub mod memory;

use async_trait::async_trait;
use composer_core::domain::job::{JobKind, JobStatus};
use uuid::Uuid;

pub use job::PgJobStore;
pub use memory::MemoryJobStore;

/// Repository error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {id} is malformed: {reason}")]
    Malformed { id: Uuid, reason: String },

    #[error("job {id} is of kind {found}, expected {expected}")]
    KindMismatch {
        id: Uuid,
        expected: JobKind,
        found: JobKind,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A job as stored, with arguments and result still undecoded
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: Uuid,
    pub kind: JobKind,
    /// Tenant channel the job was submitted on, empty for none
    pub channel: String,
    pub args: serde_json::Value,
    /// Unset until a worker reports the job as finished
    pub result: Option<serde_json::Value>,
    pub status: JobStatus,
    /// Jobs this one waits on, in submission order
    pub dependencies: Vec<Uuid>,
    /// Jobs waiting on this one, oldest first
    pub dependents: Vec<Uuid>,
}

/// A job to enqueue
#[derive(Debug, Clone)]
pub struct NewJob {
    pub kind: JobKind,
    pub args: serde_json::Value,
    pub dependencies: Vec<Uuid>,
    pub channel: String,
}

/// Repository trait for the external job store
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Kind the job was declared with
    async fn job_kind(&self, id: Uuid) -> Result<JobKind, StoreError>;

    /// Full record of a job
    async fn job(&self, id: Uuid) -> Result<JobRecord, StoreError>;

    /// Enqueues a job and returns its id
    ///
    /// Every dependency must already exist.
    async fn enqueue(&self, job: NewJob) -> Result<Uuid, StoreError>;
}
