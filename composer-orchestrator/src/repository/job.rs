//! Job Repository
//!
//! PostgreSQL backed job store.

use async_trait::async_trait;
use composer_core::domain::job::{JobKind, JobStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{JobRecord, JobStore, NewJob, StoreError};

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn job_kind(&self, id: Uuid) -> Result<JobKind, StoreError> {
        let kind: Option<String> = sqlx::query_scalar("SELECT type FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let kind = kind.ok_or(StoreError::NotFound(id))?;
        parse_kind(id, &kind)
    }

    async fn job(&self, id: Uuid) -> Result<JobRecord, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, type, channel, args, result, queued_at, started_at,
                   finished_at, canceled
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        let dependencies: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT dependency_id
            FROM job_dependencies
            WHERE job_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let dependents: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT d.job_id
            FROM job_dependencies d
            JOIN jobs j ON j.id = d.job_id
            WHERE d.dependency_id = $1
            ORDER BY j.queued_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        row.into_record(dependencies, dependents)
    }

    async fn enqueue(&self, job: NewJob) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, type, channel, args, queued_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(job.kind.as_str())
        .bind(&job.channel)
        .bind(&job.args)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, dependency) in job.dependencies.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO job_dependencies (job_id, dependency_id, position)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(id)
            .bind(dependency)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(id)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_kind(id: Uuid, kind: &str) -> Result<JobKind, StoreError> {
    kind.parse().map_err(|e: composer_core::domain::job::UnknownJobKind| {
        StoreError::Malformed {
            id,
            reason: e.to_string(),
        }
    })
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    channel: String,
    args: serde_json::Value,
    result: Option<serde_json::Value>,
    queued_at: chrono::DateTime<chrono::Utc>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
    canceled: bool,
}

impl JobRow {
    fn into_record(
        self,
        dependencies: Vec<Uuid>,
        dependents: Vec<Uuid>,
    ) -> Result<JobRecord, StoreError> {
        let kind = parse_kind(self.id, &self.kind)?;

        Ok(JobRecord {
            id: self.id,
            kind,
            channel: self.channel,
            args: self.args,
            result: self.result,
            status: JobStatus {
                queued: Some(self.queued_at),
                started: self.started_at,
                finished: self.finished_at,
                canceled: self.canceled,
            },
            dependencies,
            dependents,
        })
    }
}
