use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id UUID PRIMARY KEY,
            type VARCHAR(64) NOT NULL,
            channel VARCHAR(255) NOT NULL DEFAULT '',
            args JSONB NOT NULL DEFAULT '{}',
            result JSONB,
            queued_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            finished_at TIMESTAMPTZ,
            canceled BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create dependencies table, position keeps the submission order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_dependencies (
            job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            dependency_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            PRIMARY KEY (job_id, dependency_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Dependents are looked up when cloning
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_job_dependencies_dependency_id ON job_dependencies(dependency_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_type ON jobs(type)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
