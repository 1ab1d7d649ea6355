use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::PgPool;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const BOOTSTRAP: &str = "
CREATE SCHEMA IF NOT EXISTS cr;
CREATE TABLE IF NOT EXISTS cr.schema_migrations (
    id INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);";

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "ranking run arena and per-job latest index",
        sql: r#"
CREATE TABLE IF NOT EXISTS cr.ranking_runs (
    ranking_id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL,
    job_title TEXT NOT NULL,
    ranked_at TIMESTAMPTZ NOT NULL,
    total_candidates INTEGER NOT NULL CHECK (total_candidates >= 0),
    document JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS cr.ranking_latest (
    job_id TEXT PRIMARY KEY,
    ranking_id TEXT NOT NULL REFERENCES cr.ranking_runs(ranking_id)
);
"#,
    },
    Migration {
        id: 2,
        description: "listing and per-job history indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_ranking_runs_ranked_at
    ON cr.ranking_runs(ranked_at DESC, ranking_id DESC);
CREATE INDEX IF NOT EXISTS idx_ranking_runs_job
    ON cr.ranking_runs(job_id, ranked_at DESC);
"#,
    },
];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client.batch_execute(BOOTSTRAP).await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM cr.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);
        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO cr.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
