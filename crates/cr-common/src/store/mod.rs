//! Persistence of ranking runs.
//!
//! Runs live in an arena keyed by `ranking_id`; a per-job index points at the
//! current run. Writing a run inserts it and repoints the index in one step,
//! so readers observe either the previous run or the new one. Superseded runs
//! stay addressable by id.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;

use crate::ranking::{RankingListItem, RankingRun};

pub use memory::MemoryRankingStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to decode stored ranking: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait RankingStore: Send + Sync {
    /// Current run for a job, if any.
    async fn latest_for_job(&self, job_id: &str) -> Result<Option<Arc<RankingRun>>, StoreError>;

    async fn get(&self, ranking_id: &str) -> Result<Option<Arc<RankingRun>>, StoreError>;

    /// Inserts `run` and makes it the current run of its job.
    async fn put(&self, run: Arc<RankingRun>) -> Result<(), StoreError>;

    /// Every stored run, most recent first.
    async fn list(&self) -> Result<Vec<RankingListItem>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
