use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::{CandidateSource, JobSource, SourceError, distinct_roles, role_matches};
use crate::{CandidateRecord, Job};

/// In-process jobs and candidates, used by tests and local runs.
#[derive(Default)]
pub struct MemorySource {
    jobs: RwLock<HashMap<String, Job>>,
    candidates: RwLock<Vec<CandidateRecord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, job: Job) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.id.clone(), job);
    }

    pub fn add_candidate(&self, record: CandidateRecord) {
        self.candidates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Replaces the whole candidate pool.
    pub fn set_pool(&self, records: Vec<CandidateRecord>) {
        *self
            .candidates
            .write()
            .unwrap_or_else(PoisonError::into_inner) = records;
    }
}

#[async_trait]
impl JobSource for MemorySource {
    async fn job(&self, job_id: &str) -> Result<Option<Job>, SourceError> {
        Ok(self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned())
    }
}

#[async_trait]
impl CandidateSource for MemorySource {
    async fn eligible_candidates(&self, job: &Job) -> Result<Vec<CandidateRecord>, SourceError> {
        Ok(self
            .candidates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| role_matches(&job.role_title, record.target_role.as_deref()))
            .cloned()
            .collect())
    }

    async fn target_roles(&self) -> Result<Vec<String>, SourceError> {
        let candidates = self
            .candidates
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(distinct_roles(
            candidates.iter().map(|record| record.target_role.as_deref()),
        ))
    }
}
