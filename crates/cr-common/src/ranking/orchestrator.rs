use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::available_parallelism;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::{RankedCandidate, RankingError, RankingListItem, RankingOutcome, RankingRun, SkippedCandidate};
use crate::matching::{ScoringEngine, TierThresholds};
use crate::run_id;
use crate::sources::{CandidateSource, JobSource, SourceError};
use crate::store::RankingStore;
use crate::{Candidate, CandidateRecord, Job};

const DEFAULT_COMPUTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingConfig {
    /// Upper bound on blocking scoring tasks per run.
    pub workers: usize,
    pub compute_timeout: Duration,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            workers: available_parallelism().map(|n| n.get()).unwrap_or(4),
            compute_timeout: DEFAULT_COMPUTE_TIMEOUT,
        }
    }
}

/// One async mutex per job id. Entries nobody holds are pruned on insert.
#[derive(Default)]
pub struct JobLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl JobLocks {
    pub fn lock_for(&self, job_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = locks.get(job_id) {
            return existing.clone();
        }
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(job_id.to_string(), lock.clone());
        lock
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RankingOrchestrator {
    jobs: Arc<dyn JobSource>,
    candidates: Arc<dyn CandidateSource>,
    store: Arc<dyn RankingStore>,
    engine: Arc<ScoringEngine>,
    thresholds: TierThresholds,
    config: RankingConfig,
    locks: JobLocks,
}

impl RankingOrchestrator {
    pub fn new(
        jobs: Arc<dyn JobSource>,
        candidates: Arc<dyn CandidateSource>,
        store: Arc<dyn RankingStore>,
    ) -> Self {
        Self {
            jobs,
            candidates,
            store,
            engine: Arc::new(ScoringEngine::default()),
            thresholds: TierThresholds::default(),
            config: RankingConfig::default(),
            locks: JobLocks::default(),
        }
    }

    pub fn with_engine(mut self, engine: ScoringEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn with_thresholds(mut self, thresholds: TierThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_config(mut self, config: RankingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn RankingStore> {
        &self.store
    }

    /// Returns the stored run for `job_id`, computing one when none exists or
    /// when `force_rerank` is set.
    #[instrument(skip(self))]
    pub async fn rank(&self, job_id: &str, force_rerank: bool) -> Result<RankingOutcome, RankingError> {
        let job = self.load_job(job_id).await?;

        if !force_rerank {
            if let Some(run) = self.store.latest_for_job(&job.id).await? {
                debug!(ranking_id = %run.ranking_id, "reusing stored ranking");
                return Ok(RankingOutcome { run, reused: true });
            }
        }

        let lock = self.locks.lock_for(&job.id);
        let _guard = lock.lock().await;

        // A concurrent request may have finished while this one waited.
        if !force_rerank {
            if let Some(run) = self.store.latest_for_job(&job.id).await? {
                debug!(ranking_id = %run.ranking_id, "ranking computed while waiting");
                return Ok(RankingOutcome { run, reused: true });
            }
        }

        let records = self.candidates.eligible_candidates(&job).await?;
        let available_roles = if records.is_empty() {
            self.available_roles().await
        } else {
            Vec::new()
        };

        let timeout = self.config.compute_timeout;
        let mut run = tokio::time::timeout(timeout, self.compute(&job, records))
            .await
            .map_err(|_| RankingError::Timeout(timeout))??;
        run.note_available_roles(&available_roles);
        let run = Arc::new(run);

        self.store.put(run.clone()).await?;
        info!(
            ranking_id = %run.ranking_id,
            evaluated = run.total_candidates_evaluated,
            skipped = run.skipped_candidates.len(),
            top = run.top_candidates.len(),
            "ranking stored"
        );

        Ok(RankingOutcome { run, reused: false })
    }

    pub async fn ranking(&self, ranking_id: &str) -> Result<Arc<RankingRun>, RankingError> {
        self.store
            .get(ranking_id)
            .await?
            .ok_or_else(|| RankingError::RankingNotFound(ranking_id.to_string()))
    }

    pub async fn list_rankings(&self) -> Result<Vec<RankingListItem>, RankingError> {
        Ok(self.store.list().await?)
    }

    async fn load_job(&self, job_id: &str) -> Result<Job, RankingError> {
        let job = match self.jobs.job(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) | Err(SourceError::InvalidJobId(_)) => {
                return Err(RankingError::JobNotFound(job_id.to_string()));
            }
            Err(err) => return Err(RankingError::Upstream(err)),
        };

        job.validate().map_err(|defect| RankingError::InvalidJob {
            job_id: job_id.to_string(),
            defect,
        })?;
        Ok(job)
    }

    /// Best effort: a failing listing only loses detail in the summary.
    async fn available_roles(&self) -> Vec<String> {
        match self.candidates.target_roles().await {
            Ok(roles) => roles,
            Err(err) => {
                warn!(error = %err, "could not list candidate target roles");
                Vec::new()
            }
        }
    }

    async fn compute(
        &self,
        job: &Job,
        records: Vec<CandidateRecord>,
    ) -> Result<RankingRun, RankingError> {
        let (candidates, skipped) = validate_pool(records);
        let total = candidates.len();
        let job = Arc::new(job.clone());

        let chunk_size = total.div_ceil(self.config.workers.max(1)).max(1);
        let mut tasks = JoinSet::new();
        let mut remaining = candidates;
        while !remaining.is_empty() {
            let rest = remaining.split_off(chunk_size.min(remaining.len()));
            let chunk = std::mem::replace(&mut remaining, rest);
            let engine = self.engine.clone();
            let job = job.clone();
            let thresholds = self.thresholds;
            tasks.spawn_blocking(move || score_chunk(&engine, thresholds, &job, chunk));
        }

        let mut ranked = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let scored = joined.map_err(|err| RankingError::Worker(err.to_string()))?;
            ranked.extend(scored);
        }

        Ok(RankingRun::assemble(
            run_id::ranking_id(&job.id),
            &job,
            Utc::now(),
            ranked,
            skipped,
        ))
    }
}

fn score_chunk(
    engine: &ScoringEngine,
    thresholds: TierThresholds,
    job: &Job,
    chunk: Vec<Candidate>,
) -> Vec<RankedCandidate> {
    chunk
        .into_iter()
        .map(|candidate| {
            let evaluation = engine.score(&candidate, job);
            let tier = thresholds.classify(evaluation.match_score.total_score, &evaluation.skill_match);
            RankedCandidate::new(candidate, evaluation, tier)
        })
        .collect()
}

/// Splits records into scorable candidates and skipped defects. The first
/// record of a repeated candidate id wins.
fn validate_pool(records: Vec<CandidateRecord>) -> (Vec<Candidate>, Vec<SkippedCandidate>) {
    let mut seen = HashSet::new();
    let mut candidates = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for record in records {
        let raw_id = record.candidate_id.clone();
        match record.validate() {
            Ok(candidate) if seen.insert(candidate.id.clone()) => candidates.push(candidate),
            Ok(candidate) => {
                warn!(candidate_id = %candidate.id, "skipping duplicate candidate record");
                skipped.push(SkippedCandidate {
                    candidate_id: Some(candidate.id),
                    reason: "duplicate candidate id".to_string(),
                });
            }
            Err(defect) => {
                warn!(
                    candidate_id = raw_id.as_deref().unwrap_or("<missing>"),
                    %defect,
                    "skipping malformed candidate record"
                );
                skipped.push(SkippedCandidate {
                    candidate_id: raw_id,
                    reason: defect.to_string(),
                });
            }
        }
    }

    (candidates, skipped)
}
