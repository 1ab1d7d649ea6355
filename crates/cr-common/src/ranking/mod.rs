pub mod orchestrator;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::{
    CandidateEvaluation, ExperienceMatch, LocationMatch, MatchScore, Recommendation, SalaryMatch,
    SkillMatch, candidate_flags, justification,
};
use crate::sources::SourceError;
use crate::store::StoreError;
use crate::{Candidate, Job, JobDefect};

pub use orchestrator::{JobLocks, RankingConfig, RankingOrchestrator};

const TOP_MISSING_SKILLS: usize = 3;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("job `{0}` not found")]
    JobNotFound(String),
    #[error("ranking `{0}` not found")]
    RankingNotFound(String),
    #[error("job `{job_id}` is malformed: {defect}")]
    InvalidJob { job_id: String, defect: JobDefect },
    #[error("collaborator failure: {0}")]
    Upstream(#[from] SourceError),
    #[error("ranking store failure: {0}")]
    Store(#[from] StoreError),
    #[error("ranking computation exceeded {0:?}")]
    Timeout(Duration),
    #[error("scoring worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub candidate_id: String,
    pub name: String,
    pub email: Option<String>,
    pub resume_evaluation_score: Option<f64>,
    pub match_score: MatchScore,
    pub skill_match: SkillMatch,
    pub experience_match: ExperienceMatch,
    pub location_match: LocationMatch,
    pub salary_match: SalaryMatch,
    pub recommendation: Recommendation,
    pub justification: String,
    pub red_flags: Vec<String>,
    pub green_flags: Vec<String>,
}

impl RankedCandidate {
    /// Builds an unranked entry; `rank` is assigned by [`RankingRun::assemble`].
    pub fn new(
        candidate: Candidate,
        evaluation: CandidateEvaluation,
        recommendation: Recommendation,
    ) -> Self {
        let flags = candidate_flags(&candidate, &evaluation);
        let justification = justification(&evaluation);
        let CandidateEvaluation {
            match_score,
            skill_match,
            experience_match,
            location_match,
            salary_match,
        } = evaluation;

        Self {
            rank: 0,
            candidate_id: candidate.id,
            name: candidate.name,
            email: candidate.email,
            resume_evaluation_score: candidate.resume_quality_score,
            match_score,
            skill_match,
            experience_match,
            location_match,
            salary_match,
            recommendation,
            justification,
            red_flags: flags.red,
            green_flags: flags.green,
        }
    }
}

/// A candidate record that could not be scored, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub candidate_id: Option<String>,
    pub reason: String,
}

/// One immutable ranking of a job's pool. Superseded by newer runs, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRun {
    pub ranking_id: String,
    pub job_id: String,
    pub job_title: String,
    pub job_location: Option<String>,
    pub ranked_at: DateTime<Utc>,
    pub total_candidates_evaluated: usize,
    pub ranked_candidates: Vec<RankedCandidate>,
    pub top_candidates: Vec<String>,
    pub acceptable_candidates: Vec<String>,
    pub not_recommended: Vec<String>,
    #[serde(default)]
    pub skipped_candidates: Vec<SkippedCandidate>,
    pub summary: String,
    #[serde(default)]
    pub insights: Vec<String>,
}

impl RankingRun {
    /// Sorts by total score (descending, ties by candidate id), assigns
    /// 1-based ranks, partitions by tier and derives the summary lines.
    pub fn assemble(
        ranking_id: String,
        job: &Job,
        ranked_at: DateTime<Utc>,
        mut candidates: Vec<RankedCandidate>,
        skipped: Vec<SkippedCandidate>,
    ) -> Self {
        candidates.sort_by(|a, b| {
            b.match_score
                .total_score
                .total_cmp(&a.match_score.total_score)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });

        let mut top = Vec::new();
        let mut acceptable = Vec::new();
        let mut not_recommended = Vec::new();
        for (index, candidate) in candidates.iter_mut().enumerate() {
            candidate.rank = index + 1;
            let bucket = match candidate.recommendation {
                Recommendation::HighlyRecommended => &mut top,
                Recommendation::Recommended => &mut acceptable,
                Recommendation::NotRecommended => &mut not_recommended,
            };
            bucket.push(candidate.candidate_id.clone());
        }

        let summary = if candidates.is_empty() {
            format!(
                "No eligible candidates were found for {} ({}).",
                job.role_title, job.id
            )
        } else {
            format!(
                "{} candidates evaluated. {} highly recommended, {} recommended, {} not recommended.",
                candidates.len(),
                top.len(),
                acceptable.len(),
                not_recommended.len()
            )
        };
        let insights = pool_insights(&candidates, top.len());

        Self {
            ranking_id,
            job_id: job.id.clone(),
            job_title: job.role_title.clone(),
            job_location: job.location.clone(),
            ranked_at,
            total_candidates_evaluated: candidates.len(),
            ranked_candidates: candidates,
            top_candidates: top,
            acceptable_candidates: acceptable,
            not_recommended,
            skipped_candidates: skipped,
            summary,
            insights,
        }
    }

    /// Appends the target roles found in the unfiltered pool to the summary
    /// of a run that ranked nobody.
    pub fn note_available_roles(&mut self, roles: &[String]) {
        if self.ranked_candidates.is_empty() && !roles.is_empty() {
            self.summary
                .push_str(&format!(" Candidate target roles on file: {}.", roles.join(", ")));
        }
    }
}

fn pool_insights(candidates: &[RankedCandidate], highly_recommended: usize) -> Vec<String> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut missing: HashMap<&str, usize> = HashMap::new();
    for candidate in candidates {
        for skill in &candidate.skill_match.mandatory_missing {
            *missing.entry(skill.as_str()).or_default() += 1;
        }
    }
    let mut missing: Vec<(&str, usize)> = missing.into_iter().collect();
    missing.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let total = candidates.len();
    let mut insights: Vec<String> = missing
        .into_iter()
        .take(TOP_MISSING_SKILLS)
        .map(|(skill, count)| format!("{count} of {total} candidates lack {skill}"))
        .collect();

    let average = candidates
        .iter()
        .map(|c| c.match_score.total_score)
        .sum::<f64>()
        / total as f64;
    insights.push(format!("Average match score: {average:.1}/100"));

    if highly_recommended == 0 {
        insights.push(
            "No candidate reached the Highly Recommended tier; consider widening the requirements"
                .to_string(),
        );
    }

    insights
}

/// Listing projection of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingListItem {
    pub ranking_id: String,
    pub job_id: String,
    pub job_title: String,
    pub total_candidates: usize,
    pub ranked_at: DateTime<Utc>,
}

impl From<&RankingRun> for RankingListItem {
    fn from(run: &RankingRun) -> Self {
        Self {
            ranking_id: run.ranking_id.clone(),
            job_id: run.job_id.clone(),
            job_title: run.job_title.clone(),
            total_candidates: run.total_candidates_evaluated,
            ranked_at: run.ranked_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankingOutcome {
    pub run: Arc<RankingRun>,
    /// True when a stored run was returned instead of recomputing.
    pub reused: bool,
}
