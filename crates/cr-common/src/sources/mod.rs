//! Collaborators that hand the ranking engine its inputs: parsed jobs and
//! parsed candidate records.

pub mod directory;
pub mod documents;
pub mod memory;

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::{CandidateRecord, Job};

pub use directory::DirectorySource;
pub use documents::{CandidateDocument, JobDocument, MissingField};
pub use memory::MemorySource;

static JOB_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,127}$").expect("job id pattern is valid")
});

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid job id `{0}`")]
    InvalidJobId(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("incomplete document {path}: {source}")]
    Incomplete {
        path: PathBuf,
        #[source]
        source: MissingField,
    },
}

/// Ids become file names in [`DirectorySource`], so only a conservative
/// character set is accepted.
pub fn validate_job_id(job_id: &str) -> Result<(), SourceError> {
    if JOB_ID_PATTERN.is_match(job_id) && !job_id.contains("..") {
        Ok(())
    } else {
        Err(SourceError::InvalidJobId(job_id.to_string()))
    }
}

#[async_trait]
pub trait JobSource: Send + Sync {
    /// `Ok(None)` when the job is unknown.
    async fn job(&self, job_id: &str) -> Result<Option<Job>, SourceError>;
}

#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Candidate records considered for `job`, already filtered for eligibility.
    async fn eligible_candidates(&self, job: &Job) -> Result<Vec<CandidateRecord>, SourceError>;

    /// Distinct target roles across the unfiltered pool, sorted. Used to
    /// explain an empty ranking.
    async fn target_roles(&self) -> Result<Vec<String>, SourceError> {
        Ok(Vec::new())
    }
}

/// Case-insensitive containment in either direction between the job's role
/// title and the candidate's target role. Both must be non-blank, so a
/// candidate without a target role is never eligible.
pub fn role_matches(role_title: &str, target_role: Option<&str>) -> bool {
    let title = role_title.trim().to_lowercase();
    let target = target_role.unwrap_or_default().trim().to_lowercase();
    if title.is_empty() || target.is_empty() {
        return false;
    }
    title.contains(&target) || target.contains(&title)
}

pub(crate) fn distinct_roles<'a>(roles: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    roles
        .flatten()
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
