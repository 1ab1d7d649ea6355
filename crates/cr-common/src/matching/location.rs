use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
pub enum LocationCompatibility {
    #[serde(rename = "Exact Match")]
    #[strum(serialize = "Exact Match")]
    ExactMatch,
    #[serde(rename = "Remote Possible")]
    #[strum(serialize = "Remote Possible")]
    RemotePossible,
    #[serde(rename = "Not Specified")]
    #[strum(serialize = "Not Specified")]
    NotSpecified,
    #[serde(rename = "Location Mismatch")]
    #[strum(serialize = "Location Mismatch")]
    LocationMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMatch {
    pub candidate_location: Option<String>,
    pub job_location: Option<String>,
    pub is_match: bool,
    pub compatibility: LocationCompatibility,
}

const REMOTE_MARKERS: &[&str] = &["remote", "anywhere"];

fn normalize_location(raw: &str) -> String {
    let folded: String = raw.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_remote(normalized: &str) -> bool {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| REMOTE_MARKERS.contains(&token))
}

/// Binary location policy: a job without a location, a remote job, or an
/// exact (case-insensitive) match is compatible; anything else is not.
pub fn evaluate_location(job_location: Option<&str>, candidate_location: Option<&str>) -> LocationMatch {
    let job = job_location
        .map(normalize_location)
        .filter(|loc| !loc.is_empty());
    let candidate = candidate_location
        .map(normalize_location)
        .filter(|loc| !loc.is_empty());

    let compatibility = match (&job, &candidate) {
        (None, _) => LocationCompatibility::NotSpecified,
        (Some(job), Some(candidate)) if job == candidate => LocationCompatibility::ExactMatch,
        (Some(job), _) if is_remote(job) => LocationCompatibility::RemotePossible,
        _ => LocationCompatibility::LocationMismatch,
    };

    LocationMatch {
        candidate_location: candidate_location.map(|loc| loc.trim().to_string()),
        job_location: job_location.map(|loc| loc.trim().to_string()),
        is_match: compatibility != LocationCompatibility::LocationMismatch,
        compatibility,
    }
}
