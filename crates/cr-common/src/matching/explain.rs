//! Human-readable reasoning attached to each ranked candidate.

use serde::{Deserialize, Serialize};

use super::scoring::{CandidateEvaluation, ExperienceAlignment, SalaryAlignment};
use crate::Candidate;

const STRONG_GOOD_TO_HAVE_COVERAGE: f64 = 50.0;
const HIGH_RESUME_QUALITY: f64 = 80.0;
const LOW_RESUME_QUALITY: f64 = 50.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFlags {
    pub red: Vec<String>,
    pub green: Vec<String>,
}

pub fn candidate_flags(candidate: &Candidate, evaluation: &CandidateEvaluation) -> CandidateFlags {
    let mut flags = CandidateFlags::default();
    let skills = &evaluation.skill_match;

    if skills.mandatory_missing.is_empty() {
        flags.green.push("Has all mandatory skills".to_string());
    } else {
        flags.red.push(format!(
            "Missing mandatory skills: {}",
            skills.mandatory_missing.join(", ")
        ));
    }

    if !skills.good_to_have_matched.is_empty()
        && skills.good_to_have_coverage_percent >= STRONG_GOOD_TO_HAVE_COVERAGE
    {
        flags.green.push(format!(
            "Strong optional skills: {}",
            skills.good_to_have_matched.join(", ")
        ));
    }

    let experience = &evaluation.experience_match;
    match experience.alignment {
        ExperienceAlignment::PerfectMatch => flags.green.push(format!(
            "Experience fits the {}-{} year range",
            experience.required_min, experience.required_max
        )),
        ExperienceAlignment::BelowRange => flags.red.push(format!(
            "Slightly under-experienced ({} years)",
            experience.candidate_years
        )),
        ExperienceAlignment::AboveRange => flags.red.push(format!(
            "Possibly overqualified ({} years)",
            experience.candidate_years
        )),
        ExperienceAlignment::OutOfRange => flags.red.push(format!(
            "Experience far outside the {}-{} year range",
            experience.required_min, experience.required_max
        )),
    }

    if evaluation.location_match.is_match {
        flags.green.push(format!(
            "Location compatible ({})",
            evaluation.location_match.compatibility
        ));
    } else {
        flags.red.push(format!(
            "Location mismatch: {}",
            evaluation
                .location_match
                .candidate_location
                .as_deref()
                .unwrap_or("unknown")
        ));
    }

    match evaluation.salary_match.alignment {
        SalaryAlignment::AboveRange => flags
            .red
            .push("Salary expectation above the offered range".to_string()),
        SalaryAlignment::BelowRange => flags
            .red
            .push("Salary expectation below the offered range".to_string()),
        SalaryAlignment::WithinRange | SalaryAlignment::Unknown => {}
    }

    match candidate.resume_quality_score {
        Some(score) if score >= HIGH_RESUME_QUALITY => {
            flags.green.push(format!("High resume quality ({score:.0}/100)"))
        }
        Some(score) if score < LOW_RESUME_QUALITY => {
            flags.red.push(format!("Low resume quality ({score:.0}/100)"))
        }
        _ => {}
    }

    flags
}

/// `Score: X/100. Skills: A% mandatory, B% good-to-have. Experience: <alignment>.`
pub fn justification(evaluation: &CandidateEvaluation) -> String {
    format!(
        "Score: {:.1}/100. Skills: {:.0}% mandatory, {:.0}% good-to-have. Experience: {}.",
        evaluation.match_score.total_score,
        evaluation.skill_match.mandatory_coverage_percent,
        evaluation.skill_match.good_to_have_coverage_percent,
        evaluation.experience_match.alignment,
    )
}
