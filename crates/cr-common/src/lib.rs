pub mod db;
pub mod logging;
pub mod matching;
pub mod ranking;
pub mod run_id;
pub mod skill_normalizer;
pub mod sources;
pub mod store;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use skill_normalizer::normalize_skill;

// Records handed over by the JD-parsing and resume-parsing collaborators.

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRange {
    pub min_years: f64,
    pub max_years: f64,
}

impl ExperienceRange {
    pub fn new(min_years: f64, max_years: f64) -> Self {
        Self {
            min_years,
            max_years,
        }
    }

    pub fn contains(&self, years: f64) -> bool {
        years >= self.min_years && years <= self.max_years
    }
}

/// Salary bounds of a job. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    #[serde(default)]
    pub min: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
}

impl SalaryRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, amount: u64) -> bool {
        self.min.map_or(true, |min| amount >= min) && self.max.map_or(true, |max| amount <= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(alias = "job_title")]
    pub role_title: String,
    #[serde(default)]
    pub mandatory_skills: Vec<String>,
    #[serde(default)]
    pub good_to_have_skills: Vec<String>,
    pub experience: ExperienceRange,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<SalaryRange>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobDefect {
    #[error("job id is empty")]
    MissingId,
    #[error("experience bounds must be finite and non-negative")]
    InvalidExperience,
    #[error("experience range is inverted: min {min} > max {max}")]
    InvertedExperience { min: f64, max: f64 },
    #[error("salary range is inverted: min {min} > max {max}")]
    InvertedSalary { min: u64, max: u64 },
    #[error("skill `{0}` is listed as both mandatory and good-to-have")]
    OverlappingSkill(String),
}

impl Job {
    /// Checks the invariants the scoring function relies on.
    pub fn validate(&self) -> Result<(), JobDefect> {
        if self.id.trim().is_empty() {
            return Err(JobDefect::MissingId);
        }

        let ExperienceRange {
            min_years,
            max_years,
        } = self.experience;
        if !min_years.is_finite() || !max_years.is_finite() || min_years < 0.0 {
            return Err(JobDefect::InvalidExperience);
        }
        if min_years > max_years {
            return Err(JobDefect::InvertedExperience {
                min: min_years,
                max: max_years,
            });
        }

        if let Some(SalaryRange {
            min: Some(min),
            max: Some(max),
        }) = self.salary
        {
            if min > max {
                return Err(JobDefect::InvertedSalary { min, max });
            }
        }

        let mandatory: HashSet<String> = self
            .mandatory_skills
            .iter()
            .map(|skill| normalize_skill(skill))
            .collect();
        if let Some(overlap) = self
            .good_to_have_skills
            .iter()
            .find(|skill| mandatory.contains(&normalize_skill(skill)))
        {
            return Err(JobDefect::OverlappingSkill(overlap.trim().to_string()));
        }

        Ok(())
    }
}

/// Candidate as delivered by the resume parser. Every field may be absent;
/// [`CandidateRecord::validate`] decides whether the record can be scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(default)]
    pub candidate_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub total_experience_years: Option<f64>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub expected_salary: Option<u64>,
    #[serde(default)]
    pub resume_quality_score: Option<f64>,
    #[serde(default)]
    pub target_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateDefect {
    #[error("candidate id is missing")]
    MissingId,
    #[error("skills are missing")]
    MissingSkills,
    #[error("total experience is missing")]
    MissingExperience,
    #[error("total experience must be a finite, non-negative number of years")]
    InvalidExperience,
    #[error("resume quality score must lie within 0-100")]
    InvalidQualityScore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub experience_years: f64,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub expected_salary: Option<u64>,
    pub resume_quality_score: Option<f64>,
}

impl CandidateRecord {
    pub fn validate(self) -> Result<Candidate, CandidateDefect> {
        let id = self
            .candidate_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(CandidateDefect::MissingId)?;
        let skills = self.skills.ok_or(CandidateDefect::MissingSkills)?;
        let experience_years = self
            .total_experience_years
            .ok_or(CandidateDefect::MissingExperience)?;
        if !experience_years.is_finite() || experience_years < 0.0 {
            return Err(CandidateDefect::InvalidExperience);
        }
        if let Some(score) = self.resume_quality_score {
            if !(0.0..=100.0).contains(&score) {
                return Err(CandidateDefect::InvalidQualityScore);
            }
        }

        Ok(Candidate {
            id,
            name: self
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            email: self.email.filter(|email| !email.trim().is_empty()),
            experience_years,
            skills,
            location: self.location.filter(|loc| !loc.trim().is_empty()),
            expected_salary: self.expected_salary,
            resume_quality_score: self.resume_quality_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job {
            id: "JD-1".into(),
            role_title: "Data Engineer".into(),
            mandatory_skills: vec!["Python".into(), "SQL".into()],
            good_to_have_skills: vec!["AWS".into()],
            experience: ExperienceRange::new(2.0, 5.0),
            ..Job::default()
        }
    }

    fn record() -> CandidateRecord {
        CandidateRecord {
            candidate_id: Some("CAND-1".into()),
            name: Some("Ada".into()),
            total_experience_years: Some(3.0),
            skills: Some(vec!["python".into()]),
            ..CandidateRecord::default()
        }
    }

    #[test]
    fn valid_job_passes() {
        assert_eq!(job().validate(), Ok(()));
    }

    #[test]
    fn rejects_inverted_experience() {
        let mut job = job();
        job.experience = ExperienceRange::new(6.0, 3.0);
        assert!(matches!(
            job.validate(),
            Err(JobDefect::InvertedExperience { .. })
        ));
    }

    #[test]
    fn rejects_overlapping_skill_sets_case_insensitively() {
        let mut job = job();
        job.good_to_have_skills.push(" python ".into());
        assert_eq!(
            job.validate(),
            Err(JobDefect::OverlappingSkill("python".into()))
        );
    }

    #[test]
    fn rejects_inverted_salary() {
        let mut job = job();
        job.salary = Some(SalaryRange {
            min: Some(90),
            max: Some(60),
        });
        assert_eq!(
            job.validate(),
            Err(JobDefect::InvertedSalary { min: 90, max: 60 })
        );
    }

    #[test]
    fn record_without_skills_is_a_defect() {
        let mut record = record();
        record.skills = None;
        assert_eq!(record.validate(), Err(CandidateDefect::MissingSkills));
    }

    #[test]
    fn record_without_experience_is_a_defect() {
        let mut record = record();
        record.total_experience_years = None;
        assert_eq!(record.validate(), Err(CandidateDefect::MissingExperience));
    }

    #[test]
    fn blank_id_is_a_defect() {
        let mut record = record();
        record.candidate_id = Some("   ".into());
        assert_eq!(record.validate(), Err(CandidateDefect::MissingId));
    }

    #[test]
    fn missing_name_defaults_to_unknown() {
        let mut record = record();
        record.name = None;
        let candidate = record.validate().unwrap();
        assert_eq!(candidate.name, "Unknown");
        assert_eq!(candidate.experience_years, 3.0);
    }

    #[test]
    fn open_salary_bounds() {
        let range = SalaryRange {
            min: Some(50),
            max: None,
        };
        assert!(range.contains(1_000));
        assert!(!range.contains(10));
        assert!(SalaryRange::default().is_unbounded());
    }

    #[test]
    fn job_accepts_job_title_alias() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "JD-2",
            "job_title": "Backend Engineer",
            "experience": {"min_years": 1.0, "max_years": 3.0}
        }))
        .unwrap();
        assert_eq!(job.role_title, "Backend Engineer");
        assert!(job.mandatory_skills.is_empty());
    }
}
