//! On-disk shapes written by the JD and resume parsers, mapped onto [`Job`]
//! and [`CandidateRecord`].
//!
//! Both the flat records used throughout this crate and the parsers' nested
//! documents are accepted. For jobs that means `job_id`, top-level
//! `experience_min`/`experience_max`, `salary_min`/`salary_max` and an
//! optional `requirements` block whose `experience` may be text such as
//! `"5-10 years"`. For resumes it means `candidate_info`, `parsed_data` with
//! categorized `technical_skills`, and `evaluation.final_score`.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::{CandidateRecord, ExperienceRange, Job, SalaryRange};

/// Span assumed above the minimum when a job states only a lower bound.
const OPEN_EXPERIENCE_SPAN_YEARS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing or unreadable `{0}`")]
pub struct MissingField(pub &'static str);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExperienceField {
    Range(ExperienceRange),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LocationField {
    Text(String),
    Detail {
        #[serde(default)]
        location_type: Option<String>,
        #[serde(default)]
        city: Option<String>,
    },
}

impl LocationField {
    fn into_text(self) -> Option<String> {
        let text = match self {
            Self::Text(text) => Some(text),
            Self::Detail {
                location_type,
                city,
            } => location_type.or(city),
        };
        text.filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct Requirements {
    #[serde(default)]
    mandatory_skills: Option<Vec<String>>,
    #[serde(default)]
    good_to_have_skills: Option<Vec<String>>,
    #[serde(default)]
    experience: Option<ExperienceField>,
}

#[derive(Debug, Deserialize)]
pub struct JobDocument {
    #[serde(default, alias = "job_id")]
    id: Option<String>,
    #[serde(default, alias = "job_title")]
    role_title: Option<String>,
    #[serde(default)]
    mandatory_skills: Option<Vec<String>>,
    #[serde(default)]
    good_to_have_skills: Option<Vec<String>>,
    #[serde(default)]
    experience: Option<ExperienceField>,
    #[serde(default)]
    experience_min: Option<f64>,
    #[serde(default)]
    experience_max: Option<f64>,
    #[serde(default)]
    location: Option<LocationField>,
    #[serde(default)]
    salary: Option<SalaryRange>,
    #[serde(default)]
    salary_min: Option<u64>,
    #[serde(default)]
    salary_max: Option<u64>,
    #[serde(default)]
    requirements: Option<Requirements>,
}

impl JobDocument {
    /// `requested_id` fills in a document that carries no id of its own.
    pub fn into_job(self, requested_id: &str) -> Result<Job, MissingField> {
        let requirements = self.requirements.unwrap_or_default();

        let role_title = self
            .role_title
            .filter(|title| !title.trim().is_empty())
            .ok_or(MissingField("role_title"))?;

        let experience = match self.experience.or(requirements.experience) {
            Some(ExperienceField::Range(range)) => range,
            Some(ExperienceField::Text(text)) => {
                parse_experience_text(&text).ok_or(MissingField("experience"))?
            }
            None => match (self.experience_min, self.experience_max) {
                (Some(min), Some(max)) => ExperienceRange::new(min, max),
                (Some(min), None) => ExperienceRange::new(min, min + OPEN_EXPERIENCE_SPAN_YEARS),
                _ => return Err(MissingField("experience")),
            },
        };

        let salary = self.salary.or_else(|| {
            (self.salary_min.is_some() || self.salary_max.is_some()).then_some(SalaryRange {
                min: self.salary_min,
                max: self.salary_max,
            })
        });

        Ok(Job {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| requested_id.to_string()),
            role_title,
            mandatory_skills: self
                .mandatory_skills
                .or(requirements.mandatory_skills)
                .unwrap_or_default(),
            good_to_have_skills: self
                .good_to_have_skills
                .or(requirements.good_to_have_skills)
                .unwrap_or_default(),
            experience,
            location: self.location.and_then(LocationField::into_text),
            salary,
        })
    }
}

/// Reads `"5-10 years"`, `"3+ years"` or `"4"`. A lone lower bound gets the
/// default open span.
fn parse_experience_text(text: &str) -> Option<ExperienceRange> {
    let cleaned = text
        .to_lowercase()
        .replace("years", "")
        .replace("year", "")
        .replace("yrs", "")
        .replace('+', "");
    let mut bounds = cleaned.split(['-', '–']).map(str::trim);

    let min: f64 = bounds.next()?.parse().ok()?;
    let max = match bounds.next() {
        Some(raw) if !raw.is_empty() => raw.parse().ok()?,
        _ => min + OPEN_EXPERIENCE_SPAN_YEARS,
    };
    Some(ExperienceRange::new(min, max))
}

#[derive(Debug, Default, Deserialize)]
struct CandidateInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    target_job_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ParsedData {
    #[serde(default)]
    total_experience_years: Option<f64>,
    /// Category name to skill list. Non-list categories are ignored.
    #[serde(default)]
    technical_skills: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct Evaluation {
    #[serde(default)]
    final_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateDocument {
    #[serde(flatten)]
    record: CandidateRecord,
    #[serde(default)]
    candidate_info: Option<CandidateInfo>,
    #[serde(default)]
    parsed_data: Option<ParsedData>,
    #[serde(default)]
    evaluation: Option<Evaluation>,
}

impl CandidateDocument {
    /// Flat fields win; nested parser sections fill whatever is still absent.
    pub fn into_record(self) -> CandidateRecord {
        let mut record = self.record;

        if let Some(info) = self.candidate_info {
            record.name = record.name.or(info.name);
            record.email = record.email.or(info.email);
            record.location = record.location.or(info.location);
            record.target_role = record.target_role.or(info.target_job_title);
        }

        if let Some(parsed) = self.parsed_data {
            record.total_experience_years =
                record.total_experience_years.or(parsed.total_experience_years);
            if record.skills.is_none() {
                record.skills = parsed.technical_skills.map(flatten_skill_categories);
            }
        }

        if let Some(evaluation) = self.evaluation {
            record.resume_quality_score = record.resume_quality_score.or(evaluation.final_score);
        }

        record
    }
}

fn flatten_skill_categories(categories: BTreeMap<String, serde_json::Value>) -> Vec<String> {
    categories
        .into_values()
        .filter_map(|value| match value {
            serde_json::Value::Array(items) => Some(items),
            _ => None,
        })
        .flatten()
        .filter_map(|item| match item {
            serde_json::Value::String(skill) => Some(skill),
            _ => None,
        })
        .collect()
}
