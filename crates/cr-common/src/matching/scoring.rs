use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::{
    location::{LocationMatch, evaluate_location},
    skills::{SkillCoverage, SkillMatch, match_skills},
    weights::{COMPONENT_WEIGHTS, ComponentWeights},
};
use crate::skill_normalizer::SkillMatching;
use crate::{Candidate, ExperienceRange, Job};

const DEFAULT_BELOW_RANGE_DECAY_YEARS: f64 = 2.0;
const DEFAULT_ABOVE_RANGE_DECAY_YEARS: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub weights: ComponentWeights,
    pub skill_matching: SkillMatching,
    /// Years under the minimum at which the experience score reaches 0.
    pub below_range_decay_years: f64,
    /// Years over the maximum at which the experience score reaches 0.
    pub above_range_decay_years: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weights: COMPONENT_WEIGHTS,
            skill_matching: SkillMatching::Exact,
            below_range_decay_years: DEFAULT_BELOW_RANGE_DECAY_YEARS,
            above_range_decay_years: DEFAULT_ABOVE_RANGE_DECAY_YEARS,
        }
    }
}

impl MatchingConfig {
    pub fn from_env() -> Self {
        Self {
            weights: COMPONENT_WEIGHTS,
            skill_matching: SkillMatching::from_env(),
            below_range_decay_years: env_positive_f64("CR_EXPERIENCE_BELOW_DECAY_YEARS")
                .unwrap_or(DEFAULT_BELOW_RANGE_DECAY_YEARS),
            above_range_decay_years: env_positive_f64("CR_EXPERIENCE_ABOVE_DECAY_YEARS")
                .unwrap_or(DEFAULT_ABOVE_RANGE_DECAY_YEARS),
        }
    }
}

fn env_positive_f64(name: &str) -> Option<f64> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub mandatory_skills_score: f64,
    pub good_to_have_skills_score: f64,
    pub experience_score: f64,
    pub location_score: f64,
    pub salary_score: f64,
    pub total_score: f64,
}

impl MatchScore {
    pub fn from_components(
        mandatory_skills_score: f64,
        good_to_have_skills_score: f64,
        experience_score: f64,
        location_score: f64,
        salary_score: f64,
    ) -> Self {
        let total = mandatory_skills_score
            + good_to_have_skills_score
            + experience_score
            + location_score
            + salary_score;

        Self {
            mandatory_skills_score,
            good_to_have_skills_score,
            experience_score,
            location_score,
            salary_score,
            total_score: total.clamp(0.0, 100.0),
        }
    }

    pub fn component_sum(&self) -> f64 {
        self.mandatory_skills_score
            + self.good_to_have_skills_score
            + self.experience_score
            + self.location_score
            + self.salary_score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
pub enum ExperienceAlignment {
    #[serde(rename = "Perfect Match")]
    #[strum(serialize = "Perfect Match")]
    PerfectMatch,
    #[serde(rename = "Above Range")]
    #[strum(serialize = "Above Range")]
    AboveRange,
    #[serde(rename = "Below Range")]
    #[strum(serialize = "Below Range")]
    BelowRange,
    #[serde(rename = "Out of Range")]
    #[strum(serialize = "Out of Range")]
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceMatch {
    pub candidate_years: f64,
    pub required_min: f64,
    pub required_max: f64,
    pub alignment: ExperienceAlignment,
    pub alignment_notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
pub enum SalaryAlignment {
    #[serde(rename = "Within Range")]
    #[strum(serialize = "Within Range")]
    WithinRange,
    #[serde(rename = "Below Range")]
    #[strum(serialize = "Below Range")]
    BelowRange,
    #[serde(rename = "Above Range")]
    #[strum(serialize = "Above Range")]
    AboveRange,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryMatch {
    pub candidate_expected: Option<u64>,
    pub job_min: Option<u64>,
    pub job_max: Option<u64>,
    pub alignment: SalaryAlignment,
}

/// Everything the scoring function derives for one (candidate, job) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEvaluation {
    pub match_score: MatchScore,
    pub skill_match: SkillMatch,
    pub experience_match: ExperienceMatch,
    pub location_match: LocationMatch,
    pub salary_match: SalaryMatch,
}

/// Scores with the default configuration.
pub fn score_candidate(candidate: &Candidate, job: &Job) -> CandidateEvaluation {
    ScoringEngine::new(MatchingConfig::default()).score(candidate, job)
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: MatchingConfig,
}

impl ScoringEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Weighted multi-factor score. Pure: identical inputs give identical output.
    pub fn score(&self, candidate: &Candidate, job: &Job) -> CandidateEvaluation {
        let weights = self.config.weights;

        let (mandatory, good_to_have) = self.score_skills(candidate, job);
        let mandatory_score = mandatory.coverage_percent / 100.0 * weights.mandatory_skills;
        let good_to_have_score = good_to_have.coverage_percent / 100.0 * weights.good_to_have_skills;

        let (experience_factor, experience_match) =
            self.score_experience(candidate.experience_years, job.experience);
        let location_match =
            evaluate_location(job.location.as_deref(), candidate.location.as_deref());
        let salary_match = self.score_salary(candidate, job);

        let location_score = if location_match.is_match {
            weights.location
        } else {
            0.0
        };
        let salary_score = match salary_match.alignment {
            SalaryAlignment::WithinRange | SalaryAlignment::Unknown => weights.salary,
            SalaryAlignment::BelowRange | SalaryAlignment::AboveRange => 0.0,
        };

        let match_score = MatchScore::from_components(
            mandatory_score,
            good_to_have_score,
            experience_factor * weights.experience,
            location_score,
            salary_score,
        );

        CandidateEvaluation {
            match_score,
            skill_match: SkillMatch::new(mandatory, good_to_have),
            experience_match,
            location_match,
            salary_match,
        }
    }

    fn score_skills(&self, candidate: &Candidate, job: &Job) -> (SkillCoverage, SkillCoverage) {
        let mode = self.config.skill_matching;
        (
            match_skills(&job.mandatory_skills, &candidate.skills, mode),
            match_skills(&job.good_to_have_skills, &candidate.skills, mode),
        )
    }

    /// Returns the share (0.0–1.0) of the experience component earned.
    fn score_experience(&self, years: f64, range: ExperienceRange) -> (f64, ExperienceMatch) {
        let ExperienceRange {
            min_years,
            max_years,
        } = range;

        let (factor, alignment, notes) = if range.contains(years) {
            (
                1.0,
                ExperienceAlignment::PerfectMatch,
                format!("{years} years within the {min_years}-{max_years} year requirement"),
            )
        } else if years < min_years {
            let gap = min_years - years;
            let factor = decay(gap, self.config.below_range_decay_years);
            if factor > 0.0 {
                (
                    factor,
                    ExperienceAlignment::BelowRange,
                    format!("{years} years, {gap} below the {min_years} year minimum"),
                )
            } else {
                (
                    0.0,
                    ExperienceAlignment::OutOfRange,
                    format!("{years} years, far below the {min_years} year minimum"),
                )
            }
        } else {
            let excess = years - max_years;
            let factor = decay(excess, self.config.above_range_decay_years);
            if factor > 0.0 {
                (
                    factor,
                    ExperienceAlignment::AboveRange,
                    format!("{years} years, {excess} above the {max_years} year maximum"),
                )
            } else {
                (
                    0.0,
                    ExperienceAlignment::OutOfRange,
                    format!("{years} years, far above the {max_years} year maximum"),
                )
            }
        };

        (
            factor,
            ExperienceMatch {
                candidate_years: years,
                required_min: min_years,
                required_max: max_years,
                alignment,
                alignment_notes: notes,
            },
        )
    }

    fn score_salary(&self, candidate: &Candidate, job: &Job) -> SalaryMatch {
        let range = job.salary.unwrap_or_default();
        let alignment = match candidate.expected_salary {
            None => SalaryAlignment::Unknown,
            Some(_) if range.is_unbounded() => SalaryAlignment::Unknown,
            Some(expected) if range.contains(expected) => SalaryAlignment::WithinRange,
            Some(expected) if range.min.is_some_and(|min| expected < min) => {
                SalaryAlignment::BelowRange
            }
            Some(_) => SalaryAlignment::AboveRange,
        };

        SalaryMatch {
            candidate_expected: candidate.expected_salary,
            job_min: range.min,
            job_max: range.max,
            alignment,
        }
    }
}

/// Linear decay from 1.0 at distance 0 to 0.0 at `span`; never negative.
fn decay(distance: f64, span: f64) -> f64 {
    if span <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / span).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SalaryRange;
    use crate::matching::location::LocationCompatibility;
    use proptest::prelude::*;

    fn job() -> Job {
        Job {
            id: "JD-2025-001".into(),
            role_title: "Data Engineer".into(),
            mandatory_skills: vec!["Python".into(), "SQL".into()],
            good_to_have_skills: vec!["AWS".into()],
            experience: ExperienceRange::new(2.0, 5.0),
            location: Some("Remote".into()),
            salary: None,
        }
    }

    fn candidate(id: &str, skills: &[&str], years: f64, location: &str) -> Candidate {
        Candidate {
            id: id.into(),
            name: id.into(),
            email: None,
            experience_years: years,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            location: Some(location.into()),
            expected_salary: None,
            resume_quality_score: None,
        }
    }

    #[test]
    fn complete_candidate_scores_full_marks() {
        let eval = score_candidate(
            &candidate("A", &["Python", "SQL", "AWS"], 3.0, "Remote"),
            &job(),
        );

        assert_eq!(eval.skill_match.mandatory_coverage_percent, 100.0);
        assert_eq!(eval.skill_match.good_to_have_coverage_percent, 100.0);
        assert_eq!(eval.match_score.mandatory_skills_score, 40.0);
        assert_eq!(eval.match_score.good_to_have_skills_score, 20.0);
        assert_eq!(eval.match_score.experience_score, 25.0);
        assert_eq!(eval.match_score.location_score, 10.0);
        assert_eq!(eval.match_score.salary_score, 5.0);
        assert_eq!(eval.match_score.total_score, 100.0);
        assert_eq!(eval.experience_match.alignment, ExperienceAlignment::PerfectMatch);
    }

    #[test]
    fn partial_candidate_scores_below_fifty() {
        let eval = score_candidate(&candidate("B", &["Python"], 1.0, "Paris"), &job());

        assert_eq!(eval.skill_match.mandatory_coverage_percent, 50.0);
        assert_eq!(eval.match_score.mandatory_skills_score, 20.0);
        assert_eq!(eval.match_score.good_to_have_skills_score, 0.0);
        assert!(eval.match_score.experience_score > 0.0);
        assert!(eval.match_score.experience_score < 25.0);
        assert_eq!(eval.experience_match.alignment, ExperienceAlignment::BelowRange);
        // Remote job: location is not held against the candidate.
        assert_eq!(eval.match_score.location_score, 10.0);
        assert_eq!(eval.match_score.salary_score, 5.0);
        assert!((eval.match_score.total_score - 47.5).abs() < 1e-9);
    }

    #[test]
    fn experience_decays_linearly_and_floors_at_zero() {
        let engine = ScoringEngine::default();
        let range = ExperienceRange::new(4.0, 6.0);

        let (one_below, _) = engine.score_experience(3.0, range);
        assert!((one_below - 0.5).abs() < 1e-9);

        let (far_below, far) = engine.score_experience(0.0, range);
        assert_eq!(far_below, 0.0);
        assert_eq!(far.alignment, ExperienceAlignment::OutOfRange);

        let (two_above, above) = engine.score_experience(8.0, range);
        assert!((two_above - 0.6).abs() < 1e-9);
        assert_eq!(above.alignment, ExperienceAlignment::AboveRange);

        let (way_above, _) = engine.score_experience(30.0, range);
        assert_eq!(way_above, 0.0);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let engine = ScoringEngine::default();
        let range = ExperienceRange::new(2.0, 5.0);
        assert_eq!(engine.score_experience(2.0, range).0, 1.0);
        assert_eq!(engine.score_experience(5.0, range).0, 1.0);
    }

    #[test]
    fn onsite_mismatch_loses_location_points() {
        let mut job = job();
        job.location = Some("Berlin".into());
        let eval = score_candidate(&candidate("C", &["Python", "SQL"], 3.0, "Paris"), &job);
        assert_eq!(eval.match_score.location_score, 0.0);
        assert_eq!(
            eval.location_match.compatibility,
            LocationCompatibility::LocationMismatch
        );
    }

    #[test]
    fn salary_outside_range_scores_zero() {
        let mut job = job();
        job.salary = Some(SalaryRange {
            min: Some(60_000),
            max: Some(90_000),
        });
        let mut expensive = candidate("D", &["Python"], 3.0, "Remote");
        expensive.expected_salary = Some(120_000);
        let eval = score_candidate(&expensive, &job);
        assert_eq!(eval.match_score.salary_score, 0.0);
        assert_eq!(eval.salary_match.alignment, SalaryAlignment::AboveRange);

        expensive.expected_salary = Some(70_000);
        let eval = score_candidate(&expensive, &job);
        assert_eq!(eval.match_score.salary_score, 5.0);
        assert_eq!(eval.salary_match.alignment, SalaryAlignment::WithinRange);

        expensive.expected_salary = Some(10_000);
        let eval = score_candidate(&expensive, &job);
        assert_eq!(eval.salary_match.alignment, SalaryAlignment::BelowRange);
    }

    #[test]
    fn unknown_salary_gets_full_points() {
        let mut job = job();
        job.salary = Some(SalaryRange {
            min: Some(60_000),
            max: None,
        });
        let eval = score_candidate(&candidate("E", &[], 3.0, "Remote"), &job);
        assert_eq!(eval.salary_match.alignment, SalaryAlignment::Unknown);
        assert_eq!(eval.match_score.salary_score, 5.0);
    }

    #[test]
    fn empty_mandatory_set_is_fully_covered() {
        let mut job = job();
        job.mandatory_skills.clear();
        let eval = score_candidate(&candidate("F", &[], 3.0, "Remote"), &job);
        assert_eq!(eval.skill_match.mandatory_coverage_percent, 100.0);
        assert_eq!(eval.match_score.mandatory_skills_score, 40.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let engine = ScoringEngine::default();
        let c = candidate("G", &["sql", "aws"], 7.5, "Lyon");
        assert_eq!(engine.score(&c, &job()), engine.score(&c, &job()));
    }

    #[test]
    fn components_sum_to_total() {
        let eval = score_candidate(&candidate("H", &["SQL"], 6.0, "Remote"), &job());
        let score = eval.match_score;
        assert!((score.component_sum() - score.total_score).abs() < 1e-9);
    }

    #[test]
    fn custom_decay_changes_experience_share() {
        let engine = ScoringEngine::new(MatchingConfig {
            below_range_decay_years: 4.0,
            ..MatchingConfig::default()
        });
        let (factor, _) = engine.score_experience(1.0, ExperienceRange::new(2.0, 5.0));
        assert!((factor - 0.75).abs() < 1e-9);
    }

    fn skill_pool() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(
            prop::sample::select(vec!["Python", "SQL", "AWS", "Rust", "Go", "Spark"]),
            0..6,
        )
        .prop_map(|skills| skills.into_iter().map(String::from).collect())
    }

    proptest! {
        #[test]
        fn total_is_bounded_and_equals_component_sum(
            skills in skill_pool(),
            years in 0.0f64..40.0,
            min in 0.0f64..10.0,
            width in 0.0f64..10.0,
            salary in prop::option::of(0u64..200_000),
        ) {
            let mut job = job();
            job.experience = ExperienceRange::new(min, min + width);
            job.location = Some("Berlin".into());
            job.salary = Some(SalaryRange { min: Some(50_000), max: Some(120_000) });

            let mut c = candidate("P", &[], years, "Paris");
            c.skills = skills;
            c.expected_salary = salary;

            let score = score_candidate(&c, &job).match_score;
            prop_assert!((0.0..=100.0).contains(&score.total_score));
            prop_assert!((score.component_sum() - score.total_score).abs() < 1e-9);
            prop_assert!((0.0..=25.0).contains(&score.experience_score));
        }

        #[test]
        fn adding_a_mandatory_skill_never_lowers_the_score(
            skills in skill_pool(),
            years in 0.0f64..15.0,
        ) {
            let job = job();
            let mut before = candidate("Q", &[], years, "Remote");
            before.skills = skills;
            let mut after = before.clone();
            after.skills.push("SQL".into());

            let engine = ScoringEngine::default();
            prop_assert!(
                engine.score(&after, &job).match_score.total_score
                    >= engine.score(&before, &job).match_score.total_score
            );
        }
    }
}
