use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::skill_normalizer::{SkillMatching, normalize_skill_set};

/// Result of comparing one required skill set against a candidate's skills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCoverage {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub coverage_percent: f64,
}

impl SkillCoverage {
    pub fn required_count(&self) -> usize {
        self.matched.len() + self.missing.len()
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Matched / missing split of `required` against `possessed`.
///
/// Labels keep the job's spelling and declared order; a requirement repeated
/// under another casing counts once. An empty requirement set is fully
/// covered (100%).
pub fn match_skills(required: &[String], possessed: &[String], mode: SkillMatching) -> SkillCoverage {
    let possessed = normalize_skill_set(possessed, mode);

    let mut seen = HashSet::new();
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for skill in required {
        let key = mode.key(skill);
        if key.is_empty() || !seen.insert(key.clone()) {
            continue;
        }

        let label = skill.trim().to_string();
        if possessed.contains(&key) {
            matched.push(label);
        } else {
            missing.push(label);
        }
    }

    let required_count = matched.len() + missing.len();
    let coverage_percent = if required_count == 0 {
        100.0
    } else {
        matched.len() as f64 * 100.0 / required_count as f64
    };

    SkillCoverage {
        matched,
        missing,
        coverage_percent,
    }
}

/// Mandatory and good-to-have coverage of one candidate, in the shape the
/// ranking document exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub mandatory_matched: Vec<String>,
    pub mandatory_missing: Vec<String>,
    pub mandatory_coverage_percent: f64,
    pub good_to_have_matched: Vec<String>,
    pub good_to_have_missing: Vec<String>,
    pub good_to_have_coverage_percent: f64,
}

impl SkillMatch {
    pub fn new(mandatory: SkillCoverage, good_to_have: SkillCoverage) -> Self {
        Self {
            mandatory_matched: mandatory.matched,
            mandatory_missing: mandatory.missing,
            mandatory_coverage_percent: mandatory.coverage_percent,
            good_to_have_matched: good_to_have.matched,
            good_to_have_missing: good_to_have.missing,
            good_to_have_coverage_percent: good_to_have.coverage_percent,
        }
    }
}
