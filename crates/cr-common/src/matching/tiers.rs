use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::skills::SkillMatch;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, AsRefStr, Display,
)]
pub enum Recommendation {
    #[serde(rename = "Highly Recommended")]
    #[strum(serialize = "Highly Recommended")]
    HighlyRecommended,
    #[serde(rename = "Recommended")]
    #[strum(serialize = "Recommended")]
    Recommended,
    #[serde(rename = "Not Recommended")]
    #[strum(serialize = "Not Recommended")]
    NotRecommended,
}

/// Score and mandatory-coverage floors of each tier. Both must be met.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThresholds {
    pub highly_recommended_score: f64,
    pub highly_recommended_coverage: f64,
    pub recommended_score: f64,
    pub recommended_coverage: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            highly_recommended_score: 75.0,
            highly_recommended_coverage: 80.0,
            recommended_score: 50.0,
            recommended_coverage: 50.0,
        }
    }
}

impl TierThresholds {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            highly_recommended_score: env_percent("CR_TIER_HIGH_SCORE")
                .unwrap_or(defaults.highly_recommended_score),
            highly_recommended_coverage: env_percent("CR_TIER_HIGH_COVERAGE")
                .unwrap_or(defaults.highly_recommended_coverage),
            recommended_score: env_percent("CR_TIER_MID_SCORE")
                .unwrap_or(defaults.recommended_score),
            recommended_coverage: env_percent("CR_TIER_MID_COVERAGE")
                .unwrap_or(defaults.recommended_coverage),
        }
    }

    pub fn classify(&self, total_score: f64, skill_match: &SkillMatch) -> Recommendation {
        let coverage = skill_match.mandatory_coverage_percent;
        if total_score >= self.highly_recommended_score
            && coverage >= self.highly_recommended_coverage
        {
            Recommendation::HighlyRecommended
        } else if total_score >= self.recommended_score && coverage >= self.recommended_coverage {
            Recommendation::Recommended
        } else {
            Recommendation::NotRecommended
        }
    }
}

fn env_percent(name: &str) -> Option<f64> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|value| (0.0..=100.0).contains(value))
}

/// Classifies with the default thresholds.
pub fn classify(total_score: f64, skill_match: &SkillMatch) -> Recommendation {
    TierThresholds::default().classify(total_score, skill_match)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(mandatory: f64) -> SkillMatch {
        SkillMatch {
            mandatory_matched: vec![],
            mandatory_missing: vec![],
            mandatory_coverage_percent: mandatory,
            good_to_have_matched: vec![],
            good_to_have_missing: vec![],
            good_to_have_coverage_percent: 0.0,
        }
    }

    #[test]
    fn high_score_with_full_coverage_is_highly_recommended() {
        assert_eq!(classify(100.0, &coverage(100.0)), Recommendation::HighlyRecommended);
        assert_eq!(classify(75.0, &coverage(80.0)), Recommendation::HighlyRecommended);
    }

    #[test]
    fn high_score_with_weak_coverage_drops_a_tier() {
        assert_eq!(classify(90.0, &coverage(60.0)), Recommendation::Recommended);
    }

    #[test]
    fn below_both_floors_is_not_recommended() {
        assert_eq!(classify(47.5, &coverage(50.0)), Recommendation::NotRecommended);
        assert_eq!(classify(70.0, &coverage(40.0)), Recommendation::NotRecommended);
    }

    #[test]
    fn custom_thresholds_apply() {
        let strict = TierThresholds {
            highly_recommended_score: 90.0,
            ..TierThresholds::default()
        };
        assert_eq!(strict.classify(85.0, &coverage(100.0)), Recommendation::Recommended);
    }

    #[test]
    fn recommendation_serializes_as_label() {
        let json = serde_json::to_string(&Recommendation::HighlyRecommended).unwrap();
        assert_eq!(json, "\"Highly Recommended\"");
        assert_eq!(Recommendation::NotRecommended.as_ref(), "Not Recommended");
    }
}
