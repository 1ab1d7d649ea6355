pub mod explain;
pub mod location;
pub mod scoring;
pub mod skills;
pub mod tiers;
pub mod weights;

pub use explain::{CandidateFlags, candidate_flags, justification};
pub use location::{LocationCompatibility, LocationMatch, evaluate_location};
pub use scoring::{
    CandidateEvaluation, ExperienceAlignment, ExperienceMatch, MatchScore, MatchingConfig,
    SalaryAlignment, SalaryMatch, ScoringEngine, score_candidate,
};
pub use skills::{SkillCoverage, SkillMatch, match_skills};
pub use tiers::{Recommendation, TierThresholds, classify};
pub use weights::{COMPONENT_WEIGHTS, ComponentWeights};
