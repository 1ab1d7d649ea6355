use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use unicode_normalization::UnicodeNormalization;

/// Alias → canonical skill name. Only consulted in [`SkillMatching::Aliased`] mode.
static ALIAS_TO_CANONICAL: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let aliases: &[(&str, &[&str])] = &[
        (
            "javascript",
            &["js", "javascript", "ecmascript", "es6", "es2015"],
        ),
        ("typescript", &["ts", "typescript"]),
        ("python", &["py", "python3", "python 3", "python"]),
        ("nodejs", &["node", "node.js", "node js", "nodejs"]),
        ("react", &["reactjs", "react.js", "react js", "react"]),
        ("vue", &["vuejs", "vue.js", "vue js", "vue"]),
        ("kubernetes", &["k8s", "kubernetes"]),
        ("postgresql", &["postgres", "postgre sql", "postgresql"]),
        ("mongodb", &["mongo", "mongo db", "mongodb"]),
        ("golang", &["go", "go lang", "golang"]),
        ("csharp", &["c#", "c sharp", "csharp"]),
        ("aws", &["amazon web services", "aws"]),
        ("gcp", &["google cloud platform", "google cloud", "gcp"]),
        ("azure", &["microsoft azure", "ms azure", "azure"]),
        ("machine learning", &["ml", "machine learning"]),
    ];

    let mut map = HashMap::new();
    for (canonical, variants) in aliases {
        for variant in *variants {
            map.insert(*variant, *canonical);
        }
    }
    map
});

/// How skill labels are compared.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SkillMatching {
    /// Case-insensitive, trimmed, exact token comparison.
    #[default]
    Exact,
    /// Exact comparison after folding common abbreviations (js, k8s, ...).
    Aliased,
}

impl SkillMatching {
    /// Reads `CR_SKILL_MATCHING` (`exact` | `aliased`), defaulting to exact.
    pub fn from_env() -> Self {
        std::env::var("CR_SKILL_MATCHING")
            .ok()
            .and_then(|raw| Self::from_str(raw.trim()).ok())
            .unwrap_or_default()
    }

    /// Comparison key of a raw skill label. Blank labels map to "".
    pub fn key(self, raw: &str) -> String {
        match self {
            SkillMatching::Exact => normalize_skill(raw),
            SkillMatching::Aliased => canonical_skill(raw),
        }
    }
}

/// NFKC, lowercase, trimmed, internal whitespace collapsed.
pub fn normalize_skill(raw: &str) -> String {
    let folded: String = raw.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn canonical_skill(raw: &str) -> String {
    let normalized = normalize_skill(raw);
    match ALIAS_TO_CANONICAL.get(normalized.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => normalized,
    }
}

/// Comparison keys of a skill list, blanks dropped.
pub fn normalize_skill_set(skills: &[String], mode: SkillMatching) -> HashSet<String> {
    skills
        .iter()
        .map(|skill| mode.key(skill))
        .filter(|key| !key.is_empty())
        .collect()
}
