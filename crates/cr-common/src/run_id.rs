//! Ranking identifiers.
//!
//! A ranking id is `RANK-{job_id}-{ULID}`. ULIDs sort lexicographically by
//! creation time, so ids minted for the same job order by recency and two
//! runs produced within the same second never collide.

use ulid::Ulid;

const PREFIX: &str = "RANK";

/// Generates a fresh ULID.
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}

/// Mints a new ranking id for `job_id`.
pub fn ranking_id(job_id: &str) -> String {
    format!("{PREFIX}-{job_id}-{}", generate())
}
