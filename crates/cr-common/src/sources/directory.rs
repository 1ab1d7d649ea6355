use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::documents::{CandidateDocument, JobDocument};
use super::{CandidateSource, JobSource, SourceError, distinct_roles, role_matches, validate_job_id};
use crate::{CandidateRecord, Job};

const JOBS_DIR: &str = "parsed_jds";
const RESUMES_DIR: &str = "parsed_resumes";
const RESUME_PREFIX: &str = "CAND-";

/// Reads the JSON documents the parsing collaborators leave on disk:
/// `<root>/parsed_jds/<job_id>.json` and `<root>/parsed_resumes/CAND-*.json`.
/// Both flat records and the parsers' nested documents are understood, see
/// [`super::documents`].
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn job_path(&self, job_id: &str) -> PathBuf {
        self.root.join(JOBS_DIR).join(format!("{job_id}.json"))
    }

    /// Every readable resume document, in file name order.
    async fn load_pool(&self) -> Result<Vec<CandidateRecord>, SourceError> {
        let dir = self.root.join(RESUMES_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %dir.display(), "resume directory missing; pool is empty");
                return Ok(Vec::new());
            }
            Err(source) => return Err(SourceError::Io { path: dir, source }),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| SourceError::Io {
                path: dir.clone(),
                source,
            })?
        {
            let path = entry.path();
            if is_resume_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut pool = Vec::with_capacity(paths.len());
        for path in paths {
            match read_record(&path).await {
                Ok(record) => pool.push(record),
                Err(err) => warn!(error = %err, "skipping unreadable candidate file"),
            }
        }
        Ok(pool)
    }
}

fn is_resume_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(RESUME_PREFIX))
}

#[async_trait]
impl JobSource for DirectorySource {
    #[instrument(skip(self))]
    async fn job(&self, job_id: &str) -> Result<Option<Job>, SourceError> {
        validate_job_id(job_id)?;
        let path = self.job_path(job_id);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SourceError::Io { path, source }),
        };

        let document: JobDocument = match serde_json::from_slice(&bytes) {
            Ok(document) => document,
            Err(source) => return Err(SourceError::Parse { path, source }),
        };
        document
            .into_job(job_id)
            .map(Some)
            .map_err(|source| SourceError::Incomplete { path, source })
    }
}

#[async_trait]
impl CandidateSource for DirectorySource {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn eligible_candidates(&self, job: &Job) -> Result<Vec<CandidateRecord>, SourceError> {
        let pool = self.load_pool().await?;
        let total = pool.len();
        let eligible: Vec<CandidateRecord> = pool
            .into_iter()
            .filter(|record| role_matches(&job.role_title, record.target_role.as_deref()))
            .collect();
        debug!(total, eligible = eligible.len(), "filtered candidate pool by target role");
        Ok(eligible)
    }

    async fn target_roles(&self) -> Result<Vec<String>, SourceError> {
        let pool = self.load_pool().await?;
        Ok(distinct_roles(
            pool.iter().map(|record| record.target_role.as_deref()),
        ))
    }
}

async fn read_record(path: &Path) -> Result<CandidateRecord, SourceError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: CandidateDocument =
        serde_json::from_slice(&bytes).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut record = document.into_record();
    // Resume files are named after the candidate they describe.
    if record.candidate_id.is_none() {
        record.candidate_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn seeded() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "parsed_jds/JD-1.json",
            r#"{
                "id": "JD-1",
                "job_title": "Data Engineer",
                "mandatory_skills": ["Python", "SQL"],
                "good_to_have_skills": ["AWS"],
                "experience": {"min_years": 2.0, "max_years": 5.0},
                "location": "Remote"
            }"#,
        );
        write(
            dir.path(),
            "parsed_resumes/CAND-b.json",
            r#"{"candidate_id": "B", "skills": ["Python"], "total_experience_years": 1.0, "target_role": "Data Engineer"}"#,
        );
        write(
            dir.path(),
            "parsed_resumes/CAND-a.json",
            r#"{"candidate_id": "A", "skills": ["SQL"], "total_experience_years": 4.0, "target_role": "Senior Data Engineer"}"#,
        );
        write(
            dir.path(),
            "parsed_resumes/CAND-designer.json",
            r#"{"candidate_id": "D", "skills": [], "total_experience_years": 4.0, "target_role": "Designer"}"#,
        );
        write(
            dir.path(),
            "parsed_resumes/CAND-untargeted.json",
            r#"{"candidate_id": "U", "skills": ["Python"], "total_experience_years": 2.0}"#,
        );
        write(dir.path(), "parsed_resumes/CAND-broken.json", "{ not json");
        write(
            dir.path(),
            "parsed_resumes/summary.json",
            r#"{"candidate_id": "S", "skills": ["Python"], "total_experience_years": 2.0, "target_role": "Data Engineer"}"#,
        );
        write(dir.path(), "parsed_resumes/notes.txt", "ignored");
        dir
    }

    #[tokio::test]
    async fn loads_job_by_id() {
        let dir = seeded();
        let source = DirectorySource::new(dir.path());

        let job = source.job("JD-1").await.unwrap().unwrap();
        assert_eq!(job.role_title, "Data Engineer");
        assert_eq!(job.location.as_deref(), Some("Remote"));
        assert!(source.job("JD-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_traversal_ids() {
        let dir = seeded();
        let source = DirectorySource::new(dir.path());
        assert!(matches!(
            source.job("../secrets").await,
            Err(SourceError::InvalidJobId(_))
        ));
    }

    #[tokio::test]
    async fn malformed_job_file_is_a_parse_error() {
        let dir = seeded();
        write(dir.path(), "parsed_jds/JD-2.json", "{ not json");
        let source = DirectorySource::new(dir.path());
        assert!(matches!(
            source.job("JD-2").await,
            Err(SourceError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn pool_skips_broken_and_ineligible_files_in_name_order() {
        let dir = seeded();
        let source = DirectorySource::new(dir.path());
        let job = source.job("JD-1").await.unwrap().unwrap();

        let ids: Vec<_> = source
            .eligible_candidates(&job)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|record| record.candidate_id)
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn missing_resume_directory_is_an_empty_pool() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        let job = Job {
            id: "JD-1".into(),
            role_title: "Data Engineer".into(),
            ..Job::default()
        };
        assert!(source.eligible_candidates(&job).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn job_without_experience_is_incomplete() {
        let dir = seeded();
        write(
            dir.path(),
            "parsed_jds/JD-3.json",
            r#"{"job_id": "JD-3", "role_title": "Analyst"}"#,
        );
        let source = DirectorySource::new(dir.path());
        assert!(matches!(
            source.job("JD-3").await,
            Err(SourceError::Incomplete { .. })
        ));
    }

    #[tokio::test]
    async fn reads_parser_documents_into_a_scorable_pool() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "parsed_jds/JD-2025-001.json",
            r#"{
                "job_id": "JD-2025-001",
                "role_title": "Data Engineer",
                "experience_min": 2,
                "experience_max": 5,
                "location": "Remote",
                "relocation_allowed": false,
                "salary_min": null,
                "salary_max": null,
                "mandatory_skills": ["Python", "SQL"],
                "good_to_have_skills": ["AWS"],
                "profile_type": "Technical"
            }"#,
        );
        write(
            dir.path(),
            "parsed_resumes/CAND-2025-00001.json",
            r#"{
                "candidate_info": {
                    "name": "Asha Rao",
                    "email": "asha@example.com",
                    "location": "Pune",
                    "target_job_title": "Senior Data Engineer"
                },
                "parsed_data": {
                    "total_experience_years": 3.5,
                    "technical_skills": {
                        "programming_languages": ["Python", "SQL"],
                        "cloud_platforms": ["AWS"]
                    }
                },
                "evaluation": {"final_score": 78}
            }"#,
        );
        write(
            dir.path(),
            "parsed_resumes/CAND-2025-00002.json",
            r#"{
                "candidate_id": "CAND-2025-00002",
                "candidate_info": {"name": "Li Wei", "target_job_title": "Product Designer"},
                "parsed_data": {"total_experience_years": 6, "technical_skills": {"tools": ["Figma"]}}
            }"#,
        );
        let source = DirectorySource::new(dir.path());

        let job = source.job("JD-2025-001").await.unwrap().unwrap();
        assert_eq!(job.validate(), Ok(()));
        assert_eq!(job.salary, None);

        let pool = source.eligible_candidates(&job).await.unwrap();
        assert_eq!(pool.len(), 1);
        let candidate = pool.into_iter().next().unwrap().validate().unwrap();
        assert_eq!(candidate.id, "CAND-2025-00001");
        assert_eq!(candidate.name, "Asha Rao");
        assert_eq!(candidate.experience_years, 3.5);
        assert_eq!(candidate.skills.len(), 3);
        assert_eq!(candidate.resume_quality_score, Some(78.0));

        assert_eq!(
            source.target_roles().await.unwrap(),
            vec!["Product Designer", "Senior Data Engineer"]
        );
    }
}
