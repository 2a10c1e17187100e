//! Job bookkeeping: status, progress and results of a pipeline run.
//!
//! The pipeline only sees the [`JobRepository`] trait; callers pick the
//! in-memory store or the directory-backed one.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::JobError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

/// Short description of one produced clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSummary {
    pub number: usize,
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    /// Percentage, 0 to 100
    pub progress: u8,
    pub current_step: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub clips: Vec<ClipSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    Progress { step: String, progress: u8 },
    Warning(String),
    Complete { clips: Vec<ClipSummary> },
    Fail { message: String },
}

impl JobUpdate {
    pub fn progress(step: impl Into<String>, progress: u8) -> Self {
        JobUpdate::Progress {
            step: step.into(),
            progress,
        }
    }
}

impl JobRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Processing,
            progress: 0,
            current_step: "queued".to_string(),
            warnings: Vec::new(),
            clips: Vec::new(),
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != JobStatus::Processing
    }

    /// Fold an update into the record. Finished jobs only accept warnings.
    pub fn apply(&mut self, update: JobUpdate) {
        if self.is_finished() && !matches!(update, JobUpdate::Warning(_)) {
            warn!(job = %self.id, status = ?self.status, "ignoring update to finished job");
            return;
        }
        match update {
            JobUpdate::Progress { step, progress } => {
                self.current_step = step;
                self.progress = progress.min(100);
            }
            JobUpdate::Warning(message) => self.warnings.push(message),
            JobUpdate::Complete { clips } => {
                self.status = JobStatus::Completed;
                self.progress = 100;
                self.current_step = "completed".to_string();
                self.clips = clips;
            }
            JobUpdate::Fail { message } => {
                self.status = JobStatus::Failed;
                self.current_step = "failed".to_string();
                self.error = Some(message);
            }
        }
    }
}

/// Job ids name a directory, so they must be a single plain path component
pub fn check_job_id(id: &str) -> Result<(), JobError> {
    let plain = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(|c| matches!(c, '/' | '\\' | '\0'));
    if plain {
        Ok(())
    } else {
        Err(JobError::InvalidId(id.to_string()))
    }
}

pub trait JobRepository: Send + Sync {
    fn create(&self, id: &str) -> Result<JobRecord, JobError>;
    fn get(&self, id: &str) -> Result<JobRecord, JobError>;
    fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord, JobError>;
}

#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<String, JobRecord>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_jobs<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut HashMap<String, JobRecord>) -> Result<T, JobError>,
    ) -> Result<T, JobError> {
        let mut jobs = self.jobs.lock().map_err(|_| JobError::Storage {
            id: id.to_string(),
            message: "job table lock poisoned".to_string(),
        })?;
        f(&mut jobs)
    }

    fn insert(&self, record: JobRecord) -> Result<(), JobError> {
        let id = record.id.clone();
        self.with_jobs(&id, |jobs| {
            jobs.insert(id.clone(), record);
            Ok(())
        })
    }
}

impl JobRepository for InMemoryJobRepository {
    fn create(&self, id: &str) -> Result<JobRecord, JobError> {
        self.with_jobs(id, |jobs| {
            if jobs.contains_key(id) {
                return Err(JobError::AlreadyExists(id.to_string()));
            }
            let record = JobRecord::new(id);
            jobs.insert(id.to_string(), record.clone());
            Ok(record)
        })
    }

    fn get(&self, id: &str) -> Result<JobRecord, JobError> {
        self.with_jobs(id, |jobs| {
            jobs.get(id)
                .cloned()
                .ok_or_else(|| JobError::NotFound(id.to_string()))
        })
    }

    fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord, JobError> {
        self.with_jobs(id, |jobs| {
            let record = jobs
                .get_mut(id)
                .ok_or_else(|| JobError::NotFound(id.to_string()))?;
            record.apply(update);
            Ok(record.clone())
        })
    }
}

/// Keeps records in memory and writes each change to `<root>/<id>/job.json`.
/// Lookups that miss the memory table fall back to disk, so records outlive
/// the process that created them.
#[derive(Debug)]
pub struct DirectoryJobRepository {
    root: PathBuf,
    cache: InMemoryJobRepository,
}

impl DirectoryJobRepository {
    pub const RECORD_FILE: &'static str = "job.json";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: InMemoryJobRepository::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(id).join(Self::RECORD_FILE)
    }

    fn storage_error(id: &str, message: String) -> JobError {
        JobError::Storage {
            id: id.to_string(),
            message,
        }
    }

    fn persist(&self, record: &JobRecord) -> Result<(), JobError> {
        let path = self.record_path(&record.id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|err| {
                Self::storage_error(&record.id, format!("cannot create {:?}: {}", dir, err))
            })?;
        }
        let body = serde_json::to_string_pretty(record)
            .map_err(|err| Self::storage_error(&record.id, err.to_string()))?;
        fs::write(&path, body).map_err(|err| {
            Self::storage_error(&record.id, format!("cannot write {:?}: {}", path, err))
        })?;
        debug!(job = %record.id, status = ?record.status, progress = record.progress, "job persisted");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<JobRecord, JobError> {
        let path = self.record_path(id);
        if !path.is_file() {
            return Err(JobError::NotFound(id.to_string()));
        }
        let raw = fs::read_to_string(&path)
            .map_err(|err| Self::storage_error(id, format!("cannot read {:?}: {}", path, err)))?;
        let record: JobRecord = serde_json::from_str(&raw)
            .map_err(|err| Self::storage_error(id, format!("corrupt record {:?}: {}", path, err)))?;
        self.cache.insert(record.clone())?;
        Ok(record)
    }
}

impl JobRepository for DirectoryJobRepository {
    fn create(&self, id: &str) -> Result<JobRecord, JobError> {
        check_job_id(id)?;
        if self.record_path(id).exists() {
            return Err(JobError::AlreadyExists(id.to_string()));
        }
        let record = self.cache.create(id)?;
        self.persist(&record)?;
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<JobRecord, JobError> {
        check_job_id(id)?;
        match self.cache.get(id) {
            Err(JobError::NotFound(_)) => self.load(id),
            other => other,
        }
    }

    fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord, JobError> {
        // Pull the record into memory first when it only exists on disk
        self.get(id)?;
        let record = self.cache.update(id, update)?;
        self.persist(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn clip(number: usize) -> ClipSummary {
        ClipSummary {
            number,
            start: 0.0,
            end: 60.0,
            score: None,
            title: None,
        }
    }

    #[test]
    fn lifecycle_in_memory() {
        let repo = InMemoryJobRepository::new();
        let created = repo.create("job-1").unwrap();
        assert_eq!(created.status, JobStatus::Processing);
        assert_eq!(created.progress, 0);

        repo.update("job-1", JobUpdate::progress("planning", 40)).unwrap();
        repo.update("job-1", JobUpdate::Warning("window 3 timed out".into()))
            .unwrap();
        let done = repo
            .update("job-1", JobUpdate::Complete { clips: vec![clip(1)] })
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(done.warnings, vec!["window 3 timed out".to_string()]);
        assert_eq!(done.clips.len(), 1);
    }

    #[test]
    fn duplicate_and_missing_ids_are_errors() {
        let repo = InMemoryJobRepository::new();
        repo.create("a").unwrap();
        assert!(matches!(repo.create("a"), Err(JobError::AlreadyExists(_))));
        assert!(matches!(repo.get("b"), Err(JobError::NotFound(_))));
        assert!(matches!(
            repo.update("b", JobUpdate::progress("x", 1)),
            Err(JobError::NotFound(_))
        ));
    }

    #[test]
    fn finished_jobs_ignore_progress() {
        let mut record = JobRecord::new("j");
        record.apply(JobUpdate::Fail {
            message: "judge missing".into(),
        });
        record.apply(JobUpdate::progress("late", 50));
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.current_step, "failed");
        assert_eq!(record.error.as_deref(), Some("judge missing"));
    }

    #[test]
    fn progress_is_capped() {
        let mut record = JobRecord::new("j");
        record.apply(JobUpdate::progress("overshoot", 250));
        assert_eq!(record.progress, 100);
    }

    #[test]
    fn job_ids_must_be_plain_names() {
        assert!(check_job_id("episode-12").is_ok());
        assert!(check_job_id("a..b").is_ok());
        for bad in ["", ".", "..", "../x", "nested/id", "back\\slash"] {
            assert!(
                matches!(check_job_id(bad), Err(JobError::InvalidId(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn directory_store_refuses_escaping_ids() {
        let dir = tempdir().unwrap();
        let jobs_root = dir.path().join("jobs");
        let repo = DirectoryJobRepository::new(&jobs_root);
        assert!(matches!(repo.create("../x"), Err(JobError::InvalidId(_))));
        assert!(matches!(repo.get("../x"), Err(JobError::InvalidId(_))));
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn directory_store_writes_through_and_reloads() {
        let dir = tempdir().unwrap();
        let repo = DirectoryJobRepository::new(dir.path());
        repo.create("job-7").unwrap();
        repo.update("job-7", JobUpdate::progress("rendering", 80)).unwrap();
        assert!(repo.record_path("job-7").is_file());

        // A fresh repository only has the disk copy
        let reopened = DirectoryJobRepository::new(dir.path());
        let loaded = reopened.get("job-7").unwrap();
        assert_eq!(loaded.current_step, "rendering");
        assert_eq!(loaded.progress, 80);

        let finished = reopened
            .update("job-7", JobUpdate::Complete { clips: vec![clip(1), clip(2)] })
            .unwrap();
        assert_eq!(finished.clips.len(), 2);
        assert!(matches!(reopened.create("job-7"), Err(JobError::AlreadyExists(_))));
    }
}
