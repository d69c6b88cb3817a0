//! Job state and accumulated results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use forge_validate::ValidationReport;

use crate::requirements::Requirements;

pub type JobId = String;

/// Lifecycle of a job: `analyzing -> running -> completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Analyzing,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Analyzing => "analyzing",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Everything a finished pipeline produced for one job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResults {
    /// Raw per-stage executor output, keyed by stage key.
    pub stages: BTreeMap<String, Value>,
    /// Canonical merged `filename -> source text` mapping.
    pub code: BTreeMap<String, String>,
    /// Post-processed variant of `code`; the original is kept alongside.
    pub processed_code: BTreeMap<String, String>,
    pub validation: Option<ValidationReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub prompt: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Requirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<JobResults>,
}

impl Job {
    pub fn new(id: impl Into<JobId>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            status: JobStatus::Analyzing,
            created_at: Utc::now(),
            requirements: None,
            error: None,
            results: None,
        }
    }

    pub fn results_mut(&mut self) -> &mut JobResults {
        self.results.get_or_insert_with(JobResults::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_analyzing() {
        let job = Job::new("abc", "build something");
        assert_eq!(job.status, JobStatus::Analyzing);
        assert!(!job.status.is_terminal());
        assert!(job.results.is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn test_job_round_trips() {
        let mut job = Job::new("id-1", "prompt");
        job.results_mut()
            .code
            .insert("main.py".to_string(), "pass".to_string());
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back.results.unwrap().code["main.py"], "pass");
    }
}
