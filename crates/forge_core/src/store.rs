//! Process-wide job store.
//!
//! Constructed once at startup and injected into the orchestrator; tests get
//! an isolated store each. Each job's background task handle is retained so
//! callers can await completion instead of sleeping.

use std::collections::HashMap;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::job::{Job, JobId};

#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    handles: Mutex<HashMap<JobId, JoinHandle<()>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    pub async fn contains(&self, job_id: &str) -> bool {
        self.jobs.read().await.contains_key(job_id)
    }

    /// Mutate a job in place. Returns false for unknown ids.
    pub async fn update<F>(&self, job_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// Retain the background task handle for a job.
    pub async fn attach_handle(&self, job_id: &str, handle: JoinHandle<()>) {
        self.handles
            .lock()
            .await
            .insert(job_id.to_string(), handle);
    }

    /// Await the job's background task. Used by tests and by callers that
    /// want synchronous completion; a second wait on the same id is a no-op.
    pub async fn wait(&self, job_id: &str) {
        let handle = self.handles.lock().await.remove(job_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("job {job_id} background task panicked: {e}");
            }
        }
    }
}
