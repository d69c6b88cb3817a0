//! Per-job log history, keyword-driven progress tracking and live event
//! fan-out.
//!
//! Every appended log entry updates the owning stage's progress from keyword
//! heuristics, is stored durably in the job's history, and is then pushed to
//! live subscribers as a log event immediately followed by a progress event.
//! A late subscriber first receives the full history and the current
//! snapshot, so it is never missing context. Subscribers are optional:
//! dropping every receiver never affects job execution.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::job::JobId;
use crate::stage::Stage;

const BROADCAST_CAPACITY: usize = 256;

/// Generic progress bump for messages no keyword matches. Capped below
/// completion: only an explicit completed status reaches 100.
const GENERIC_INCREMENT: u8 = 5;
const GENERIC_CAP: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Info,
    Running,
    Completed,
    Warning,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub message: String,
    pub status: LogStatus,
    /// Progress of the stage this agent maps to, when it maps to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

/// Stage key -> percent complete.
pub type ProgressSnapshot = BTreeMap<String, u8>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    Log(LogEntry),
    ProgressUpdate {
        progress: ProgressSnapshot,
        timestamp: DateTime<Utc>,
    },
}

/// On-demand messages a live subscriber may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    RequestProgress,
    RequestLogs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientReply {
    Pong,
    ProgressUpdate { progress: ProgressSnapshot },
    Logs { logs: Vec<LogEntry> },
}

struct JobChannel {
    logs: Vec<LogEntry>,
    progress: ProgressSnapshot,
    sender: broadcast::Sender<JobEvent>,
}

impl JobChannel {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        let progress = Stage::pipeline()
            .iter()
            .map(|s| (s.key().to_string(), 0u8))
            .collect();
        Self {
            logs: Vec::new(),
            progress,
            sender,
        }
    }
}

/// Shared log/progress hub for all jobs.
#[derive(Default)]
pub struct EventHub {
    channels: RwLock<HashMap<JobId, JobChannel>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the channel for a new job with all stages at zero.
    pub async fn register(&self, job_id: &str) {
        self.channels
            .write()
            .await
            .entry(job_id.to_string())
            .or_insert_with(JobChannel::new);
    }

    /// Append a log entry, update stage progress, and notify subscribers.
    pub async fn append(&self, job_id: &str, agent: &str, message: &str, status: LogStatus) {
        let mut channels = self.channels.write().await;
        let channel = channels
            .entry(job_id.to_string())
            .or_insert_with(JobChannel::new);

        let stage_key = agent_stage_key(agent);
        let progress = if let Some(key) = stage_key {
            let current = channel.progress.get(key).copied().unwrap_or(0);
            let updated = next_progress(current, message, status);
            channel.progress.insert(key.to_string(), updated);
            Some(updated)
        } else {
            None
        };

        let entry = LogEntry {
            timestamp: Utc::now(),
            agent: agent.to_string(),
            message: message.to_string(),
            status,
            progress,
        };
        channel.logs.push(entry.clone());

        // Send failures just mean nobody is listening right now.
        let _ = channel.sender.send(JobEvent::Log(entry));
        let _ = channel.sender.send(JobEvent::ProgressUpdate {
            progress: channel.progress.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Full log history for a job; empty for unknown ids.
    pub async fn logs(&self, job_id: &str) -> Vec<LogEntry> {
        self.channels
            .read()
            .await
            .get(job_id)
            .map(|c| c.logs.clone())
            .unwrap_or_default()
    }

    pub async fn progress(&self, job_id: &str) -> ProgressSnapshot {
        self.channels
            .read()
            .await
            .get(job_id)
            .map(|c| c.progress.clone())
            .unwrap_or_default()
    }

    /// Attach a live subscriber: returns the replayable history and current
    /// snapshot together with a receiver for subsequent events.
    pub async fn subscribe(
        &self,
        job_id: &str,
    ) -> Option<(Vec<LogEntry>, ProgressSnapshot, broadcast::Receiver<JobEvent>)> {
        let channels = self.channels.read().await;
        let channel = channels.get(job_id)?;
        Some((
            channel.logs.clone(),
            channel.progress.clone(),
            channel.sender.subscribe(),
        ))
    }

    /// Answer an on-demand client message from current state.
    pub async fn respond(&self, job_id: &str, message: ClientMessage) -> ClientReply {
        match message {
            ClientMessage::Ping => ClientReply::Pong,
            ClientMessage::RequestProgress => ClientReply::ProgressUpdate {
                progress: self.progress(job_id).await,
            },
            ClientMessage::RequestLogs => ClientReply::Logs {
                logs: self.logs(job_id).await,
            },
        }
    }
}

/// Map an agent display name onto its progress-tracking stage key.
fn agent_stage_key(agent: &str) -> Option<&'static str> {
    let lower = agent.to_lowercase();
    if lower.contains("planning") || lower.contains("architect") {
        Some("planner")
    } else if lower.contains("front") {
        Some("frontend")
    } else if lower.contains("back") {
        Some("backend")
    } else if lower.contains("quality") || lower.contains("qa") || lower.contains("test") {
        Some("tester")
    } else if lower.contains("devops") || lower.contains("deploy") {
        Some("deployment")
    } else {
        None
    }
}

/// Progress is monotonic per stage. Keyword floors move it up in coarse
/// steps; unknown running messages apply a small bump capped below 100.
fn next_progress(current: u8, message: &str, status: LogStatus) -> u8 {
    if status == LogStatus::Completed {
        return 100;
    }
    if status != LogStatus::Running {
        return current;
    }

    let lower = message.to_lowercase();
    let floor = if lower.contains("started") || lower.contains("initializing") {
        Some(10)
    } else if lower.contains("thinking") {
        Some(30)
    } else if lower.contains("executing") {
        Some(50)
    } else if lower.contains("generating") || lower.contains("creating") {
        Some(70)
    } else if lower.contains("finalizing") || lower.contains("reviewing") {
        Some(90)
    } else {
        None
    };

    match floor {
        Some(f) => current.max(f),
        None => {
            debug!("no progress keyword matched, applying generic increment");
            GENERIC_CAP.min(current.saturating_add(GENERIC_INCREMENT))
        }
    }
}
