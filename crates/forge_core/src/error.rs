//! Error types shared across the orchestration core.

use thiserror::Error;

/// Failures reported by the external agent executor or prompt analyzer.
///
/// Timeouts are distinguished from other connectivity failures so the
/// orchestrator can surface a remediation hint instead of a bare error.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("agent call timed out after {seconds}s; raise the agent timeout or enable mock mode")]
    Timeout { seconds: u64 },
    #[error("agent connection failed: {0}")]
    Connection(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown job: {0}")]
    UnknownJob(String),
    #[error("stage {stage} failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: AgentError,
    },
    #[error(transparent)]
    Agent(#[from] AgentError),
}

pub type CoreResult<T> = Result<T, CoreError>;
