//! Trait seams for the external agent executor and prompt analyzer.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::requirements::Requirements;
use crate::stage::{StageContext, StageTask};

/// Runs one generation stage against an external agent service.
///
/// The returned value is arbitrarily shaped (object, mapping, string or
/// sequence); the normalizer absorbs that variability. Implementations own
/// their timeout/retry policy and report failures through [`AgentError`] so
/// the orchestrator can distinguish timeouts from generic failures.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn run_stage(
        &self,
        task: &StageTask,
        context: &StageContext,
    ) -> Result<Value, AgentError>;
}

/// Extracts structured requirements from a free-text prompt.
///
/// Failure is never fatal: the orchestrator logs a warning and continues
/// with the raw prompt.
#[async_trait]
pub trait PromptAnalyzer: Send + Sync {
    async fn analyze(&self, prompt: &str) -> Result<Requirements, AgentError>;
}
