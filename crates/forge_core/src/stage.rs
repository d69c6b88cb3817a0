//! The fixed five-stage generation pipeline and its task descriptions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::requirements::Requirements;

/// One stage of the strictly linear generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planner,
    Backend,
    Frontend,
    Tester,
    Deployment,
}

impl Stage {
    /// Fixed execution order. Every stage runs strictly after all of its
    /// upstream dependencies.
    pub fn pipeline() -> [Stage; 5] {
        [
            Stage::Planner,
            Stage::Backend,
            Stage::Frontend,
            Stage::Tester,
            Stage::Deployment,
        ]
    }

    /// Key used for results, progress tracking and upstream context.
    pub fn key(&self) -> &'static str {
        match self {
            Stage::Planner => "planner",
            Stage::Backend => "backend",
            Stage::Frontend => "frontend",
            Stage::Tester => "tester",
            Stage::Deployment => "deployment",
        }
    }

    /// Human-readable agent role shown in log entries.
    pub fn agent_label(&self) -> &'static str {
        match self {
            Stage::Planner => "Planning Architect",
            Stage::Backend => "Backend Engineer",
            Stage::Frontend => "Frontend Developer",
            Stage::Tester => "Quality Assurance Engineer",
            Stage::Deployment => "DevOps Engineer",
        }
    }

    /// Stages whose outputs this stage's context must include.
    pub fn upstream(&self) -> &'static [Stage] {
        match self {
            Stage::Planner => &[],
            Stage::Backend => &[Stage::Planner],
            Stage::Frontend => &[Stage::Planner, Stage::Backend],
            Stage::Tester => &[Stage::Backend, Stage::Frontend],
            Stage::Deployment => &[Stage::Backend, Stage::Frontend, Stage::Tester],
        }
    }

    /// Build the task handed to the agent executor for this stage.
    pub fn task(&self, requirements: &Requirements) -> StageTask {
        let completeness = "\n\nIMPORTANT: Generate COMPLETE, WORKING code. Do NOT use placeholders like '...' or '[...]' or 'code continues here' or any other form of incomplete code. Every function must be fully implemented and runnable without modification.";

        let (description, expected_output) = match self {
            Stage::Planner => (
                format!(
                    "Create a detailed plan for the following app:\n\nApp Name: {}\n\nRequest: {}\n\nFeatures: {}\n\nProvide concrete implementation details. Do NOT use placeholders or incomplete sections.",
                    requirements.app_name,
                    requirements.effective_prompt(),
                    requirements.features.join(", "),
                ),
                "Provide a detailed plan with concrete implementation details. Do NOT return JSON with placeholders - return actual, complete specifications that can be directly implemented.".to_string(),
            ),
            Stage::Backend => (
                format!("Create complete, functional backend code based on the planning document. Include all necessary files with full implementations.{completeness}"),
                "Return complete, executable code files for the backend. Include main.py, models.py, and any other necessary files with full implementations. Do NOT use '...' or '[...]' anywhere in your code.".to_string(),
            ),
            Stage::Frontend => (
                format!("Create complete, functional frontend components based on the planning document and backend API. Include all necessary files with full implementations.{completeness}"),
                "Return complete, executable component files. Include App.jsx, component files, and any other necessary files with full implementations. Do NOT use '...' or '[...]' anywhere in your code.".to_string(),
            ),
            Stage::Tester => (
                format!("Write complete, functional tests for the backend and frontend code. Include all necessary test files with full implementations.{completeness}"),
                "Return complete, executable test files for both backend and frontend. Include actual test implementations. Do NOT use '...' or '[...]' anywhere in your code.".to_string(),
            ),
            Stage::Deployment => (
                format!("Create complete deployment configuration for the application. Include all necessary files with full implementations.{completeness}"),
                "Return complete deployment files including Dockerfile, docker-compose.yml, and any other necessary files with full implementations. Do NOT use '...' or '[...]' anywhere in your code.".to_string(),
            ),
        };

        StageTask {
            stage: *self,
            description,
            expected_output,
        }
    }
}

/// A unit of work handed to the agent executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTask {
    pub stage: Stage,
    pub description: String,
    pub expected_output: String,
}

impl StageTask {
    /// Short form of the description for log lines.
    pub fn summary(&self) -> String {
        let line = self.description.lines().next().unwrap_or_default();
        if line.chars().count() > 100 {
            let truncated: String = line.chars().take(100).collect();
            format!("{truncated}...")
        } else {
            line.to_string()
        }
    }
}

/// Context for one stage call: the owning job, the working prompt, and the
/// raw outputs of every declared upstream stage keyed by stage key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageContext {
    pub job_id: String,
    pub prompt: String,
    pub upstream: BTreeMap<String, Value>,
}
