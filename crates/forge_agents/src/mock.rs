//! Deterministic offline executor and analyzer.
//!
//! The mock executor produces small but complete artifacts for every stage,
//! deliberately varying the result shape per stage (plain string, `code`
//! wrapper object, ready file map, fenced markdown) so the whole
//! normalization chain gets exercised on every run. When given an event hub
//! it narrates simulated progress the way a real agent callback would.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use forge_core::{
    AgentError, AgentExecutor, EventHub, LogStatus, PromptAnalyzer, Requirements, Stage,
    StageContext, StageTask,
};

const PROGRESS_STEPS: [&str; 4] = [
    "Thinking about the task requirements...",
    "Executing task...",
    "Generating complete code with no placeholders...",
    "Finalizing output with fully executable code...",
];

pub struct MockExecutor {
    hub: Option<Arc<EventHub>>,
    step_delay: Duration,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            hub: None,
            step_delay: Duration::ZERO,
        }
    }

    /// Narrate simulated progress through the hub while stages run.
    pub fn with_hub(mut self, hub: Arc<EventHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Pause between progress steps to mimic real agent pacing.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    fn output_for(stage: Stage, prompt: &str) -> Value {
        match stage {
            Stage::Planner => Value::String(format!(
                "# Application Plan\n\nRequest: {prompt}\n\n1. Python backend exposing a small REST API\n2. Single-page frontend with a stylesheet\n3. Unit tests for the backend endpoints\n4. Container-based deployment\n"
            )),
            Stage::Backend => json!({
                "code": {
                    "main.py": "from models import Item\n\nitems = []\n\ndef add_item(name):\n    item = Item(name)\n    items.append(item)\n    return item\n\ndef list_items():\n    return list(items)\n",
                    "models.py": "class Item:\n    def __init__(self, name):\n        self.name = name\n",
                },
                "summary": "Backend with an in-memory item store",
            }),
            Stage::Frontend => json!({
                "App.jsx": "function App() {\n  return 'items';\n}\nmodule.exports = App;\n",
                "index.html": "<html><head><meta charset=\"utf-8\"></head><body><div id=\"root\"></div></body></html>",
                "styles.css": "body { font-family: sans-serif; margin: 0; }\n#root { padding: 1rem; }\n",
            }),
            Stage::Tester => Value::String(
                "Test suite below.\n```python File: test_main.py\nfrom main import add_item, list_items\n\ndef test_add_and_list():\n    add_item('first')\n    assert len(list_items()) == 1\n```\n".to_string(),
            ),
            Stage::Deployment => json!({
                "Dockerfile": "FROM python:3.11-slim\nWORKDIR /app\nCOPY . .\nCMD [\"python\", \"main.py\"]\n",
                "docker-compose.yml": "services:\n  app:\n    build: .\n    ports:\n      - \"8000:8000\"\n",
            }),
        }
    }
}

#[async_trait]
impl AgentExecutor for MockExecutor {
    async fn run_stage(
        &self,
        task: &StageTask,
        context: &StageContext,
    ) -> Result<Value, AgentError> {
        debug!(stage = task.stage.key(), "mock executor running stage");

        if let Some(hub) = &self.hub {
            for message in PROGRESS_STEPS {
                hub.append(
                    &context.job_id,
                    task.stage.agent_label(),
                    message,
                    LogStatus::Running,
                )
                .await;
                if !self.step_delay.is_zero() {
                    tokio::time::sleep(self.step_delay).await;
                }
            }
        }

        Ok(Self::output_for(task.stage, &context.prompt))
    }
}

/// Deterministic requirements derived from the prompt text alone.
pub struct MockAnalyzer;

#[async_trait]
impl PromptAnalyzer for MockAnalyzer {
    async fn analyze(&self, prompt: &str) -> Result<Requirements, AgentError> {
        let mut req = Requirements::fallback(prompt);
        req.app_name = derive_app_name(prompt);
        req.description = prompt.to_string();
        req.features = vec![
            "Core functionality from the prompt".to_string(),
            "REST API endpoints".to_string(),
            "Basic user interface".to_string(),
        ];
        req.framework = "React".to_string();
        req.backend = "Python/FastAPI".to_string();
        req.database = "SQLite".to_string();
        req.enhanced_prompt = format!(
            "{prompt}. Include a REST API, a small frontend, unit tests and container deployment configuration."
        );
        Ok(req)
    }
}

fn derive_app_name(prompt: &str) -> String {
    let words: Vec<&str> = prompt
        .split_whitespace()
        .filter(|w| !matches!(w.to_lowercase().as_str(), "build" | "create" | "make" | "a" | "an" | "the"))
        .take(3)
        .collect();
    if words.is_empty() {
        "App from prompt".to_string()
    } else {
        let mut name = words
            .iter()
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        if !name.to_lowercase().ends_with("app") {
            name.push_str(" App");
        }
        name
    }
}
