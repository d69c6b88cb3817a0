//! HTTP chat-completion client and the LLM-backed agent executor.
//!
//! Supports OpenAI and Anthropic APIs, selected via configuration. Transient
//! failures (5xx, rate limits, network errors) are retried with exponential
//! backoff; a request timeout is reported as [`AgentError::Timeout`] so the
//! orchestrator can surface the remediation hint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use forge_core::{AgentError, AgentExecutor, StageContext, StageTask};

const MAX_RETRIES: u32 = 3;
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

/// Thin chat-completion client shared by the executor and the analyzer.
pub struct LlmClient {
    provider: LlmProvider,
    api_key: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(
        provider: LlmProvider,
        api_key: String,
        model: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        let default_model = match provider {
            LlmProvider::OpenAI => "gpt-5-mini".to_string(),
            LlmProvider::Anthropic => "claude-sonnet-4.5".to_string(),
        };

        Self {
            provider,
            api_key,
            model: model.unwrap_or(default_model),
            timeout_secs,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Complete one system+user exchange, returning the raw assistant text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, AgentError> {
        match self.provider {
            LlmProvider::OpenAI => self.complete_openai(system, user).await,
            LlmProvider::Anthropic => self.complete_anthropic(system, user).await,
        }
    }

    fn classify(&self, e: reqwest::Error) -> AgentError {
        if e.is_timeout() {
            AgentError::Timeout {
                seconds: self.timeout_secs,
            }
        } else if e.is_connect() {
            AgentError::Connection(e.to_string())
        } else {
            AgentError::Other(format!("Network error: {e}"))
        }
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String, AgentError> {
        let url = "https://api.openai.com/v1/chat/completions";
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_completion_tokens: Some(MAX_TOKENS),
        };

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }

            let response = match self
                .client
                .post(url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    let classified = self.classify(e);
                    // A timeout is terminal: repeating a call that already
                    // ran out the clock only delays the failure report.
                    if matches!(classified, AgentError::Timeout { .. }) {
                        return Err(classified);
                    }
                    warn!("OpenAI request failed (attempt {}): {classified}", attempt + 1);
                    last_error = Some(classified);
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(AgentError::Other(format!(
                    "OpenAI API error {} (attempt {}/{}): {}",
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AgentError::Other(format!(
                    "OpenAI API error {status}: {body}"
                )));
            }

            let result: OpenAIResponse = response
                .json()
                .await
                .map_err(|e| AgentError::Other(format!("Failed to parse response: {e}")))?;

            return result
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| AgentError::Other("No response from OpenAI".to_string()));
        }

        Err(last_error.unwrap_or_else(|| AgentError::Other("Max retries exceeded".to_string())))
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String, AgentError> {
        let url = "https://api.anthropic.com/v1/messages";
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: Some(system.to_string()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }

            let response = match self
                .client
                .post(url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    let classified = self.classify(e);
                    if matches!(classified, AgentError::Timeout { .. }) {
                        return Err(classified);
                    }
                    warn!(
                        "Anthropic request failed (attempt {}): {classified}",
                        attempt + 1
                    );
                    last_error = Some(classified);
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(AgentError::Other(format!(
                    "Anthropic API error {} (attempt {}/{}): {}",
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AgentError::Other(format!(
                    "Anthropic API error {status}: {body}"
                )));
            }

            let result: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| AgentError::Other(format!("Failed to parse response: {e}")))?;

            return result
                .content
                .into_iter()
                .next()
                .map(|c| c.text)
                .ok_or_else(|| AgentError::Other("No response from Anthropic".to_string()));
        }

        Err(last_error.unwrap_or_else(|| AgentError::Other("Max retries exceeded".to_string())))
    }
}

/// Stage executor backed by a chat-completion endpoint.
///
/// Returns the assistant's reply as a raw string value; the normalizer
/// handles whatever shape the model chose (fenced blocks, JSON, prose).
pub struct LlmExecutor {
    client: LlmClient,
}

impl LlmExecutor {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    fn build_user_prompt(task: &StageTask, context: &StageContext) -> String {
        let mut prompt = format!(
            "{}\n\nExpected output: {}\n\nWorking prompt: {}",
            task.description, task.expected_output, context.prompt
        );
        if !context.upstream.is_empty() {
            prompt.push_str("\n\nOutputs from earlier stages:");
            for (stage, output) in &context.upstream {
                let rendered = match output {
                    Value::String(s) => s.clone(),
                    other => serde_json::to_string_pretty(other).unwrap_or_default(),
                };
                prompt.push_str(&format!("\n\n## {stage}\n{rendered}"));
            }
        }
        prompt
    }
}

#[async_trait]
impl AgentExecutor for LlmExecutor {
    async fn run_stage(
        &self,
        task: &StageTask,
        context: &StageContext,
    ) -> Result<Value, AgentError> {
        debug!(stage = task.stage.key(), "dispatching stage to LLM");
        let system = format!(
            "You are the {} on a software delivery team. Produce exactly what the task asks for, as complete files in fenced code blocks annotated with 'File: <name>'.",
            task.stage.agent_label()
        );
        let user = Self::build_user_prompt(task, context);
        let content = self.client.complete(&system, &user).await?;
        Ok(Value::String(content))
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::{Requirements, Stage};

    #[test]
    fn test_default_models() {
        let openai = LlmClient::new(LlmProvider::OpenAI, "key".to_string(), None, 300);
        assert_eq!(openai.model(), "gpt-5-mini");

        let anthropic = LlmClient::new(LlmProvider::Anthropic, "key".to_string(), None, 300);
        assert_eq!(anthropic.model(), "claude-sonnet-4.5");
    }

    #[test]
    fn test_custom_model() {
        let client = LlmClient::new(
            LlmProvider::OpenAI,
            "key".to_string(),
            Some("gpt-4o-mini".to_string()),
            300,
        );
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_user_prompt_includes_upstream_outputs() {
        let req = Requirements::fallback("build a todo app");
        let task = Stage::Backend.task(&req);
        let mut context = StageContext {
            job_id: "j1".to_string(),
            prompt: "build a todo app".to_string(),
            upstream: Default::default(),
        };
        context
            .upstream
            .insert("planner".to_string(), Value::String("the plan".to_string()));

        let prompt = LlmExecutor::build_user_prompt(&task, &context);
        assert!(prompt.contains("## planner"));
        assert!(prompt.contains("the plan"));
        assert!(prompt.contains("Expected output:"));
    }
}
