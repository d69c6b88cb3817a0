//! LLM-backed prompt analyzer.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use forge_core::{AgentError, PromptAnalyzer, Requirements};

use crate::llm::LlmClient;

const SYSTEM_PROMPT: &str = "You are an expert requirements analyzer for web and application development. \
Analyze the user's prompt and respond with a structured JSON object containing the fields: \
\"app_name\" (a concise, descriptive name), \"description\", \"features\" (a list of specific features), \
\"framework\" (recommended frontend framework), \"backend\" (recommended backend technology), \
\"database\" (recommended database), and \"enhanced_prompt\" (a comprehensive, detailed prompt that \
would lead to better code generation). Your output must be valid JSON that can be parsed programmatically.";

/// Asks a chat model for structured requirements and parses them leniently.
///
/// Models often wrap JSON in prose; the parser takes the substring between
/// the first `{` and the last `}`. A reply that still does not parse yields
/// fallback requirements rather than an error so the pipeline can proceed.
pub struct LlmAnalyzer {
    client: LlmClient,
}

impl LlmAnalyzer {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    fn parse(response: &str, prompt: &str) -> Requirements {
        let candidate = match (response.find('{'), response.rfind('}')) {
            (Some(start), Some(end)) if end > start => &response[start..=end],
            _ => response,
        };

        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => {
                let mut req: Requirements =
                    serde_json::from_value(value).unwrap_or_else(|_| Requirements::fallback(prompt));
                req.original_prompt = prompt.to_string();
                if req.enhanced_prompt.trim().is_empty() {
                    req.enhanced_prompt = prompt.to_string();
                }
                req
            }
            Err(e) => {
                warn!("analyzer reply was not parseable JSON: {e}");
                Requirements::fallback(prompt)
            }
        }
    }
}

#[async_trait]
impl PromptAnalyzer for LlmAnalyzer {
    async fn analyze(&self, prompt: &str) -> Result<Requirements, AgentError> {
        let response = self.client.complete(SYSTEM_PROMPT, prompt).await?;
        Ok(Self::parse(&response, prompt))
    }
}
