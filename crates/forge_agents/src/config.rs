//! Runtime selection between the mock and LLM-backed implementations.

use std::sync::Arc;

use tracing::{info, warn};

use forge_core::{AgentExecutor, EventHub, PromptAnalyzer};

use crate::analyzer::LlmAnalyzer;
use crate::llm::{LlmClient, LlmExecutor, LlmProvider};
use crate::mock::{MockAnalyzer, MockExecutor};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment-driven agent configuration.
///
/// `APPFORGE_USE_MOCK=true` forces the mock pair. Otherwise the provider is
/// chosen from whichever API key is present (`OPENAI_API_KEY` first, then
/// `ANTHROPIC_API_KEY`); with no key at all the config degrades to mock mode
/// with a warning instead of failing.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub use_mock: bool,
    pub api_key: Option<String>,
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let use_mock = std::env::var("APPFORGE_USE_MOCK")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let model = std::env::var("APPFORGE_LLM_MODEL").ok();
        let timeout_secs = std::env::var("APPFORGE_AGENT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let (provider, api_key) = if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if key.is_empty() {
                (None, None)
            } else {
                (Some(Provider::OpenAI), Some(key))
            }
        } else if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if key.is_empty() {
                (None, None)
            } else {
                (Some(Provider::Anthropic), Some(key))
            }
        } else {
            (None, None)
        };

        Self {
            use_mock,
            api_key,
            provider,
            model,
            timeout_secs,
        }
    }

    pub fn mock() -> Self {
        Self {
            use_mock: true,
            api_key: None,
            provider: None,
            model: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Build the executor/analyzer pair this configuration selects.
    pub fn build(
        &self,
        hub: Arc<EventHub>,
    ) -> (Arc<dyn AgentExecutor>, Arc<dyn PromptAnalyzer>) {
        if self.use_mock {
            info!("using mock agent executor and analyzer");
            return (
                Arc::new(MockExecutor::new().with_hub(hub)),
                Arc::new(MockAnalyzer),
            );
        }

        match (&self.provider, &self.api_key) {
            (Some(provider), Some(api_key)) => {
                let llm_provider = match provider {
                    Provider::OpenAI => LlmProvider::OpenAI,
                    Provider::Anthropic => LlmProvider::Anthropic,
                };
                info!("using LLM-backed agents ({provider:?})");
                let executor_client = LlmClient::new(
                    llm_provider,
                    api_key.clone(),
                    self.model.clone(),
                    self.timeout_secs,
                );
                let analyzer_client = LlmClient::new(
                    llm_provider,
                    api_key.clone(),
                    self.model.clone(),
                    self.timeout_secs,
                );
                (
                    Arc::new(LlmExecutor::new(executor_client)),
                    Arc::new(LlmAnalyzer::new(analyzer_client)),
                )
            }
            _ => {
                warn!("no API key configured, falling back to mock agents");
                (
                    Arc::new(MockExecutor::new().with_hub(hub)),
                    Arc::new(MockAnalyzer),
                )
            }
        }
    }
}
