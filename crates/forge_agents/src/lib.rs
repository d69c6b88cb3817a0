//! # forge_agents
//!
//! The two implementations behind the core's executor and analyzer seams:
//! a deterministic mock pair for offline runs and tests, and an LLM-backed
//! pair speaking the OpenAI or Anthropic chat API over HTTP.
//!
//! Which pair is used is a runtime configuration decision
//! ([`config::AgentConfig`]), not a compile-time one.

pub mod analyzer;
pub mod config;
pub mod llm;
pub mod mock;

pub use analyzer::LlmAnalyzer;
pub use config::AgentConfig;
pub use llm::{LlmClient, LlmExecutor, LlmProvider};
pub use mock::{MockAnalyzer, MockExecutor};
