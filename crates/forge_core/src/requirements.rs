//! Structured requirements produced by the prompt analyzer.

use serde::{Deserialize, Serialize};

/// What the analyzer extracted from a free-text prompt.
///
/// All fields are best-effort; an analyzer that cannot determine a value
/// leaves the default in place and the pipeline carries on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub enhanced_prompt: String,
    #[serde(default)]
    pub original_prompt: String,
}

impl Requirements {
    /// Minimal requirements when prompt analysis is unavailable or failed:
    /// the raw prompt drives the pipeline unmodified.
    pub fn fallback(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        Self {
            app_name: "App from prompt".to_string(),
            enhanced_prompt: prompt.clone(),
            original_prompt: prompt,
            ..Self::default()
        }
    }

    /// The prompt the generation stages should actually work from.
    pub fn effective_prompt(&self) -> &str {
        if self.enhanced_prompt.trim().is_empty() {
            &self.original_prompt
        } else {
            &self.enhanced_prompt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_keeps_prompt() {
        let req = Requirements::fallback("build a todo app");
        assert_eq!(req.effective_prompt(), "build a todo app");
        assert_eq!(req.app_name, "App from prompt");
        assert!(req.features.is_empty());
    }

    #[test]
    fn test_effective_prompt_prefers_enhanced() {
        let mut req = Requirements::fallback("short");
        req.enhanced_prompt = "a much richer prompt".to_string();
        assert_eq!(req.effective_prompt(), "a much richer prompt");
    }

    #[test]
    fn test_deserializes_with_missing_fields() {
        let req: Requirements = serde_json::from_str(r#"{"app_name": "Todo"}"#).unwrap();
        assert_eq!(req.app_name, "Todo");
        assert!(req.database.is_empty());
    }
}
