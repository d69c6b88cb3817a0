//! Project-wide validation report with per-file fix suggestions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::syntax::validate_file;

/// Aggregated validation result for a whole generated project.
///
/// Recomputed wholesale on every (re)validation; never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub file_count: usize,
    pub error_count: usize,
    /// Errors keyed by `category/filename`.
    pub errors: BTreeMap<String, Vec<String>>,
    pub warnings: Vec<String>,
    /// Suggestions keyed by `category/filename`, present only for files with
    /// errors.
    pub fix_suggestions: BTreeMap<String, Vec<String>>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            valid: true,
            file_count: 0,
            error_count: 0,
            errors: BTreeMap::new(),
            warnings: Vec::new(),
            fix_suggestions: BTreeMap::new(),
        }
    }
}

/// Validate every file in a `category -> filename -> content` mapping.
///
/// A file that fails to parse contributes errors to the report; it never
/// aborts the run.
pub async fn validate_project(
    files: &BTreeMap<String, BTreeMap<String, String>>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (category, files_by_name) in files {
        for (filename, content) in files_by_name {
            report.file_count += 1;
            let (ok, errors) = validate_file(filename, content).await;
            if ok {
                continue;
            }

            report.valid = false;
            report.error_count += errors.len();
            let key = format!("{category}/{filename}");
            report
                .fix_suggestions
                .insert(key.clone(), suggest_fixes(filename, &errors));
            report.errors.insert(key, errors);
        }
    }

    if report.valid {
        info!(files = report.file_count, "project validation passed");
    } else {
        warn!(
            files = report.file_count,
            errors = report.error_count,
            "project validation found errors"
        );
        report
            .warnings
            .push("Validation errors detected. Code may not run correctly.".to_string());
    }

    report
}

/// Pattern-match error text into actionable fix suggestions.
fn suggest_fixes(filename: &str, errors: &[String]) -> Vec<String> {
    let mut suggestions = Vec::new();

    if filename.ends_with(".js") || filename.ends_with(".jsx") {
        if errors.iter().any(|e| e.contains("Unexpected token")) {
            suggestions.push("Check for missing semicolons, parentheses, or brackets".to_string());
        }
        if errors.iter().any(|e| e.to_lowercase().contains("undefined")) {
            suggestions.push("Check for undefined variables or imports".to_string());
        }
        if errors.iter().any(|e| e.to_lowercase().contains("import")) {
            suggestions.push(
                "Make sure all imports are properly defined and modules are installed".to_string(),
            );
        }
    }

    if filename.ends_with(".py") {
        if errors.iter().any(|e| e.contains("IndentationError")) {
            suggestions.push("Check for consistent indentation (spaces vs tabs)".to_string());
        }
        if errors.iter().any(|e| e.contains("NameError")) {
            suggestions.push("Verify all variables are defined before use".to_string());
        }
        if errors.iter().any(|e| e.contains("ImportError")) {
            suggestions
                .push("Ensure all imported modules are available and correctly spelled".to_string());
        }
    }

    if suggestions.is_empty() {
        suggestions.push("Review the code for syntax errors and typos".to_string());
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(entries: &[(&str, &str, &str)]) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut files: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (category, name, content) in entries {
            files
                .entry(category.to_string())
                .or_default()
                .insert(name.to_string(), content.to_string());
        }
        files
    }

    #[tokio::test]
    async fn test_clean_project() {
        let files = project(&[
            ("frontend", "index.html", "<div><p>ok</p></div>"),
            ("frontend", "app.css", "body { margin: 0; }"),
            ("deployment", "Dockerfile", "FROM python:3.11"),
        ]);
        let report = validate_project(&files).await;
        assert!(report.valid);
        assert_eq!(report.file_count, 3);
        assert_eq!(report.error_count, 0);
        assert!(report.warnings.is_empty());
        assert!(report.fix_suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_unclosed_div_in_report() {
        let files = project(&[("frontend", "index.html", "<html><body><div></body></html>")]);
        let report = validate_project(&files).await;
        assert!(!report.valid);
        assert_eq!(report.error_count, 1);
        assert!(report.errors.contains_key("frontend/index.html"));
        assert!(report.fix_suggestions.contains_key("frontend/index.html"));
        assert_eq!(
            report.warnings,
            vec!["Validation errors detected. Code may not run correctly."]
        );
    }

    #[tokio::test]
    async fn test_errors_keyed_by_category_and_filename() {
        let files = project(&[
            ("frontend", "app.css", "body }"),
            ("backend", "notes.txt", "fine"),
        ]);
        let report = validate_project(&files).await;
        assert_eq!(report.file_count, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors.contains_key("frontend/app.css"));
    }

    #[test]
    fn test_javascript_suggestions() {
        let errors = vec!["SyntaxError: Unexpected token '}'".to_string()];
        let suggestions = suggest_fixes("app.js", &errors);
        assert!(suggestions
            .iter()
            .any(|s| s.contains("missing semicolons")));
    }

    #[test]
    fn test_python_suggestions() {
        let errors = vec![
            "IndentationError: unexpected indent".to_string(),
            "NameError: name 'db' is not defined".to_string(),
        ];
        let suggestions = suggest_fixes("main.py", &errors);
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions[0].contains("indentation"));
        assert!(suggestions[1].contains("defined before use"));
    }

    #[test]
    fn test_generic_suggestion_fallback() {
        let errors = vec!["something inscrutable".to_string()];
        let suggestions = suggest_fixes("styles.css", &errors);
        assert_eq!(
            suggestions,
            vec!["Review the code for syntax errors and typos"]
        );
    }
}
