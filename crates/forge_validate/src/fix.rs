//! Heuristic best-effort auto-fixes driven by validation error text.

use tracing::debug;

/// Apply shallow textual fixes for the most common validation failures.
///
/// Deliberately modest: tab normalization for Python indentation errors and
/// naive semicolon insertion for JavaScript token errors. Anything deeper
/// belongs to a regeneration pass, not a string rewrite. Returns the content
/// unchanged when no heuristic applies.
pub fn fix_code(filename: &str, content: &str, errors: &[String]) -> String {
    let mut fixed = content.to_string();

    if filename.ends_with(".js") || filename.ends_with(".jsx") {
        if errors.iter().any(|e| e.contains("Unexpected token")) {
            fixed = fixed.replace("\n}", ";\n}");
            fixed = fixed.replace("){\n", ");\n{\n");
        }
    } else if filename.ends_with(".py") {
        if errors.iter().any(|e| e.contains("IndentationError")) {
            fixed = fixed.replace('\t', "    ");
        }
    }

    if fixed != content {
        debug!("applied heuristic fixes to {}", filename);
    }
    fixed
}
