//! Per-file syntax checks dispatched by file extension.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Upper bound for one external syntax-checker invocation.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Tags that never participate in open/close balancing.
const SELF_CLOSING_TAGS: [&str; 6] = ["meta", "link", "input", "img", "br", "hr"];

/// Validate a file's content based on its extension.
///
/// Returns `(ok, errors)`. Unknown extensions always pass; they are outside
/// validation scope. This function never fails: infrastructure problems
/// (missing interpreter, unwritable temp dir) degrade to a pass or to an
/// error message for this file only.
pub async fn validate_file(filename: &str, content: &str) -> (bool, Vec<String>) {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_lowercase())
        .unwrap_or_default();

    let errors = match ext.as_str() {
        "py" => check_with_tool("python3", &["-m", "py_compile"], ".py", content).await,
        "js" | "jsx" | "ts" | "tsx" => check_with_tool("node", &["--check"], ".js", content).await,
        "html" | "htm" => check_html(content),
        "css" => check_css(content),
        _ => Vec::new(),
    };

    (errors.is_empty(), errors)
}

/// Run an external syntax checker over the content via a temp file.
///
/// A missing tool is not a validation failure; a timeout is, but only for
/// this file.
async fn check_with_tool(tool: &str, args: &[&str], suffix: &str, content: &str) -> Vec<String> {
    let mut temp = match tempfile::Builder::new().suffix(suffix).tempfile() {
        Ok(f) => f,
        Err(e) => {
            warn!("could not create temp file for {tool} check: {e}");
            return vec![format!("Validation error: {e}")];
        }
    };
    if let Err(e) = temp.write_all(content.as_bytes()) {
        warn!("could not write temp file for {tool} check: {e}");
        return vec![format!("Validation error: {e}")];
    }

    let mut cmd = Command::new(tool);
    cmd.args(args).arg(temp.path());

    let output = match timeout(CHECK_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            // Most likely the interpreter is not installed on this host.
            debug!("{tool} unavailable, skipping syntax check: {e}");
            return Vec::new();
        }
        Err(_) => {
            return vec![format!(
                "Syntax check timed out after {}s",
                CHECK_TIMEOUT.as_secs()
            )];
        }
    };

    if output.status.success() {
        return Vec::new();
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let errors: Vec<String> = stderr
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect();
    if errors.is_empty() {
        vec![format!("{tool} reported a syntax error")]
    } else {
        errors
    }
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)[^>]*?(/?)>").expect("tag regex is valid")
    })
}

/// Tag-balance check. Mismatched closers are reported and popped so one bad
/// tag does not cascade into errors for the whole rest of the document.
fn check_html(content: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut open_tags: Vec<String> = Vec::new();

    for caps in tag_regex().captures_iter(content) {
        let is_closing = !caps[1].is_empty();
        let tag = caps[2].to_lowercase();
        let is_self_closing = !caps[3].is_empty();

        if is_self_closing || SELF_CLOSING_TAGS.contains(&tag.as_str()) {
            continue;
        }

        if is_closing {
            match open_tags.last() {
                None => errors.push(format!(
                    "Found closing tag </{tag}> without matching opening tag"
                )),
                Some(top) if *top != tag => {
                    errors.push(format!("Expected closing tag </{top}> but found </{tag}>"));
                    open_tags.pop();
                }
                Some(_) => {
                    open_tags.pop();
                }
            }
        } else {
            open_tags.push(tag);
        }
    }

    for tag in open_tags.iter().rev() {
        errors.push(format!("Unclosed tag <{tag}>"));
    }

    errors
}

/// Brace-balance check with byte positions for unexpected closers.
fn check_css(content: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut open_braces: i32 = 0;

    for (i, ch) in content.char_indices() {
        match ch {
            '{' => open_braces += 1,
            '}' => {
                open_braces -= 1;
                if open_braces < 0 {
                    errors.push(format!("Unexpected closing brace at position {i}"));
                    open_braces = 0;
                }
            }
            _ => {}
        }
    }

    if open_braces > 0 {
        errors.push(format!("Missing {open_braces} closing brace(s)"));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_available(tool: &str) -> bool {
        std::process::Command::new(tool)
            .arg("--version")
            .output()
            .is_ok()
    }

    #[tokio::test]
    async fn test_unknown_extension_passes() {
        let (ok, errors) = validate_file("notes.md", "anything # goes").await;
        assert!(ok);
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_valid_html() {
        let html = "<html><body><div><p>hi</p></div></body></html>";
        let (ok, errors) = validate_file("index.html", html).await;
        assert!(ok, "{errors:?}");
    }

    #[tokio::test]
    async fn test_unclosed_div_reported() {
        let html = "<html><body><div><p>hi</p></body></html>";
        let (ok, errors) = validate_file("index.html", html).await;
        assert!(!ok);
        assert!(errors.iter().any(|e| e.contains("div")), "{errors:?}");
    }

    #[tokio::test]
    async fn test_self_closing_tags_ignored() {
        let html = "<html><head><meta charset=\"utf-8\"><link rel=\"x\"></head><body><br><hr><img src=\"a.png\"></body></html>";
        let (ok, errors) = validate_file("index.html", html).await;
        assert!(ok, "{errors:?}");
    }

    #[tokio::test]
    async fn test_mismatched_tag_pops_and_continues() {
        let html = "<div><span></div></div>";
        let (ok, errors) = validate_file("index.html", html).await;
        assert!(!ok);
        assert!(errors
            .iter()
            .any(|e| e.contains("Expected closing tag </span> but found </div>")));
    }

    #[tokio::test]
    async fn test_css_balanced() {
        let css = "body { color: red; }\n.card { margin: 0; }\n";
        let (ok, errors) = validate_file("app.css", css).await;
        assert!(ok, "{errors:?}");
    }

    #[tokio::test]
    async fn test_css_unexpected_close() {
        let (ok, errors) = validate_file("app.css", "body } { color: red; }").await;
        assert!(!ok);
        assert!(errors[0].contains("Unexpected closing brace at position 5"));
    }

    #[tokio::test]
    async fn test_css_missing_close() {
        let (ok, errors) = validate_file("app.css", "body { color: red;").await;
        assert!(!ok);
        assert!(errors[0].contains("Missing 1 closing brace(s)"));
    }

    #[tokio::test]
    async fn test_python_syntax_error_reported() {
        if !tool_available("python3") {
            return;
        }
        let (ok, errors) = validate_file("bad.py", "def broken(:\n    pass\n").await;
        assert!(!ok);
        assert!(!errors.is_empty());
    }

    #[tokio::test]
    async fn test_python_valid_passes() {
        if !tool_available("python3") {
            return;
        }
        let (ok, errors) = validate_file("good.py", "def add(a, b):\n    return a + b\n").await;
        assert!(ok, "{errors:?}");
    }

    #[tokio::test]
    async fn test_javascript_syntax_error_reported() {
        if !tool_available("node") {
            return;
        }
        let (ok, errors) = validate_file("bad.js", "function broken( {\n").await;
        assert!(!ok);
        assert!(!errors.is_empty());
    }
}
