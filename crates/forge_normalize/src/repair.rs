//! Heuristic repair of obviously-incomplete generated code.
//!
//! Agents sometimes elide function bodies with `...`, `[...]`, or a
//! "Continue implementation" comment. Repair rewrites these into minimal but
//! syntactically complete stubs so downstream validation does not trip over
//! truncated code. Repair is idempotent: clean input (including
//! already-repaired output) passes through unchanged.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

const ELLIPSIS: &str = "...";
const BRACKETED_ELLIPSIS: &str = "[...]";
const CONTINUE_MARKER: &str = "# Continue implementation";

/// Check whether source text contains any recognized placeholder marker.
pub fn has_placeholders(source: &str) -> bool {
    source.contains(ELLIPSIS)
        || source.contains(BRACKETED_ELLIPSIS)
        || source.contains(CONTINUE_MARKER)
}

fn py_empty_def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"def ([A-Za-z_][A-Za-z0-9_]*)\([^)]*\):\s*\.\.\.\s*")
            .expect("python def regex is valid")
    })
}

fn py_route_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"@app\.([a-z]+)\("([^"]+)"\)\s*\ndef ([A-Za-z_][A-Za-z0-9_]*)\([^)]*\):\s*\.\.\.\s*"#,
        )
        .expect("python route regex is valid")
    })
}

fn js_empty_fn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"function ([A-Za-z_$][A-Za-z0-9_$]*)\([^)]*\)\s*\{\s*\.\.\.\s*\}")
            .expect("js function regex is valid")
    })
}

fn jsx_component_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"const ([A-Z][A-Za-z0-9]*) = \(\) => \{\s*\.\.\.\s*\}")
            .expect("jsx component regex is valid")
    })
}

/// Repair placeholder markers in a single file's source text.
///
/// For backend-style files (`.py`) empty function bodies and route handlers
/// are rewritten into descriptive stubs; for frontend-style files (`.js`,
/// `.jsx`, `.ts`, `.tsx`) empty functions and UI components get minimal
/// complete bodies. A final generic pass replaces any surviving marker with
/// an inline comment, so no placeholder token ever remains in the output.
pub fn repair(source: &str, filename: &str) -> String {
    if !has_placeholders(source) {
        return source.to_string();
    }

    debug!("detected placeholders in {}, repairing", filename);

    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_lowercase())
        .unwrap_or_default();

    let mut fixed = source.to_string();

    match ext.as_str() {
        "py" => {
            // Route handlers first: the plain-def rewrite would otherwise
            // strand the decorator above a renamed stub.
            fixed = py_route_regex()
                .replace_all(&fixed, |caps: &regex::Captures<'_>| {
                    let (method, path, name) = (&caps[1], &caps[2], &caps[3]);
                    format!(
                        "@app.{method}(\"{path}\")\ndef {name}():\n    \"\"\"Handler for {path}.\"\"\"\n    return {{\"message\": \"Endpoint for {path}\"}}\n\n"
                    )
                })
                .into_owned();

            fixed = py_empty_def_regex()
                .replace_all(&fixed, |caps: &regex::Captures<'_>| {
                    let name = &caps[1];
                    format!("def {name}():\n    \"\"\"Stub implementation for {name}.\"\"\"\n    pass\n\n")
                })
                .into_owned();
        }
        "js" | "jsx" | "ts" | "tsx" => {
            fixed = jsx_component_regex()
                .replace_all(&fixed, |caps: &regex::Captures<'_>| {
                    let name = &caps[1];
                    format!(
                        "const {name} = () => {{\n  return (\n    <div>\n      <h1>{name} Component</h1>\n    </div>\n  );\n}}"
                    )
                })
                .into_owned();

            fixed = js_empty_fn_regex()
                .replace_all(&fixed, |caps: &regex::Captures<'_>| {
                    let name = &caps[1];
                    format!("function {name}() {{\n  // Stub implementation for {name}\n  return null;\n}}")
                })
                .into_owned();
        }
        _ => {}
    }

    // Generic final pass: nothing resembling a placeholder may survive.
    // Bracketed ellipses must go first or they would be split by the plain
    // ellipsis replacement.
    let substituted = if ext == "py" {
        "# implementation substituted"
    } else {
        "/* implementation substituted */"
    };
    fixed = fixed.replace(BRACKETED_ELLIPSIS, substituted);
    fixed = fixed.replace(ELLIPSIS, substituted);
    fixed = fixed.replace(CONTINUE_MARKER, substituted);

    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_source_is_identity() {
        let src = "def add(a, b):\n    return a + b\n";
        assert_eq!(repair(src, "math.py"), src);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let src = "def handler():\n    ...\nvalue = [...]\n";
        let once = repair(src, "main.py");
        let twice = repair(&once, "main.py");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_markers_survive() {
        for (src, name) in [
            ("def f(): ...", "a.py"),
            ("function g() { ... }", "a.js"),
            ("body { [...] }", "a.css"),
            ("plain ... text ... with [...] markers", "notes.txt"),
        ] {
            let out = repair(src, name);
            assert!(!out.contains("..."), "marker survived in {name}: {out}");
        }
    }

    #[test]
    fn test_python_empty_def_stub() {
        let src = "def process_data(items):\n    ...\n";
        let out = repair(src, "worker.py");
        assert!(out.contains("def process_data():"));
        assert!(out.contains("pass"));
        assert!(!out.contains("..."));
    }

    #[test]
    fn test_python_route_handler_stub() {
        let src = "@app.get(\"/api/items\")\ndef list_items():\n    ...\n";
        let out = repair(src, "main.py");
        assert!(out.contains("Endpoint for /api/items"));
        assert!(!out.contains("..."));
    }

    #[test]
    fn test_react_component_stub() {
        let src = "const HomePage = () => {\n  ...\n}";
        let out = repair(src, "HomePage.jsx");
        assert!(out.contains("<h1>HomePage Component</h1>"));
        assert!(!out.contains("..."));
    }

    #[test]
    fn test_continue_marker_removed() {
        let src = "def run():\n    pass\n# Continue implementation\n";
        let out = repair(src, "run.py");
        assert!(!out.contains("Continue implementation"));
    }
}
