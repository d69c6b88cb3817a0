//! Fenced code block extraction from markdown-flavoured agent transcripts.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Matches a triple-backtick fence with an optional language tag and an
/// optional `File: <name>` annotation on the opening line.
fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z0-9_+-]*)[ \t]*(?:File:[ \t]*([^\n]+))?\n(.*?)```")
            .expect("fence regex is valid")
    })
}

/// Map a fence language tag to a canonical file extension.
fn extension_for(lang: &str) -> &str {
    match lang.to_lowercase().as_str() {
        "python" => "py",
        "javascript" => "js",
        "typescript" => "ts",
        "jsx" => "jsx",
        "tsx" => "tsx",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "yaml" => "yml",
        "bash" | "sh" | "shell" => "sh",
        "dockerfile" => "Dockerfile",
        "markdown" => "md",
        "" => "txt",
        other => {
            debug!("unrecognized fence language '{}', using as extension", other);
            return "";
        }
    }
}

/// Assign a sequential default filename for an anonymous block.
fn default_filename(lang: &str, counter: usize) -> String {
    let ext = extension_for(lang);
    if ext == "Dockerfile" {
        if counter == 1 {
            "Dockerfile".to_string()
        } else {
            format!("Dockerfile.{counter}")
        }
    } else if ext.is_empty() {
        // Unrecognized tag: use the tag itself as the extension.
        format!("file_{counter}.{}", lang.to_lowercase())
    } else {
        format!("file_{counter}.{ext}")
    }
}

/// Extract fenced code blocks from markdown and organize them into files.
///
/// Blocks carrying a `File: <name>` annotation are keyed by that name
/// verbatim. Anonymous blocks get a sequential default name derived from the
/// language tag, so no two anonymous blocks in one call collide.
pub fn extract_code_blocks(markdown: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    let mut unnamed_counter = 0usize;

    for caps in fence_regex().captures_iter(markdown) {
        let lang = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let code = caps.get(3).map(|m| m.as_str()).unwrap_or("").trim().to_string();

        let filename = match caps.get(2) {
            Some(name) => name.as_str().trim().to_string(),
            None => {
                unnamed_counter += 1;
                default_filename(lang, unnamed_counter)
            }
        };

        files.insert(filename, code);
    }

    files
}
