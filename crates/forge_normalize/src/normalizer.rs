//! Ordered strategy chain turning an arbitrary agent result into a file map.
//!
//! Each strategy is an independent predicate+transform pair; the dispatcher
//! tries them in priority order and the first one that produces a mapping
//! wins. The final fallback always matches, so normalization never raises an
//! error back to the orchestrator.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::markdown::extract_code_blocks;
use crate::repair::repair;

/// Canonical mapping of filename to source text.
pub type FileMap = BTreeMap<String, String>;

/// Stage keys whose sub-objects are recursively normalized with a prefix.
const STAGE_KEYS: [&str; 5] = ["planner", "backend", "frontend", "tester", "deployment"];

struct Strategy {
    name: &'static str,
    apply: fn(&Value) -> Option<FileMap>,
}

const STRATEGIES: &[Strategy] = &[
    Strategy { name: "null", apply: from_null },
    Strategy { name: "string-map", apply: from_string_map },
    Strategy { name: "code-key", apply: from_code_key },
    Strategy { name: "single-entry", apply: from_single_entry },
    Strategy { name: "raw-output-key", apply: from_raw_output_key },
    Strategy { name: "stage-keys", apply: from_stage_keys },
    Strategy { name: "string", apply: from_string },
    Strategy { name: "sequence", apply: from_sequence },
    Strategy { name: "stringify", apply: from_anything },
];

/// Normalize an arbitrary agent result into a canonical file mapping.
///
/// Every extracted file is passed through placeholder repair. This function
/// never fails: extraction problems degrade to the next strategy in the
/// chain, and the last strategy stringifies whatever is left.
pub fn normalize(result: &Value) -> FileMap {
    for strategy in STRATEGIES {
        if let Some(files) = (strategy.apply)(result) {
            debug!(
                strategy = strategy.name,
                files = files.len(),
                "normalized agent output"
            );
            return files;
        }
    }
    // The stringify fallback always matches.
    unreachable!("strategy chain has a catch-all")
}

fn repaired(files: BTreeMap<String, String>) -> FileMap {
    files
        .into_iter()
        .map(|(name, code)| {
            let fixed = repair(&code, &name);
            (name, fixed)
        })
        .collect()
}

fn from_null(value: &Value) -> Option<FileMap> {
    if value.is_null() {
        warn!("normalize received a null agent result");
        Some(FileMap::new())
    } else {
        None
    }
}

/// A mapping whose every value is already a string is a ready-made file map.
fn from_string_map(value: &Value) -> Option<FileMap> {
    let obj = value.as_object()?;
    let mut files = FileMap::new();
    for (name, content) in obj {
        files.insert(name.clone(), content.as_str()?.to_string());
    }
    Some(repaired(files))
}

/// An object exposing a `code` field, either a nested map or inline text.
fn from_code_key(value: &Value) -> Option<FileMap> {
    let code = value.as_object()?.get("code")?;
    match code {
        Value::Object(map) => {
            let mut files = FileMap::new();
            for (name, content) in map {
                if let Some(text) = content.as_str() {
                    files.insert(name.clone(), text.to_string());
                }
            }
            Some(repaired(files))
        }
        Value::String(text) => {
            let blocks = extract_code_blocks(text);
            if blocks.is_empty() {
                let mut files = FileMap::new();
                files.insert("main.py".to_string(), text.clone());
                Some(repaired(files))
            } else {
                Some(repaired(blocks))
            }
        }
        other => {
            let mut files = FileMap::new();
            files.insert("unknown.py".to_string(), other.to_string());
            Some(repaired(files))
        }
    }
}

/// A single-entry object is unwrapped and its lone value normalized.
fn from_single_entry(value: &Value) -> Option<FileMap> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    let (key, inner) = obj.iter().next()?;
    debug!("single-entry object, recursing into '{}'", key);
    Some(normalize(inner))
}

/// An object carrying an unstructured `raw_output` transcript.
fn from_raw_output_key(value: &Value) -> Option<FileMap> {
    let raw = value.as_object()?.get("raw_output")?;
    Some(normalize(raw))
}

/// Per-stage sub-keys whose values are normalized with the stage name
/// prefixed to each filename to avoid collisions.
fn from_stage_keys(value: &Value) -> Option<FileMap> {
    let obj = value.as_object()?;
    for (key, inner) in obj {
        let lowered = key.to_lowercase();
        let is_stage = lowered.contains("task") || STAGE_KEYS.contains(&lowered.as_str());
        if !is_stage {
            continue;
        }
        let files = match inner {
            Value::String(text) => repaired(extract_code_blocks(text)),
            Value::Object(map) => {
                let mut files = FileMap::new();
                for (name, content) in map {
                    if let Some(text) = content.as_str() {
                        files.insert(name.clone(), text.to_string());
                    }
                }
                repaired(files)
            }
            _ => FileMap::new(),
        };
        if !files.is_empty() {
            return Some(
                files
                    .into_iter()
                    .map(|(name, code)| (format!("{key}/{name}"), code))
                    .collect(),
            );
        }
    }
    None
}

/// A bare string: JSON, fenced markdown, raw code, or plain text.
fn from_string(value: &Value) -> Option<FileMap> {
    let text = value.as_str()?;

    if let Ok(parsed) = serde_json::from_str::<Value>(text) {
        if parsed.is_object() {
            return Some(normalize(&parsed));
        }
    }

    let blocks = extract_code_blocks(text);
    if !blocks.is_empty() {
        return Some(repaired(blocks));
    }

    let trimmed = text.trim().to_string();
    let mut files = FileMap::new();

    let looks_like_code = ["def ", "class ", "import ", "function"]
        .iter()
        .any(|marker| text.contains(marker));
    if looks_like_code {
        let filename = if text.contains("def ") || text.contains("import ") {
            "main.py"
        } else if text.contains("function") || text.contains("const ") || text.contains("let ") {
            "main.js"
        } else {
            "code.txt"
        };
        files.insert(filename.to_string(), trimmed);
        Some(repaired(files))
    } else {
        files.insert("output.txt".to_string(), trimmed);
        Some(files)
    }
}

/// A sequence: each element normalized with a positional prefix.
fn from_sequence(value: &Value) -> Option<FileMap> {
    let items = value.as_array()?;
    let mut combined = FileMap::new();
    for (i, item) in items.iter().enumerate() {
        for (name, code) in normalize(item) {
            combined.insert(format!("item_{i}_{name}"), code);
        }
    }
    if combined.is_empty() {
        let joined = items
            .iter()
            .map(value_as_text)
            .collect::<Vec<_>>()
            .join("\n\n");
        let mut files = FileMap::new();
        files.insert(
            "combined_output.txt".to_string(),
            repair(&joined, "combined_output.txt"),
        );
        Some(files)
    } else {
        Some(combined)
    }
}

/// Last resort: stringify the value and store it as a text artifact.
fn from_anything(value: &Value) -> Option<FileMap> {
    debug!("storing stringified {} result as text artifact", kind_of(value));
    let mut files = FileMap::new();
    files.insert("output.txt".to_string(), value_as_text(value));
    Some(files)
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
