//! Canonical action identity used for repetition detection

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::ToolInput;

/// Canonical identity of a tool call: the tool name plus its input with every
/// object's keys sorted.
///
/// Inputs must already have aliases folded to their canonical keys (see
/// `ToolCatalog::validate`); two calls that differ only in key order or alias
/// spelling then produce the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    tool: String,
    canonical: String,
}

impl Fingerprint {
    pub fn new(tool: &str, input: &ToolInput) -> Self {
        let canonical_input = canonical_json(&Value::Object(input.clone()));
        Self {
            tool: tool.to_string(),
            canonical: format!("{}{}", tool, canonical_input),
        }
    }

    /// Tool name component
    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical)
    }
}

/// Render a JSON value with object keys in sorted order at every depth
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> = map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let body: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}
