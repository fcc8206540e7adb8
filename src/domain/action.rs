//! Actions proposed by the planner and their execution results

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Fingerprint, Priority};

/// Validated key-value input of a tool call
pub type ToolInput = serde_json::Map<String, Value>;

/// An action exactly as the planner proposed it, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Planner-supplied identifier; assigned by the driver when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Tool name
    #[serde(alias = "name")]
    pub tool: String,

    /// Raw input; must be a JSON object to pass validation
    #[serde(default = "empty_object", alias = "args", alias = "arguments")]
    pub input: Value,
}

fn empty_object() -> Value {
    Value::Object(ToolInput::new())
}

impl ProposedAction {
    pub fn new(tool: impl Into<String>, input: Value) -> Self {
        Self {
            id: None,
            tool: tool.into(),
            input,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// What an action touches, as far as ordering is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResourceAccess {
    /// Pure read of a named resource
    Read { resource: String },
    /// Exclusive write of a named resource
    Write { resource: String },
    /// Side-effecting external invocation (shell-style command)
    External { command: String, read_only: bool },
}

impl ResourceAccess {
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::Read { resource } | Self::Write { resource } => Some(resource),
            Self::External { .. } => None,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    /// External command that is not on the read-only allow-list
    pub fn is_mutating_external(&self) -> bool {
        matches!(self, Self::External { read_only: false, .. })
    }

    /// Whether this access overlaps `resource`, either exactly or as an
    /// enclosing or enclosed path
    pub fn touches(&self, resource: &str) -> bool {
        self.resource().is_some_and(|own| resources_overlap(own, resource))
    }
}

/// Two normalized resource names overlap when they are equal or one is a
/// directory containing the other; `.` contains every relative path
///
/// Names starting with `@` live outside the filesystem and only match exactly.
pub fn resources_overlap(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if a.starts_with('@') || b.starts_with('@') {
        return false;
    }
    contains_path(a, b) || contains_path(b, a)
}

fn contains_path(dir: &str, path: &str) -> bool {
    if dir == "." {
        return !path.starts_with('/');
    }
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('/') || dir.ends_with('/'))
}

/// An action annotated with dependencies and parallel-safety, ready for scheduling
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub id: String,
    pub tool: String,
    pub input: ToolInput,
    pub access: ResourceAccess,
    pub fingerprint: Fingerprint,
    pub priority: Priority,
    /// Identifiers of earlier actions in the same batch
    pub deps: Vec<String>,
    pub parallel_safe: bool,
    /// Static per-tool duration estimate (observability only)
    #[serde(rename = "estimate_ms", serialize_with = "serialize_millis")]
    pub estimate: Duration,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Outcome of executing one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: String,
    pub name: String,
    pub input: ToolInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// None when the action was settled without ever starting
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
}

impl ExecutionResult {
    /// Output on success, error text on failure
    pub fn observation(&self) -> &str {
        if self.success {
            self.output.as_deref().unwrap_or("")
        } else {
            self.error.as_deref().unwrap_or("unknown error")
        }
    }
}
