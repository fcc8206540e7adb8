//! Cross-role task graph types

use serde::{Deserialize, Deserializer, Serialize};

use super::Priority;

/// A unit of work delegated to a role inside a workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaskNode {
    pub id: String,
    pub description: String,
    pub role: String,

    /// Author-declared dependencies; never inferred
    #[serde(default)]
    pub deps: Vec<TaskDependency>,

    #[serde(default)]
    pub priority: Priority,

    /// Estimated duration in milliseconds, used for statistics only
    #[serde(default)]
    pub estimated_ms: u64,
}

impl TaskNode {
    pub fn new(id: impl Into<String>, role: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            role: role.into(),
            deps: Vec::new(),
            priority: Priority::Normal,
            estimated_ms: 0,
        }
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.deps.push(TaskDependency::completion(id));
        self
    }

    /// Depend on `id` and refuse to run if it fails
    pub fn requires(mut self, id: impl Into<String>) -> Self {
        self.deps.push(TaskDependency::success(id));
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_estimate_ms(mut self, estimated_ms: u64) -> Self {
        self.estimated_ms = estimated_ms;
        self
    }

    pub fn dep_ids(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(|d| d.id.as_str())
    }
}

/// Edge to an upstream task node
///
/// In YAML either a bare id (`- fetch`) or a map
/// (`- { id: fetch, requires-success: true }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaskDependency {
    pub id: String,
    pub requires_success: bool,
}

impl TaskDependency {
    /// Satisfied once the upstream node finishes, whatever its outcome
    pub fn completion(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            requires_success: false,
        }
    }

    /// Satisfied only if the upstream node succeeds
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            requires_success: true,
        }
    }
}

impl<'de> Deserialize<'de> for TaskDependency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(String),
            Full {
                id: String,
                #[serde(default, rename = "requires-success")]
                requires_success: bool,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bare(id) => Self::completion(id),
            Repr::Full { id, requires_success } => Self { id, requires_success },
        })
    }
}

/// Payload returned by a role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolePayload {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Response of `Role::execute_task`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleResponse {
    pub success: bool,
    #[serde(default)]
    pub payload: RolePayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RoleResponse {
    pub fn ok(payload: RolePayload) -> Self {
        Self {
            success: true,
            payload,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: RolePayload::default(),
            error: Some(error.into()),
        }
    }
}

/// Result of one task node in a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub task_id: String,
    pub role: String,
    pub result: RoleResponse,
    pub duration_ms: u64,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_node_yaml_with_mixed_deps() {
        let yaml = r#"
id: review
description: Review the patch
role: reviewer
deps:
  - implement
  - id: tests
    requires-success: true
priority: high
estimated-ms: 1500
"#;
        let node: TaskNode = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(node.role, "reviewer");
        assert_eq!(node.priority, Priority::High);
        assert_eq!(node.estimated_ms, 1500);
        assert_eq!(
            node.deps,
            vec![TaskDependency::completion("implement"), TaskDependency::success("tests")]
        );
    }

    #[test]
    fn test_task_node_defaults() {
        let node: TaskNode = serde_yaml::from_str("id: a\ndescription: do it\nrole: coder\n").unwrap();
        assert!(node.deps.is_empty());
        assert_eq!(node.priority, Priority::Normal);
        assert_eq!(node.estimated_ms, 0);
    }

    #[test]
    fn test_builder_methods() {
        let node = TaskNode::new("b", "coder", "build").depends_on("a").requires("c");
        let ids: Vec<&str> = node.dep_ids().collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(!node.deps[0].requires_success);
        assert!(node.deps[1].requires_success);
    }

    #[test]
    fn test_role_response_constructors() {
        assert!(RoleResponse::ok(RolePayload::default()).success);
        let failed = RoleResponse::failed("boom");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
