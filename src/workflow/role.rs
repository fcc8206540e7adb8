//! Role contract and registry

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{RolePayload, RoleResponse};
use crate::driver::IterationDriver;

/// An agent that accepts a natural-language task and reports back
#[async_trait]
pub trait Role: Send + Sync {
    async fn execute_task(&self, description: &str) -> RoleResponse;
}

/// Role name -> implementation
#[derive(Default, Clone)]
pub struct RoleRegistry {
    roles: HashMap<String, Arc<dyn Role>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, role: Arc<dyn Role>) {
        let name = name.into();
        debug!(%name, "RoleRegistry::register: called");
        self.roles.insert(name, role);
    }

    pub fn with_role(mut self, name: impl Into<String>, role: Arc<dyn Role>) -> Self {
        self.register(name, role);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Role>> {
        self.roles.get(name).cloned()
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Sorted role names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roles.keys().cloned().collect();
        names.sort();
        names
    }
}

/// A role that works its task through an iteration loop
pub struct DriverRole {
    driver: IterationDriver,
}

impl DriverRole {
    pub fn new(driver: IterationDriver) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Role for DriverRole {
    async fn execute_task(&self, description: &str) -> RoleResponse {
        let report = self.driver.run(description).await;
        debug!(task_id = %report.task_id, outcome = report.outcome.kind(), "DriverRole::execute_task: finished");

        if !report.outcome.is_success() {
            return RoleResponse::failed(report.outcome.message());
        }

        let mut actions: Vec<String> = Vec::new();
        for result in report.iterations.iter().flat_map(|r| r.results()) {
            if result.success && !actions.contains(&result.name) {
                actions.push(result.name.clone());
            }
        }

        RoleResponse::ok(RolePayload {
            content: report.outcome.message().to_string(),
            actions,
            suggestions: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProposedAction, ToolInput};
    use crate::driver::{IterationRecord, Planner, PlannerDecision, PlannerError};
    use crate::scheduler::BoundedScheduler;
    use crate::tools::{ToolCatalog, ToolError, ToolInvoker};
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Role for Echo {
        async fn execute_task(&self, description: &str) -> RoleResponse {
            RoleResponse::ok(RolePayload {
                content: description.to_string(),
                ..Default::default()
            })
        }
    }

    /// Reads one file, then answers
    struct OneRead;

    #[async_trait]
    impl Planner for OneRead {
        async fn propose(&self, _task: &str, history: &[IterationRecord]) -> Result<PlannerDecision, PlannerError> {
            if history.is_empty() {
                Ok(PlannerDecision::Actions {
                    rationale: "read it".into(),
                    actions: vec![ProposedAction::new("read_file", json!({"path": "notes.md"}))],
                })
            } else {
                Ok(PlannerDecision::FinalAnswer {
                    rationale: "read it".into(),
                    answer: "notes summarized".into(),
                })
            }
        }
    }

    struct Files;

    #[async_trait]
    impl ToolInvoker for Files {
        async fn invoke(&self, _name: &str, _input: &ToolInput) -> Result<String, ToolError> {
            Ok("# notes".into())
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = RoleRegistry::new().with_role("writer", Arc::new(Echo));
        assert!(registry.has_role("writer"));
        assert!(registry.get("reviewer").is_none());
        assert_eq!(registry.names(), vec!["writer".to_string()]);
    }

    #[tokio::test]
    async fn test_driver_role_maps_report() {
        let driver = IterationDriver::new(
            Arc::new(OneRead),
            Arc::new(Files),
            Arc::new(ToolCatalog::standard()),
            BoundedScheduler::with_concurrency(2),
        );
        let response = DriverRole::new(driver).execute_task("summarize notes").await;

        assert!(response.success);
        assert_eq!(response.payload.content, "notes summarized");
        assert_eq!(response.payload.actions, vec!["read_file".to_string()]);
    }
}
