//! WorkflowExecutor - runs a task graph across roles

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{RoleResponse, WorkflowResult};
use crate::events::EventBus;
use crate::scheduler::{BoundedScheduler, Edge, NodeError, ScheduleError, ScheduleNode, SchedulerConfig};

use super::{RoleRegistry, SynthesizedOutcome, WorkflowError, WorkflowGraph, synthesize};

/// Everything a workflow run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub workflow_id: String,
    /// In completion order
    pub results: Vec<WorkflowResult>,
    pub synthesis: SynthesizedOutcome,
}

/// What the scheduler hands the runner for each task node
struct RoleJob {
    task_id: String,
    role: String,
    description: String,
}

/// Executes a validated `WorkflowGraph` on a role-level scheduler
pub struct WorkflowExecutor {
    roles: Arc<RoleRegistry>,
    scheduler: BoundedScheduler,
    events: Option<Arc<EventBus>>,
}

impl WorkflowExecutor {
    pub fn new(roles: Arc<RoleRegistry>, scheduler: BoundedScheduler) -> Self {
        debug!(max_concurrent = scheduler.max_concurrent(), "WorkflowExecutor::new: called");
        Self {
            roles,
            scheduler,
            events: None,
        }
    }

    /// Role parallelism bounds the scheduler; the task timeout bounds each node
    pub fn from_config(config: &Config, roles: Arc<RoleRegistry>) -> Self {
        let scheduler = BoundedScheduler::new(
            SchedulerConfig::new(config.concurrency.role_parallelism).with_timeout_ms(config.timeouts.task_timeout_ms),
        );
        Self::new(roles, scheduler)
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Validate, then run every task node and synthesize the results
    ///
    /// Nothing runs when validation fails. A failed task never fails its
    /// dependents unless the edge is success-required.
    pub async fn execute(&self, graph: &WorkflowGraph) -> Result<WorkflowReport, WorkflowError> {
        debug!(tasks = graph.len(), name = ?graph.name, "WorkflowExecutor::execute: called");
        graph.validate(Some(&self.roles))?;

        let workflow_id = Uuid::now_v7().to_string();
        let emitter = self.events.as_ref().map(|bus| bus.emitter_for(workflow_id.as_str()));
        if let Some(emitter) = &emitter {
            emitter.workflow_started(graph.len());
        }

        let nodes: Vec<ScheduleNode<RoleJob>> = graph
            .tasks
            .iter()
            .map(|task| ScheduleNode {
                id: task.id.clone(),
                label: task.role.clone(),
                deps: task
                    .deps
                    .iter()
                    .map(|dep| Edge {
                        id: dep.id.clone(),
                        requires_success: dep.requires_success,
                    })
                    .collect(),
                priority: task.priority,
                parallel_safe: true,
                estimate: std::time::Duration::from_millis(task.estimated_ms),
                payload: RoleJob {
                    task_id: task.id.clone(),
                    role: task.role.clone(),
                    description: task.description.clone(),
                },
            })
            .collect();

        // Failed responses keep their payload here; the scheduler only sees the error
        let failures: Arc<Mutex<HashMap<String, RoleResponse>>> = Arc::new(Mutex::new(HashMap::new()));

        let roles = self.roles.clone();
        let sink = failures.clone();
        let result = self
            .scheduler
            .run(nodes, emitter.as_ref(), move |job: RoleJob| {
                let role = roles.get(&job.role);
                let sink = sink.clone();
                async move {
                    let Some(role) = role else {
                        return Err(NodeError::Failed(format!("unknown role `{}`", job.role)));
                    };
                    let response = role.execute_task(&job.description).await;
                    if response.success {
                        return Ok(response);
                    }
                    let message = response
                        .error
                        .clone()
                        .unwrap_or_else(|| format!("role `{}` reported failure", job.role));
                    if let Ok(mut failed) = sink.lock() {
                        failed.insert(job.task_id, response);
                    }
                    Err(NodeError::Failed(message))
                }
            })
            .await;

        let report = match result {
            Ok(report) => report,
            Err(ScheduleError::DuplicateNode(id)) => return Err(WorkflowError::DuplicateTask(id)),
            Err(ScheduleError::Unschedulable { stranded, .. }) => {
                warn!(?stranded, "WorkflowExecutor::execute: graph stalled");
                return Err(WorkflowError::Unschedulable { stranded });
            }
        };

        let mut failed = failures.lock().map(|mut map| std::mem::take(&mut *map)).unwrap_or_default();
        let results: Vec<WorkflowResult> = report
            .outcomes
            .into_iter()
            .map(|outcome| {
                let role = graph.get(&outcome.id).map(|t| t.role.clone()).unwrap_or_default();
                let duration_ms = outcome.duration.as_millis() as u64;
                let result = match outcome.result {
                    Ok(response) => response,
                    Err(err) => failed
                        .remove(&outcome.id)
                        .unwrap_or_else(|| RoleResponse::failed(err.to_string())),
                };
                WorkflowResult {
                    task_id: outcome.id,
                    role,
                    success: result.success,
                    result,
                    duration_ms,
                }
            })
            .collect();

        let synthesis = synthesize(&results, report.wall_time, report.estimated_serial);
        info!(
            %workflow_id,
            success = synthesis.success,
            succeeded = synthesis.stats.succeeded,
            failed = synthesis.stats.failed,
            "WorkflowExecutor::execute: finished"
        );
        if let Some(emitter) = &emitter {
            emitter.workflow_completed(
                synthesis.success,
                synthesis.stats.succeeded,
                synthesis.stats.failed,
                synthesis.stats.wall_time_ms,
            );
        }

        Ok(WorkflowReport {
            workflow_id,
            results,
            synthesis,
        })
    }
}
