//! IterationDriver - the per-task reasoning loop

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{Action, ExecutionResult, Fingerprint, ProposedAction, ToolInput};
use crate::events::{EventBus, EventEmitter};
use crate::guard::{GuardLimits, LoopGuard, LoopGuardAbort};
use crate::resolver;
use crate::scheduler::{BatchReport, BoundedScheduler, Edge, NodeError, ScheduleError, ScheduleNode, SchedulerConfig};
use crate::tools::{CachingInvoker, ToolCatalog, ToolInvoker, ValidatedCall, ValidationError};

use super::{
    IterationRecord, ParallelExecutionResult, Planner, PlannerDecision, PlannerError, RejectedAction, TaskOutcome,
    TaskReport, TaskStats,
};

/// Default iteration budget
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Runs one task: plan, validate, guard, resolve, schedule, repeat
///
/// Each `run` owns a fresh `LoopGuard`; nothing carries over between tasks.
pub struct IterationDriver {
    planner: Arc<dyn Planner>,
    invoker: Arc<dyn ToolInvoker>,
    catalog: Arc<ToolCatalog>,
    scheduler: BoundedScheduler,
    limits: GuardLimits,
    max_iterations: u32,
    task_timeout: Option<Duration>,
    events: Option<Arc<EventBus>>,
}

/// Fields of an action still needed after its payload moves into the scheduler
struct Pending {
    tool: String,
    input: ToolInput,
    fingerprint: Fingerprint,
}

/// Scheduler output for one batch plus the bookkeeping to interpret it
struct BatchRun {
    report: BatchReport<String>,
    pending: HashMap<String, Pending>,
    stranded: Vec<String>,
}

impl IterationDriver {
    pub fn new(
        planner: Arc<dyn Planner>,
        invoker: Arc<dyn ToolInvoker>,
        catalog: Arc<ToolCatalog>,
        scheduler: BoundedScheduler,
    ) -> Self {
        debug!(max_concurrent = scheduler.max_concurrent(), "IterationDriver::new: called");
        Self {
            planner,
            invoker,
            catalog,
            scheduler,
            limits: GuardLimits::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            task_timeout: None,
            events: None,
        }
    }

    /// Build from configuration: standard catalog, tool-level scheduler and,
    /// when enabled, the lookup cache in front of `invoker`
    pub fn from_config(config: &Config, planner: Arc<dyn Planner>, invoker: Arc<dyn ToolInvoker>) -> Self {
        debug!("IterationDriver::from_config: called");
        let catalog = Arc::new(ToolCatalog::standard());
        let invoker: Arc<dyn ToolInvoker> = if config.cache.enabled {
            Arc::new(CachingInvoker::new(invoker, catalog.clone(), config.cache.ttl()))
        } else {
            invoker
        };
        let scheduler = BoundedScheduler::new(
            SchedulerConfig::new(config.concurrency.tool_parallelism).with_timeout_ms(config.timeouts.tool_timeout_ms),
        );

        Self::new(planner, invoker, catalog, scheduler)
            .with_limits(config.guard)
            .with_max_iterations(config.driver.max_iterations)
            .with_task_timeout(config.timeouts.task_timeout())
    }

    pub fn with_limits(mut self, limits: GuardLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Checked before each iteration; an overrun ends the task as failed
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Run a task to a terminal outcome under a fresh id
    pub async fn run(&self, task: &str) -> TaskReport {
        self.run_with_id(Uuid::now_v7().to_string(), task).await
    }

    pub async fn run_with_id(&self, task_id: String, task: &str) -> TaskReport {
        info!(%task_id, "IterationDriver::run: starting task");
        let started = Instant::now();
        let emitter = self.events.as_ref().map(|bus| bus.emitter_for(task_id.as_str()));
        if let Some(emitter) = &emitter {
            emitter.task_started(task);
        }

        let mut guard = LoopGuard::new(self.limits);
        let mut history: Vec<IterationRecord> = Vec::new();
        let mut outcome = None;

        for iteration in 1..=self.max_iterations {
            if let Some(limit) = self.task_timeout {
                if started.elapsed() >= limit {
                    warn!(%task_id, iteration, "IterationDriver::run: task time budget exceeded");
                    outcome = Some(TaskOutcome::Failed {
                        message: format!("Task exceeded its time budget of {}ms", limit.as_millis()),
                    });
                    break;
                }
            }

            debug!(%task_id, iteration, "IterationDriver::run: iteration started");
            if let Some(emitter) = &emitter {
                emitter.iteration_started(iteration);
            }

            let decision = match self.planner.propose(task, &history).await {
                Ok(decision) => decision,
                Err(PlannerError::Unparseable { raw }) => {
                    debug!(%task_id, "IterationDriver::run: unparseable reply, treating as final answer");
                    PlannerDecision::FinalAnswer {
                        rationale: "reply was not a structured decision".to_string(),
                        answer: raw,
                    }
                }
                Err(err) => {
                    warn!(%task_id, error = %err, "IterationDriver::run: planner failed");
                    outcome = Some(TaskOutcome::Failed {
                        message: err.to_string(),
                    });
                    break;
                }
            };

            let (rationale, proposals) = match decision {
                PlannerDecision::FinalAnswer { rationale, answer } => {
                    history.push(IterationRecord::new(iteration, rationale));
                    outcome = Some(TaskOutcome::Completed { answer });
                    break;
                }
                PlannerDecision::Actions { actions, rationale } if actions.is_empty() => {
                    history.push(IterationRecord::new(iteration, rationale));
                    outcome = Some(TaskOutcome::Completed { answer: String::new() });
                    break;
                }
                PlannerDecision::Actions { rationale, actions } => (rationale, actions),
            };

            let mut record = IterationRecord::new(iteration, rationale);
            let step = self
                .step(iteration, proposals, &mut guard, &mut record, emitter.as_ref())
                .await;
            history.push(record);

            if let Err(terminal) = step {
                outcome = Some(terminal);
                break;
            }
        }

        let outcome = outcome.unwrap_or_else(|| best_effort(self.max_iterations, &history));
        if let (TaskOutcome::Aborted { reason }, Some(emitter)) = (&outcome, &emitter) {
            emitter.guard_aborted(reason);
        }
        if let Some(emitter) = &emitter {
            emitter.task_completed(outcome.kind(), history.len() as u32);
        }

        let stats = TaskStats::from_records(&history, started.elapsed().as_millis() as u64);
        info!(%task_id, outcome = outcome.kind(), iterations = stats.iterations, "IterationDriver::run: task finished");
        TaskReport {
            task_id,
            task: task.to_string(),
            outcome,
            iterations: history,
            stats,
        }
    }

    /// One batch: validate, screen, resolve, execute, feed outcomes back to
    /// the guard. `Err` carries the terminal outcome.
    async fn step(
        &self,
        iteration: u32,
        proposals: Vec<ProposedAction>,
        guard: &mut LoopGuard,
        record: &mut IterationRecord,
        emitter: Option<&EventEmitter>,
    ) -> Result<(), TaskOutcome> {
        let calls = self.validate_batch(iteration, proposals, guard, record)?;

        let screened = guard.screen(calls).map_err(aborted)?;
        for skip in &screened.skipped {
            if let Some(emitter) = emitter {
                emitter.action_skipped(&skip.id, skip.fingerprint.as_str(), &skip.reason.to_string());
            }
        }
        record.skipped = screened.skipped;

        if screened.admitted.is_empty() {
            debug!(iteration, "IterationDriver::step: nothing admitted");
            return Ok(());
        }

        let actions = resolver::resolve(screened.admitted).map_err(|err| TaskOutcome::Failed {
            message: err.to_string(),
        })?;

        let run = self.execute(actions, emitter).await;
        let execution = to_execution_result(&run);

        // outcomes are fed back in completion order
        let mut abort = None;
        for result in &execution.results {
            let Some(pending) = run.pending.get(&result.id) else {
                continue;
            };
            if result.success {
                guard.record_success(&pending.fingerprint);
            } else if let Err(err) = guard.record_failure(Some(&pending.fingerprint), result.observation()) {
                abort = Some(err);
                break;
            }
        }
        record.execution = Some(execution);

        if let Some(err) = abort {
            return Err(aborted(err));
        }
        if !run.stranded.is_empty() {
            return Err(TaskOutcome::Failed {
                message: format!(
                    "Could not schedule this step's actions; never started: {}",
                    run.stranded.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Check every proposal against the catalog; rejections are recorded and
    /// count as failures for the circuit breaker
    fn validate_batch(
        &self,
        iteration: u32,
        proposals: Vec<ProposedAction>,
        guard: &mut LoopGuard,
        record: &mut IterationRecord,
    ) -> Result<Vec<ValidatedCall>, TaskOutcome> {
        let mut calls = Vec::with_capacity(proposals.len());
        let mut ids = HashSet::new();

        for (index, proposed) in proposals.into_iter().enumerate() {
            let fallback_id = format!("{}-{}", iteration, index + 1);
            let tool = proposed.tool.clone();
            let id = proposed.id.clone().unwrap_or_else(|| fallback_id.clone());

            let validated = self.catalog.validate(proposed, &fallback_id).and_then(|call| {
                if ids.insert(call.id.clone()) {
                    Ok(call)
                } else {
                    Err(ValidationError::DuplicateId(call.id))
                }
            });

            match validated {
                Ok(call) => calls.push(call),
                Err(err) => {
                    let error = err.to_string();
                    debug!(%id, %tool, %error, "IterationDriver::validate_batch: rejected");
                    record.rejected.push(RejectedAction {
                        id,
                        tool,
                        error: error.clone(),
                    });
                    guard.record_failure(None, &error).map_err(aborted)?;
                }
            }
        }

        Ok(calls)
    }

    /// Run a resolved batch on the tool-level scheduler
    async fn execute(&self, actions: Vec<Action>, emitter: Option<&EventEmitter>) -> BatchRun {
        let mut pending = HashMap::with_capacity(actions.len());
        let mut nodes = Vec::with_capacity(actions.len());

        for action in actions {
            pending.insert(
                action.id.clone(),
                Pending {
                    tool: action.tool.clone(),
                    input: action.input.clone(),
                    fingerprint: action.fingerprint.clone(),
                },
            );
            nodes.push(ScheduleNode {
                id: action.id.clone(),
                label: action.tool.clone(),
                deps: action
                    .deps
                    .iter()
                    .map(|id| Edge {
                        id: id.clone(),
                        requires_success: false,
                    })
                    .collect(),
                priority: action.priority,
                parallel_safe: action.parallel_safe,
                estimate: action.estimate,
                payload: action,
            });
        }

        let invoker = self.invoker.clone();
        let result = self
            .scheduler
            .run(nodes, emitter, move |action: Action| {
                let invoker = invoker.clone();
                async move {
                    invoker
                        .invoke(&action.tool, &action.input)
                        .await
                        .map_err(|err| NodeError::Failed(err.to_string()))
                }
            })
            .await;

        let (report, stranded) = match result {
            Ok(report) => (report, Vec::new()),
            Err(ScheduleError::Unschedulable { partial, stranded }) => {
                warn!(?stranded, "IterationDriver::execute: batch unschedulable");
                (partial, stranded)
            }
            Err(ScheduleError::DuplicateNode(id)) => {
                // ids are deduplicated during validation
                warn!(%id, "IterationDriver::execute: duplicate node");
                (BatchReport::default(), vec![id])
            }
        };

        BatchRun {
            report,
            pending,
            stranded,
        }
    }
}

fn aborted(err: LoopGuardAbort) -> TaskOutcome {
    TaskOutcome::Aborted {
        reason: err.to_string(),
    }
}

fn to_execution_result(run: &BatchRun) -> ParallelExecutionResult {
    let BatchRun {
        report,
        pending,
        stranded,
    } = run;

    let results = report
        .outcomes
        .iter()
        .map(|outcome| {
            let (name, input) = pending
                .get(&outcome.id)
                .map(|p| (p.tool.clone(), p.input.clone()))
                .unwrap_or_else(|| (outcome.label.clone(), ToolInput::new()));
            let (output, error) = match &outcome.result {
                Ok(output) => (Some(output.clone()), None),
                Err(err) => (None, Some(err.to_string())),
            };
            ExecutionResult {
                id: outcome.id.clone(),
                name,
                input,
                output,
                error,
                started_at: outcome.started_at,
                ended_at: outcome.ended_at,
                duration_ms: outcome.duration_ms(),
                success: outcome.is_success(),
            }
        })
        .collect();

    ParallelExecutionResult {
        results,
        total_duration_ms: report.wall_time.as_millis() as u64,
        succeeded: report.succeeded,
        failed: report.failed,
        parallelization_gain: report.parallelization_gain(),
        peak_concurrency: report.peak_concurrency,
        stranded: stranded.clone(),
    }
}

fn best_effort(max_iterations: u32, history: &[IterationRecord]) -> TaskOutcome {
    let executed: usize = history.iter().map(|r| r.results().len()).sum();
    let succeeded: usize = history
        .iter()
        .flat_map(|r| r.results())
        .filter(|r| r.success)
        .count();
    let last = history
        .iter()
        .rev()
        .flat_map(|r| r.results().iter().rev())
        .find(|r| r.success)
        .map(|r| r.observation().to_string());

    let mut summary = format!(
        "Iteration budget of {} exhausted after {} actions ({} succeeded).",
        max_iterations, executed, succeeded
    );
    if let Some(last) = last {
        summary.push_str(&format!(" Last result: {}", last));
    }
    TaskOutcome::BestEffort { summary }
}
