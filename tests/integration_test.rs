//! Integration tests for taskloom
//!
//! These tests drive the public API end to end: resolver into scheduler,
//! the iteration driver with its loop guard, and role workflows.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use taskloom::config::Config;
use taskloom::domain::{ProposedAction, RolePayload, RoleResponse, TaskNode, ToolInput};
use taskloom::driver::{IterationDriver, IterationRecord, Planner, PlannerDecision, PlannerError, TaskOutcome};
use taskloom::events::EventBus;
use taskloom::resolver;
use taskloom::scheduler::{BoundedScheduler, NodeError, ScheduleError, ScheduleNode};
use taskloom::tools::{ToolCatalog, ToolError, ToolInvoker};
use taskloom::workflow::{Role, RoleRegistry, WorkflowError, WorkflowExecutor, WorkflowGraph};
use tokio::time::Instant;

// =============================================================================
// Test doubles
// =============================================================================

/// Replays decisions, then answers
struct Script {
    replies: Mutex<VecDeque<PlannerDecision>>,
}

impl Script {
    fn new(batches: Vec<Vec<ProposedAction>>) -> Arc<Self> {
        let replies = batches
            .into_iter()
            .map(|actions| PlannerDecision::Actions {
                rationale: "keep going".into(),
                actions,
            })
            .collect();
        Arc::new(Self {
            replies: Mutex::new(replies),
        })
    }
}

#[async_trait]
impl Planner for Script {
    async fn propose(&self, _task: &str, _history: &[IterationRecord]) -> Result<PlannerDecision, PlannerError> {
        Ok(self.replies.lock().unwrap().pop_front().unwrap_or(PlannerDecision::FinalAnswer {
            rationale: "nothing left".into(),
            answer: "finished".into(),
        }))
    }
}

/// Sleeps 10ms per call, fails `run_command`, and tracks overlap
#[derive(Default)]
struct Workbench {
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    order: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolInvoker for Workbench {
    async fn invoke(&self, name: &str, input: &ToolInput) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.order.lock().unwrap().push(name.to_string());

        tokio::time::sleep(Duration::from_millis(10)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        if name == "run_command" {
            let command = input.get("command").and_then(|v| v.as_str()).unwrap_or_default();
            return Err(ToolError::failed(name, format!("`{command}` exited with 1")));
        }
        Ok(format!("{name} ok"))
    }
}

fn driver(planner: Arc<Script>, tools: Arc<Workbench>, parallelism: usize) -> IterationDriver {
    IterationDriver::new(
        planner,
        tools,
        Arc::new(ToolCatalog::standard()),
        BoundedScheduler::with_concurrency(parallelism),
    )
}

fn act(tool: &str, input: serde_json::Value) -> ProposedAction {
    ProposedAction::new(tool, input)
}

// =============================================================================
// Resolver + Scheduler
// =============================================================================

#[test]
fn test_read_write_read_resolves_to_chain() {
    let catalog = ToolCatalog::standard();
    let calls = vec![
        catalog.validate(act("read_file", json!({"path": "a.txt"})), "r1").unwrap(),
        catalog
            .validate(act("write_file", json!({"path": "./a.txt", "content": "new"})), "w")
            .unwrap(),
        catalog.validate(act("read_file", json!({"file_path": "a.txt"})), "r2").unwrap(),
    ];

    let actions = resolver::resolve(calls).unwrap();
    assert!(actions[0].deps.is_empty());
    assert_eq!(actions[1].deps, vec!["r1".to_string()]);
    assert!(actions[2].deps.contains(&"w".to_string()));
    assert!(!actions[1].parallel_safe);
}

#[test]
fn test_disjoint_batch_is_fully_parallel() {
    let catalog = ToolCatalog::standard();
    let calls = ["a.rs", "b.rs", "c.rs"]
        .iter()
        .enumerate()
        .map(|(i, path)| {
            catalog
                .validate(act("read_file", json!({ "path": path })), &format!("1-{}", i + 1))
                .unwrap()
        })
        .collect();

    let actions = resolver::resolve(calls).unwrap();
    assert!(actions.iter().all(|a| a.deps.is_empty() && a.parallel_safe));
}

#[tokio::test(start_paused = true)]
async fn test_read_write_read_runs_sequentially_under_bound_three() {
    let tools = Arc::new(Workbench::default());
    let planner = Script::new(vec![vec![
        act("read_file", json!({"path": "a.txt"})),
        act("write_file", json!({"path": "a.txt", "content": "x"})),
        act("read_file", json!({"path": "a.txt", "limit": 10})),
    ]]);

    let report = driver(planner, tools.clone(), 3).run("rewrite a.txt").await;

    assert!(report.outcome.is_success());
    assert_eq!(tools.peak.load(Ordering::SeqCst), 1);
    assert_eq!(*tools.order.lock().unwrap(), vec!["read_file", "write_file", "read_file"]);
    let execution = report.iterations[0].execution.as_ref().unwrap();
    assert!(execution.total_duration_ms >= 30);
}

#[tokio::test]
async fn test_cycle_terminates_with_stranded_nodes() {
    let nodes = vec![
        ScheduleNode::new("a", ()).depends_on("c"),
        ScheduleNode::new("b", ()).depends_on("a"),
        ScheduleNode::new("c", ()).depends_on("b"),
        ScheduleNode::new("free", ()),
    ];
    let result = BoundedScheduler::with_concurrency(2)
        .run(nodes, None, |_: ()| async { Ok::<_, NodeError>(()) })
        .await;

    match result {
        Err(ScheduleError::Unschedulable { partial, stranded }) => {
            assert_eq!(partial.completion_order(), vec!["free"]);
            assert_eq!(stranded, vec!["a", "b", "c"]);
        }
        other => panic!("expected unschedulable, got {:?}", other.map(|r| r.succeeded)),
    }
}

// =============================================================================
// Iteration driver + loop guard
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_succeeded_action_skipped_on_repeat_proposals() {
    let tools = Arc::new(Workbench::default());
    let status = || vec![act("git_status", json!({}))];
    let report = driver(Script::new(vec![status(), status(), status()]), tools.clone(), 3)
        .run("check status")
        .await;

    assert_eq!(tools.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.stats.skipped, 2);
    assert!(report.outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_two_failures_abort_with_second_message() {
    let tools = Arc::new(Workbench::default());
    let planner = Script::new(vec![
        vec![act("run_command", json!({"command": "cargo build"}))],
        vec![act("run_command", json!({"command": "make"}))],
        vec![act("read_file", json!({"path": "never.rs"}))],
    ]);
    let report = driver(planner, tools.clone(), 3).run("build it").await;

    match &report.outcome {
        TaskOutcome::Aborted { reason } => {
            assert!(reason.contains("2 consecutive failures"));
            assert!(reason.contains("`make` exited with 1"));
        }
        other => panic!("expected abort, got {other:?}"),
    }
    assert_eq!(tools.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fifth_distinct_call_to_one_tool_is_blocked() {
    let tools = Arc::new(Workbench::default());
    let batches = (0..5)
        .map(|i| vec![act("search_files", json!({"pattern": format!("needle{i}")}))])
        .collect();
    let report = driver(Script::new(batches), tools.clone(), 3).run("search").await;

    assert_eq!(report.outcome.kind(), "aborted");
    assert!(report.outcome.message().contains("search_files"));
    assert_eq!(tools.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_driver_from_config_honours_limits() {
    let mut config = Config::default();
    config.driver.max_iterations = 2;
    config.cache.enabled = false;

    let tools = Arc::new(Workbench::default());
    let batches = (0..4)
        .map(|i| vec![act("list_directory", json!({"path": format!("d{i}")}))])
        .collect();
    let driver = IterationDriver::from_config(&config, Script::new(batches), tools.clone());
    let report = driver.run("walk the tree").await;

    assert_eq!(report.outcome.kind(), "best-effort");
    assert_eq!(report.iterations.len(), 2);
    assert_eq!(tools.calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Workflows
// =============================================================================

/// Sleeps for the number of milliseconds in the description
struct Timed {
    starts: Mutex<Vec<(String, Instant)>>,
}

#[async_trait]
impl Role for Timed {
    async fn execute_task(&self, description: &str) -> RoleResponse {
        self.starts.lock().unwrap().push((description.to_string(), Instant::now()));
        let ms: u64 = description.parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        RoleResponse::ok(RolePayload {
            content: format!("{ms}ms of work"),
            actions: vec!["work".into()],
            suggestions: Vec::new(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_workflow_wall_time_follows_critical_path() {
    let role = Arc::new(Timed {
        starts: Mutex::new(Vec::new()),
    });
    let registry = RoleRegistry::new().with_role("worker", role.clone());
    let executor = WorkflowExecutor::new(Arc::new(registry), BoundedScheduler::with_concurrency(2));

    let graph = WorkflowGraph::from_yaml(
        r#"
tasks:
  - { id: a, role: worker, description: "200", estimated-ms: 200 }
  - { id: b, role: worker, description: "100", estimated-ms: 100, deps: [a] }
  - { id: c, role: worker, description: "150", estimated-ms: 150 }
"#,
    )
    .unwrap();

    let started = Instant::now();
    let report = executor.execute(&graph).await.unwrap();

    let starts = role.starts.lock().unwrap().clone();
    let start_of = |d: &str| starts.iter().find(|(desc, _)| desc == d).map(|(_, at)| *at).unwrap();
    assert_eq!(start_of("200"), started);
    assert_eq!(start_of("150"), started);
    assert!(start_of("100") >= started + Duration::from_millis(200));

    // max(a, c) + b
    let stats = &report.synthesis.stats;
    assert!((300..320).contains(&stats.wall_time_ms), "wall {}ms", stats.wall_time_ms);
    assert_eq!(stats.succeeded, 3);
    assert_eq!(report.synthesis.actions, vec!["work".to_string()]);
}

#[tokio::test]
async fn test_workflow_cycle_reported_before_running() {
    let role = Arc::new(Timed {
        starts: Mutex::new(Vec::new()),
    });
    let registry = RoleRegistry::new().with_role("worker", role.clone());
    let executor = WorkflowExecutor::new(Arc::new(registry), BoundedScheduler::with_concurrency(2))
        .with_events(Arc::new(EventBus::new(16)));

    let graph = WorkflowGraph::new(vec![
        TaskNode::new("plan", "worker", "1"),
        TaskNode::new("build", "worker", "1").depends_on("plan").depends_on("test"),
        TaskNode::new("test", "worker", "1").depends_on("build"),
    ]);
    let err = executor.execute(&graph).await.unwrap_err();

    let WorkflowError::Cycle(nodes) = &err else {
        panic!("expected cycle, got {err}");
    };
    assert_eq!(nodes.len(), 2);
    assert!(!nodes.contains(&"plan".to_string()));
    assert!(role.starts.lock().unwrap().is_empty());
}
