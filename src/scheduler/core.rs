//! Scheduler implementation

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::Priority;
use crate::events::EventEmitter;

use super::config::SchedulerConfig;
use super::{BatchReport, Edge, NodeError, NodeOutcome, ScheduleError, ScheduleNode};

/// Bookkeeping kept for a node after its payload has been handed to the runner
struct NodeMeta {
    id: String,
    label: String,
    deps: Vec<Edge>,
    priority: Priority,
    parallel_safe: bool,
}

/// Dependency-aware, concurrency-bounded executor of async units of work
///
/// The same scheduler drives tool calls inside one reasoning iteration and
/// role tasks inside a workflow. It owns no shared state; each `run` is
/// independent.
#[derive(Debug, Clone)]
pub struct BoundedScheduler {
    config: SchedulerConfig,
}

impl BoundedScheduler {
    pub fn new(mut config: SchedulerConfig) -> Self {
        debug!(?config, "BoundedScheduler::new: called");
        if config.max_concurrent == 0 {
            warn!("BoundedScheduler::new: max_concurrent of 0 clamped to 1");
            config.max_concurrent = 1;
        }
        Self { config }
    }

    pub fn with_concurrency(max_concurrent: usize) -> Self {
        Self::new(SchedulerConfig::new(max_concurrent))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn max_concurrent(&self) -> usize {
        self.config.max_concurrent
    }

    /// Run every node to completion
    ///
    /// Each round starts ready parallel-safe nodes (highest priority first)
    /// while fewer than `max_concurrent` are running. An exclusive node only
    /// starts when nothing else is running and no parallel-safe node could
    /// start. The loop then waits for whichever running node finishes first.
    ///
    /// A failed dependency still unblocks its dependents unless the edge
    /// requires success, in which case the dependent is settled as skipped.
    pub async fn run<T, O, F, Fut>(
        &self,
        nodes: Vec<ScheduleNode<T>>,
        emitter: Option<&EventEmitter>,
        runner: F,
    ) -> Result<BatchReport<O>, ScheduleError<O>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<O, NodeError>>,
    {
        debug!(count = nodes.len(), max_concurrent = self.config.max_concurrent, "BoundedScheduler::run: called");
        let run_started = Instant::now();
        let mut report = BatchReport::default();

        if nodes.is_empty() {
            debug!("BoundedScheduler::run: empty batch");
            return Ok(report);
        }

        let mut ids = HashSet::new();
        for node in &nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(ScheduleError::DuplicateNode(node.id.clone()));
            }
        }

        report.estimated_serial = nodes.iter().map(|n| n.estimate).sum();

        let mut metas = Vec::with_capacity(nodes.len());
        let mut payloads = Vec::with_capacity(nodes.len());
        for node in nodes {
            metas.push(NodeMeta {
                id: node.id,
                label: node.label,
                deps: node.deps,
                priority: node.priority,
                parallel_safe: node.parallel_safe,
            });
            payloads.push(Some(node.payload));
        }

        // id -> succeeded, for every settled node
        let mut done: HashMap<String, bool> = HashMap::new();
        let mut in_flight = FuturesUnordered::new();
        let mut exclusive_running: Option<usize> = None;
        let limit = self.config.node_timeout();

        loop {
            settle_blocked(&metas, &mut payloads, &mut done, &mut report, emitter);

            let ready = ready_nodes(&metas, &payloads, &done);
            let (safe, exclusive): (Vec<usize>, Vec<usize>) = ready.into_iter().partition(|&i| metas[i].parallel_safe);

            let mut started_parallel = false;
            if exclusive_running.is_none() {
                for idx in safe {
                    if in_flight.len() >= self.config.max_concurrent {
                        break;
                    }
                    let Some(payload) = payloads[idx].take() else {
                        continue;
                    };
                    let meta = &metas[idx];
                    debug!(id = %meta.id, label = %meta.label, "BoundedScheduler::run: starting parallel-safe node");
                    if let Some(emitter) = emitter {
                        emitter.node_started(&meta.id, &meta.label);
                    }
                    in_flight.push(run_node(idx, runner(payload), limit));
                    started_parallel = true;
                }
            }

            if !started_parallel && in_flight.is_empty() {
                if let Some(&idx) = exclusive.first() {
                    if let Some(payload) = payloads[idx].take() {
                        let meta = &metas[idx];
                        debug!(id = %meta.id, label = %meta.label, "BoundedScheduler::run: starting exclusive node");
                        if let Some(emitter) = emitter {
                            emitter.node_started(&meta.id, &meta.label);
                        }
                        exclusive_running = Some(idx);
                        in_flight.push(run_node(idx, runner(payload), limit));
                    }
                }
            }

            report.peak_concurrency = report.peak_concurrency.max(in_flight.len());

            if in_flight.is_empty() {
                let stranded: Vec<String> = metas
                    .iter()
                    .zip(&payloads)
                    .filter(|(_, payload)| payload.is_some())
                    .map(|(meta, _)| meta.id.clone())
                    .collect();

                report.wall_time = run_started.elapsed();
                if stranded.is_empty() {
                    debug!(
                        succeeded = report.succeeded,
                        failed = report.failed,
                        "BoundedScheduler::run: all nodes settled"
                    );
                    return Ok(report);
                }

                warn!(?stranded, "BoundedScheduler::run: nothing ready and nothing running");
                return Err(ScheduleError::Unschedulable {
                    partial: report,
                    stranded,
                });
            }

            let Some(finished) = in_flight.next().await else {
                continue;
            };
            let (idx, started, result) = finished;
            if exclusive_running == Some(idx) {
                exclusive_running = None;
            }
            settle(&metas[idx], Some(started), result, &mut done, &mut report, emitter);
        }
    }
}

/// Drive one node's future, converting an expired deadline into a failure
///
/// On expiry the future is dropped; whatever it would have produced is
/// never observed.
async fn run_node<O, Fut>(
    idx: usize,
    fut: Fut,
    limit: Option<Duration>,
) -> (usize, (Instant, DateTime<Utc>), Result<O, NodeError>)
where
    Fut: Future<Output = Result<O, NodeError>>,
{
    let started = (Instant::now(), Utc::now());
    let result = match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(NodeError::TimedOut {
                timeout_ms: limit.as_millis() as u64,
            }),
        },
        None => fut.await,
    };
    (idx, started, result)
}

/// Pending nodes whose dependencies have all settled, highest priority first
///
/// Ties keep submission order.
fn ready_nodes<T>(metas: &[NodeMeta], payloads: &[Option<T>], done: &HashMap<String, bool>) -> Vec<usize> {
    let mut ready: Vec<usize> = (0..metas.len())
        .filter(|&i| payloads[i].is_some())
        .filter(|&i| metas[i].deps.iter().all(|edge| done.contains_key(&edge.id)))
        .collect();
    ready.sort_by_key(|&i| Reverse(metas[i].priority));
    ready
}

/// Settle, without running, every pending node whose success-required
/// dependency failed; repeats until no more nodes are affected
fn settle_blocked<T, O>(
    metas: &[NodeMeta],
    payloads: &mut [Option<T>],
    done: &mut HashMap<String, bool>,
    report: &mut BatchReport<O>,
    emitter: Option<&EventEmitter>,
) {
    loop {
        let blocked: Vec<(usize, String)> = (0..metas.len())
            .filter(|&i| payloads[i].is_some())
            .filter_map(|i| {
                metas[i]
                    .deps
                    .iter()
                    .find(|edge| edge.requires_success && done.get(&edge.id) == Some(&false))
                    .map(|edge| (i, edge.id.clone()))
            })
            .collect();

        if blocked.is_empty() {
            return;
        }

        for (idx, dependency) in blocked {
            payloads[idx] = None;
            debug!(id = %metas[idx].id, %dependency, "settle_blocked: skipping node");
            settle(&metas[idx], None, Err(NodeError::Skipped { dependency }), done, report, emitter);
        }
    }
}

/// Record a node's outcome exactly once
fn settle<O>(
    meta: &NodeMeta,
    started: Option<(Instant, DateTime<Utc>)>,
    result: Result<O, NodeError>,
    done: &mut HashMap<String, bool>,
    report: &mut BatchReport<O>,
    emitter: Option<&EventEmitter>,
) {
    if done.contains_key(&meta.id) {
        warn!(id = %meta.id, "settle: node already settled, ignoring late result");
        return;
    }

    let duration = started.map(|(instant, _)| instant.elapsed()).unwrap_or_default();
    let success = result.is_ok();
    done.insert(meta.id.clone(), success);

    if success {
        report.succeeded += 1;
    } else {
        report.failed += 1;
    }

    if let Some(emitter) = emitter {
        match &result {
            Ok(_) => emitter.node_completed(&meta.id, &meta.label, duration.as_millis() as u64),
            Err(err) => emitter.node_failed(&meta.id, &meta.label, &err.to_string(), duration.as_millis() as u64),
        }
    }

    debug!(id = %meta.id, success, ?duration, "settle: recorded outcome");
    report.outcomes.push(NodeOutcome {
        id: meta.id.clone(),
        label: meta.label.clone(),
        started_at: started.map(|(_, at)| at),
        ended_at: Utc::now(),
        duration,
        result,
    });
}
