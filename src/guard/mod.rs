//! Loop guard - stops a reasoning loop that keeps repeating itself
//!
//! The guard screens each iteration's proposals before they execute and
//! watches their outcomes afterwards. Its state lives exactly as long as one
//! task and is never shared between tasks.

mod error;
mod limits;

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Action, Fingerprint};
use crate::tools::ValidatedCall;

pub use error::LoopGuardAbort;
pub use limits::GuardLimits;

/// Anything the guard can screen
pub trait Fingerprinted {
    fn action_id(&self) -> &str;
    fn fingerprint(&self) -> &Fingerprint;
}

impl Fingerprinted for ValidatedCall {
    fn action_id(&self) -> &str {
        &self.id
    }

    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

impl Fingerprinted for Action {
    fn action_id(&self) -> &str {
        &self.id
    }

    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Why a proposal was dropped without aborting the task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Same fingerprint already succeeded earlier in the task
    AlreadySucceeded,
    /// Same fingerprint appeared earlier in the same batch
    DuplicateInBatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySucceeded => write!(f, "already succeeded"),
            Self::DuplicateInBatch => write!(f, "duplicate in batch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAction {
    pub id: String,
    pub fingerprint: Fingerprint,
    pub reason: SkipReason,
}

/// Outcome of screening one batch
#[derive(Debug, Clone)]
pub struct Screened<T> {
    pub admitted: Vec<T>,
    pub skipped: Vec<SkippedAction>,
}

/// Per-task guard bookkeeping
#[derive(Debug, Clone, Default)]
pub struct GuardState {
    attempts: HashMap<Fingerprint, u32>,
    succeeded: HashSet<Fingerprint>,
    /// Multiset of executed fingerprints
    executed: HashMap<Fingerprint, u32>,
    consecutive_failures: u32,
    last_failure: HashMap<Fingerprint, String>,
    last_error: Option<String>,
}

impl GuardState {
    pub fn attempts(&self, fingerprint: &Fingerprint) -> u32 {
        self.attempts.get(fingerprint).copied().unwrap_or(0)
    }

    pub fn executions(&self, fingerprint: &Fingerprint) -> u32 {
        self.executed.get(fingerprint).copied().unwrap_or(0)
    }

    pub fn has_succeeded(&self, fingerprint: &Fingerprint) -> bool {
        self.succeeded.contains(fingerprint)
    }

    /// Executions of any input of `tool`
    pub fn tool_uses(&self, tool: &str) -> u32 {
        self.executed
            .iter()
            .filter(|(fp, _)| fp.tool() == tool)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Stateful filter over one task's proposals
#[derive(Debug, Clone)]
pub struct LoopGuard {
    limits: GuardLimits,
    state: GuardState,
}

impl LoopGuard {
    pub fn new(limits: GuardLimits) -> Self {
        debug!(?limits, "LoopGuard::new: called");
        Self {
            limits,
            state: GuardState::default(),
        }
    }

    pub fn limits(&self) -> &GuardLimits {
        &self.limits
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Screen one batch in proposal order
    ///
    /// Each proposal is skipped if it already succeeded (or repeats an
    /// earlier proposal of this batch); otherwise the attempt, repeat and
    /// per-tool limits are checked and the first violation aborts the task.
    /// Admitted proposals count as attempted and executed immediately.
    pub fn screen<T: Fingerprinted>(&mut self, proposals: Vec<T>) -> Result<Screened<T>, LoopGuardAbort> {
        debug!(count = proposals.len(), "LoopGuard::screen: called");
        let mut admitted = Vec::with_capacity(proposals.len());
        let mut skipped = Vec::new();
        let mut in_batch = HashSet::new();

        for proposal in proposals {
            let fingerprint = proposal.fingerprint().clone();

            if self.state.succeeded.contains(&fingerprint) {
                debug!(%fingerprint, "LoopGuard::screen: already succeeded, skipping");
                skipped.push(SkippedAction {
                    id: proposal.action_id().to_string(),
                    fingerprint,
                    reason: SkipReason::AlreadySucceeded,
                });
                continue;
            }

            if in_batch.contains(&fingerprint) {
                debug!(%fingerprint, "LoopGuard::screen: duplicate in batch, skipping");
                skipped.push(SkippedAction {
                    id: proposal.action_id().to_string(),
                    fingerprint,
                    reason: SkipReason::DuplicateInBatch,
                });
                continue;
            }

            let attempts = self.state.attempts(&fingerprint);
            if attempts >= self.limits.max_attempts {
                let last_error = self
                    .state
                    .last_failure
                    .get(&fingerprint)
                    .cloned()
                    .or_else(|| self.state.last_error.clone())
                    .unwrap_or_else(|| "none recorded".to_string());
                info!(%fingerprint, attempts, "LoopGuard::screen: attempts exhausted");
                return Err(LoopGuardAbort::AttemptsExhausted {
                    fingerprint: fingerprint.to_string(),
                    attempts,
                    last_error,
                });
            }

            let executions = self.state.executions(&fingerprint);
            if executions > self.limits.max_repeats {
                info!(%fingerprint, executions, "LoopGuard::screen: repeated action");
                return Err(LoopGuardAbort::RepeatedAction {
                    fingerprint: fingerprint.to_string(),
                    executions,
                    last_error: self.state.last_error.clone(),
                });
            }

            let uses = self.state.tool_uses(fingerprint.tool());
            if uses >= self.limits.max_tool_uses {
                info!(tool = fingerprint.tool(), uses, "LoopGuard::screen: tool overuse");
                return Err(LoopGuardAbort::ToolOveruse {
                    tool: fingerprint.tool().to_string(),
                    uses,
                    last_error: self.state.last_error.clone(),
                });
            }

            *self.state.attempts.entry(fingerprint.clone()).or_insert(0) += 1;
            *self.state.executed.entry(fingerprint.clone()).or_insert(0) += 1;
            in_batch.insert(fingerprint);
            admitted.push(proposal);
        }

        debug!(admitted = admitted.len(), skipped = skipped.len(), "LoopGuard::screen: done");
        Ok(Screened { admitted, skipped })
    }

    /// A fingerprint executed successfully
    pub fn record_success(&mut self, fingerprint: &Fingerprint) {
        debug!(%fingerprint, "LoopGuard::record_success: called");
        self.state.succeeded.insert(fingerprint.clone());
        self.state.consecutive_failures = 0;
    }

    /// Something failed: an execution (with its fingerprint) or a proposal
    /// that never got that far
    ///
    /// Trips the circuit breaker once the consecutive-failure limit is reached.
    pub fn record_failure(&mut self, fingerprint: Option<&Fingerprint>, error: &str) -> Result<(), LoopGuardAbort> {
        self.state.consecutive_failures += 1;
        self.state.last_error = Some(error.to_string());
        if let Some(fingerprint) = fingerprint {
            self.state.last_failure.insert(fingerprint.clone(), error.to_string());
        }
        debug!(
            consecutive = self.state.consecutive_failures,
            %error,
            "LoopGuard::record_failure: called"
        );

        if self.state.consecutive_failures >= self.limits.max_consecutive_failures {
            info!(failures = self.state.consecutive_failures, "LoopGuard::record_failure: circuit breaker tripped");
            return Err(LoopGuardAbort::ConsecutiveFailures {
                failures: self.state.consecutive_failures,
                last_error: error.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for LoopGuard {
    fn default() -> Self {
        Self::new(GuardLimits::default())
    }
}
