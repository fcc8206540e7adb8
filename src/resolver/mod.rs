//! Dependency resolver for one batch of proposed actions
//!
//! Infers a safe execution order from resource conflicts:
//! - a read of R waits for every earlier write to R
//! - a write to R waits for every earlier action touching R, and is
//!   serialized (not parallel-safe) when R has more than one writer in the batch
//! - an external command waits for every earlier read and write; unless it is
//!   on the read-only allow-list it also waits for earlier commands, is
//!   exclusive, and fences everything after it
//!
//! Resources are paths: a directory overlaps every path beneath it, and `.`
//! overlaps the whole working tree.
//!
//! Priorities are assigned per kind and only break ties between ready actions.

mod allowlist;

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{Action, Priority, ResourceAccess};
use crate::tools::{Effect, ValidatedCall, ValidationError};

pub use allowlist::is_read_only_command;

/// Annotate a batch with dependency edges and parallel-safety
///
/// Edges only ever point at earlier actions of the same batch, so the result
/// is acyclic by construction.
pub fn resolve(calls: Vec<ValidatedCall>) -> Result<Vec<Action>, ValidationError> {
    debug!(count = calls.len(), "resolve: called");

    let mut seen = HashSet::new();
    for call in &calls {
        if !seen.insert(call.id.as_str()) {
            return Err(ValidationError::DuplicateId(call.id.clone()));
        }
    }

    let accesses: Vec<ResourceAccess> = calls.iter().map(classify).collect();
    let mut actions = Vec::with_capacity(calls.len());

    for (idx, call) in calls.into_iter().enumerate() {
        let access = &accesses[idx];
        let earlier = &accesses[..idx];

        let deps: Vec<String> = earlier
            .iter()
            .enumerate()
            .filter(|(_, prior)| must_follow(access, prior))
            .map(|(j, _)| actions_id(&actions, j))
            .collect();

        let parallel_safe = match access {
            ResourceAccess::Read { .. } => true,
            ResourceAccess::Write { resource } => {
                accesses
                    .iter()
                    .enumerate()
                    .filter(|(j, other)| *j != idx && other.is_write() && other.touches(resource))
                    .count()
                    == 0
            }
            ResourceAccess::External { read_only, .. } => *read_only,
        };

        debug!(id = %call.id, ?access, ?deps, parallel_safe, "resolve: annotated action");
        actions.push(Action {
            id: call.id,
            tool: call.tool,
            input: call.input,
            priority: priority_for(access),
            access: access.clone(),
            fingerprint: call.fingerprint,
            deps,
            parallel_safe,
            estimate: call.estimate,
        });
    }

    Ok(actions)
}

fn actions_id(actions: &[Action], idx: usize) -> String {
    actions[idx].id.clone()
}

/// Whether `current` has to wait for the earlier action `prior`
fn must_follow(current: &ResourceAccess, prior: &ResourceAccess) -> bool {
    if prior.is_mutating_external() {
        return true;
    }

    match current {
        ResourceAccess::Read { resource } => prior.is_write() && prior.touches(resource),
        ResourceAccess::Write { resource } => prior.touches(resource),
        ResourceAccess::External { read_only: true, .. } => prior.resource().is_some(),
        ResourceAccess::External { read_only: false, .. } => true,
    }
}

/// Map a validated call onto the resource it touches
pub fn classify(call: &ValidatedCall) -> ResourceAccess {
    match call.effect {
        Effect::Read => ResourceAccess::Read {
            resource: normalize_resource(&call.target),
        },
        Effect::Write => ResourceAccess::Write {
            resource: normalize_resource(&call.target),
        },
        Effect::External => ResourceAccess::External {
            command: call.target.clone(),
            read_only: is_read_only_command(&call.target),
        },
    }
}

fn priority_for(access: &ResourceAccess) -> Priority {
    match access {
        ResourceAccess::Read { .. } => Priority::High,
        ResourceAccess::Write { .. } => Priority::Normal,
        ResourceAccess::External { read_only: true, .. } => Priority::Normal,
        ResourceAccess::External { read_only: false, .. } => Priority::Low,
    }
}

/// Normalize a path-like resource name so `./src/a.rs`, `src//a.rs` and
/// `src\a.rs` compare equal
pub fn normalize_resource(raw: &str) -> String {
    let unified = raw.trim().replace('\\', "/");
    let parts: Vec<&str> = unified.split('/').filter(|p| !p.is_empty() && *p != ".").collect();

    let joined = parts.join("/");
    if unified.starts_with('/') {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
