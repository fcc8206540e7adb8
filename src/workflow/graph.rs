//! WorkflowGraph - author-declared task DAG

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::TaskNode;

use super::{RoleRegistry, WorkflowError};

/// A set of task nodes with explicit dependencies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub tasks: Vec<TaskNode>,
}

/// DFS colouring for cycle detection
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

impl WorkflowGraph {
    pub fn new(tasks: Vec<TaskNode>) -> Self {
        Self { name: None, tasks }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn get(&self, id: &str) -> Option<&TaskNode> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check ids, edges and (when given) role assignments, then look for a cycle
    pub fn validate(&self, roles: Option<&RoleRegistry>) -> Result<(), WorkflowError> {
        debug!(tasks = self.tasks.len(), "WorkflowGraph::validate: called");
        let mut ids = HashSet::new();
        for task in &self.tasks {
            if !ids.insert(task.id.as_str()) {
                return Err(WorkflowError::DuplicateTask(task.id.clone()));
            }
        }

        for task in &self.tasks {
            if let Some(dependency) = task.dep_ids().find(|dep| !ids.contains(dep)) {
                return Err(WorkflowError::UnknownDependency {
                    task: task.id.clone(),
                    dependency: dependency.to_string(),
                });
            }
            if let Some(roles) = roles {
                if !roles.has_role(&task.role) {
                    return Err(WorkflowError::UnknownRole {
                        task: task.id.clone(),
                        role: task.role.clone(),
                    });
                }
            }
        }

        match self.find_cycle() {
            Some(cycle) => Err(WorkflowError::Cycle(cycle)),
            None => Ok(()),
        }
    }

    /// First cycle found, as the nodes on it in dependency order
    ///
    /// Only the nodes forming the cycle are reported, not the path that led
    /// into it.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let index: HashMap<&str, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        let mut marks = vec![Mark::Unvisited; self.tasks.len()];
        let mut stack = Vec::new();

        for start in 0..self.tasks.len() {
            if marks[start] == Mark::Unvisited {
                if let Some(cycle) = self.cycle_dfs(start, &index, &mut marks, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn cycle_dfs(
        &self,
        node: usize,
        index: &HashMap<&str, usize>,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<String>> {
        marks[node] = Mark::OnStack;
        stack.push(node);

        for dep in self.tasks[node].dep_ids() {
            let Some(&next) = index.get(dep) else {
                continue;
            };
            match marks[next] {
                Mark::OnStack => {
                    let from = stack.iter().position(|&n| n == next).unwrap_or(0);
                    // stack runs dependent -> dependency; report dependency order
                    let mut cycle: Vec<String> = stack[from..].iter().map(|&n| self.tasks[n].id.clone()).collect();
                    cycle.reverse();
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = self.cycle_dfs(next, index, marks, stack) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }

        stack.pop();
        marks[node] = Mark::Done;
        None
    }

    /// Topological layers: every task in a wave depends only on earlier waves
    pub fn execution_waves(&self) -> Result<Vec<Vec<String>>, WorkflowError> {
        self.validate(None)?;

        let mut placed: HashSet<&str> = HashSet::new();
        let mut waves = Vec::new();
        while placed.len() < self.tasks.len() {
            let wave: Vec<&str> = self
                .tasks
                .iter()
                .filter(|t| !placed.contains(t.id.as_str()))
                .filter(|t| t.dep_ids().all(|dep| placed.contains(dep)))
                .map(|t| t.id.as_str())
                .collect();

            if wave.is_empty() {
                // unreachable after validate; keep the loop finite regardless
                let stranded = self
                    .tasks
                    .iter()
                    .filter(|t| !placed.contains(t.id.as_str()))
                    .map(|t| t.id.clone())
                    .collect();
                return Err(WorkflowError::Unschedulable { stranded });
            }

            placed.extend(wave.iter().copied());
            waves.push(wave.into_iter().map(String::from).collect());
        }
        Ok(waves)
    }

    /// Sum of every task's estimated duration
    pub fn estimated_serial(&self) -> Duration {
        Duration::from_millis(self.tasks.iter().map(|t| t.estimated_ms).sum())
    }
}
