use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::ExecutorError;
use crate::task::TaskIdentifier;

use super::registry::TaskRegistry;

/// Dependency graph over the transitive closure of a set of root tasks.
///
/// Built before anything executes so that cycles are reported the same way
/// no matter how the roots are later scheduled.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Dependency edges: task_id -> declared dependencies (registered or not)
    pub edges: BTreeMap<TaskIdentifier, Vec<TaskIdentifier>>,

    /// Reverse edges: task_id -> registered tasks that depend on it
    pub reverse_edges: BTreeMap<TaskIdentifier, Vec<TaskIdentifier>>,

    /// Declared dependencies with no registration
    pub missing: BTreeSet<TaskIdentifier>,
}

impl DependencyGraph {
    /// Walk the registry from `roots`, collecting every reachable task.
    pub fn for_roots(
        registry: &TaskRegistry,
        roots: &[TaskIdentifier],
    ) -> Result<Self, ExecutorError> {
        let mut edges = BTreeMap::new();
        let mut reverse_edges: BTreeMap<TaskIdentifier, Vec<TaskIdentifier>> = BTreeMap::new();
        let mut missing = BTreeSet::new();

        for root in roots {
            if !registry.contains(root.as_str()) {
                return Err(ExecutorError::UnknownTask(root.to_string()));
            }
        }

        let mut pending: Vec<TaskIdentifier> = roots.to_vec();
        while let Some(task_id) = pending.pop() {
            if edges.contains_key(&task_id) {
                continue;
            }
            let Some(reg) = registry.get(task_id.as_str()) else {
                missing.insert(task_id);
                continue;
            };

            let dependencies = reg.task.dependencies();
            for dep in &dependencies {
                reverse_edges
                    .entry(dep.clone())
                    .or_default()
                    .push(task_id.clone());
                if !edges.contains_key(dep) {
                    pending.push(dep.clone());
                }
            }
            edges.insert(task_id, dependencies);
        }

        Ok(Self {
            edges,
            reverse_edges,
            missing,
        })
    }

    /// Fail on the first dependency cycle found, in identifier order.
    pub fn validate(&self) -> Result<(), ExecutorError> {
        if let Some(cycle) = self.detect_cycle() {
            return Err(ExecutorError::CircularDependency(cycle));
        }
        Ok(())
    }

    /// Group tasks into stages; every task's registered dependencies sit in
    /// earlier stages. Used for the execution plan log line.
    ///
    /// Kahn's algorithm, O(V + E).
    pub fn stages(&self) -> Result<Vec<Vec<TaskIdentifier>>, ExecutorError> {
        let mut in_degree: BTreeMap<&TaskIdentifier, usize> = BTreeMap::new();
        for (task_id, dependencies) in &self.edges {
            let known = dependencies
                .iter()
                .filter(|d| self.edges.contains_key(*d))
                .count();
            in_degree.insert(task_id, known);
        }

        let mut stages: Vec<Vec<TaskIdentifier>> = Vec::new();
        let mut current: Vec<TaskIdentifier> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(id, _)| (*id).clone())
            .collect();
        let mut processed = 0;

        while !current.is_empty() {
            processed += current.len();
            let mut next = Vec::new();

            for task_id in &current {
                let Some(dependents) = self.reverse_edges.get(task_id) else {
                    continue;
                };
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(dependent.clone());
                        }
                    }
                }
            }

            next.sort();
            next.dedup();
            stages.push(std::mem::replace(&mut current, next));
        }

        if processed != self.edges.len() {
            return Err(ExecutorError::CircularDependency(
                "Unable to complete topological sort (cycle detected)".to_string(),
            ));
        }

        Ok(stages)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Detect circular dependencies using DFS
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task_id in self.edges.keys() {
            if !visited.contains(task_id) && self.dfs_cycle(task_id, &mut visited, &mut stack) {
                return Some(format_cycle_path(&stack));
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &TaskIdentifier,
        visited: &mut HashSet<TaskIdentifier>,
        stack: &mut Vec<TaskIdentifier>,
    ) -> bool {
        visited.insert(node.clone());
        stack.push(node.clone());

        if let Some(dependencies) = self.edges.get(node) {
            for dep in dependencies {
                // Dependency already on the current path: cycle
                if let Some(pos) = stack.iter().position(|x| x == dep) {
                    stack.push(dep.clone());
                    *stack = stack[pos..].to_vec();
                    return true;
                }

                if !visited.contains(dep) && self.dfs_cycle(dep, visited, stack) {
                    return true;
                }
            }
        }

        stack.pop();
        false
    }
}

pub(crate) fn format_cycle_path(stack: &[TaskIdentifier]) -> String {
    stack
        .iter()
        .map(TaskIdentifier::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
