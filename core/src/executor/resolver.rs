use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, OnceCell};

use crate::error::ExecutorError;
use crate::task::{FileCopyEnvelope, Options, Outcome, TaskIdentifier, TaskResult, Upstream};

use super::graph::format_cycle_path;
use super::registry::{Registration, TaskRegistry};

/// Artifacts produced by one task, as sent on the files stream.
#[derive(Debug, Clone)]
pub struct FileBatch {
    pub task_id: TaskIdentifier,
    pub files: Vec<FileCopyEnvelope>,
}

type MemoSlot = Arc<OnceCell<Arc<Outcome>>>;

/// Resolves a task by first resolving its dependencies, executing each task
/// in the closure at most once per run.
///
/// The memo holds one cell per identifier. Whoever initializes the cell runs
/// the task; concurrent callers for the same identifier wait on the cell and
/// observe the same outcome.
pub struct Resolver {
    registry: Arc<TaskRegistry>,
    options: Arc<Options>,
    memo: Mutex<HashMap<TaskIdentifier, MemoSlot>>,
    results_tx: mpsc::UnboundedSender<TaskResult>,
    files_tx: mpsc::UnboundedSender<FileBatch>,
}

impl Resolver {
    pub fn new(
        registry: Arc<TaskRegistry>,
        options: Arc<Options>,
        results_tx: mpsc::UnboundedSender<TaskResult>,
        files_tx: mpsc::UnboundedSender<FileBatch>,
    ) -> Self {
        Self {
            registry,
            options,
            memo: Mutex::new(HashMap::new()),
            results_tx,
            files_tx,
        }
    }

    /// Resolve `id`. `chain` is the list of tasks currently being resolved
    /// on this call path; finding `id` in it means a dependency cycle.
    pub fn resolve<'a>(
        self: &'a Arc<Self>,
        id: &'a TaskIdentifier,
        chain: &'a [TaskIdentifier],
    ) -> BoxFuture<'a, Result<Arc<Outcome>, ExecutorError>> {
        async move {
            if chain.contains(id) {
                let mut path = chain.to_vec();
                path.push(id.clone());
                return Err(ExecutorError::CircularDependency(format_cycle_path(&path)));
            }

            let Some(reg) = self.registry.get(id.as_str()) else {
                tracing::debug!(
                    target: "diagkit.executor",
                    task = %id,
                    "dependency is not registered; substituting empty result"
                );
                return Ok(Arc::new(Outcome::dependency_not_found()));
            };

            let slot = self.slot(id);
            let outcome = slot
                .get_or_try_init(|| self.run_task(id, reg, chain))
                .await?;
            Ok(outcome.clone())
        }
        .boxed()
    }

    /// Number of tasks resolved so far (executed or in flight).
    pub fn resolved_count(&self) -> usize {
        self.memo
            .lock()
            .map(|memo| memo.values().filter(|cell| cell.initialized()).count())
            .unwrap_or(0)
    }

    fn slot(&self, id: &TaskIdentifier) -> MemoSlot {
        let mut memo = match self.memo.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        memo.entry(id.clone()).or_default().clone()
    }

    async fn run_task(
        self: &Arc<Self>,
        id: &TaskIdentifier,
        reg: &Registration,
        chain: &[TaskIdentifier],
    ) -> Result<Arc<Outcome>, ExecutorError> {
        let mut path = chain.to_vec();
        path.push(id.clone());

        let mut upstream = Upstream::new();
        for dep in reg.task.dependencies() {
            let outcome = self.resolve(&dep, &path).await?;
            upstream.insert(dep, outcome);
        }

        tracing::debug!(target: "diagkit.executor", task = %id, "executing");
        let executed = AssertUnwindSafe(reg.task.execute(&self.options, &upstream))
            .catch_unwind()
            .await;
        let outcome = Arc::new(executed.unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            tracing::error!(target: "diagkit.executor", task = %id, %message, "task panicked");
            Outcome::error(format!("task panicked: {message}"))
        }));
        tracing::debug!(
            target: "diagkit.executor",
            task = %id,
            status = %outcome.status,
            files = outcome.files_to_copy.len(),
            "executed"
        );

        self.publish(id, reg, outcome.clone());
        Ok(outcome)
    }

    fn publish(&self, id: &TaskIdentifier, reg: &Registration, outcome: Arc<Outcome>) {
        if !outcome.files_to_copy.is_empty() {
            let batch = FileBatch {
                task_id: id.clone(),
                files: outcome.files_to_copy.clone(),
            };
            if self.files_tx.send(batch).is_err() {
                tracing::debug!(target: "diagkit.executor", task = %id, "files stream closed");
            }
        }

        let result = TaskResult {
            task: reg.task.clone(),
            outcome,
            was_override: reg.was_override,
        };
        if self.results_tx.send(result).is_err() {
            tracing::debug!(target: "diagkit.executor", task = %id, "results stream closed");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
