use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ExecutorError;
use crate::task::{Options, TaskIdentifier, TaskResult};

use super::graph::DependencyGraph;
use super::registry::TaskRegistry;
use super::resolver::{FileBatch, Resolver};
use super::scheduler::dispatch_roots;

const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// The two output streams of a run plus the handle of the dispatcher.
///
/// Both streams close once every root has been resolved (or the run failed).
/// The handle yields the number of roots resolved.
pub struct RunStreams {
    pub results: mpsc::UnboundedReceiver<TaskResult>,
    pub files: mpsc::UnboundedReceiver<FileBatch>,
    pub handle: JoinHandle<Result<usize, ExecutorError>>,
}

/// Execution engine for task dependency graphs
pub struct ExecutionEngine {
    registry: Arc<TaskRegistry>,
    options: Arc<Options>,
    max_concurrency: usize,
}

impl ExecutionEngine {
    pub fn new(registry: TaskRegistry, options: Options) -> Self {
        Self {
            registry: Arc::new(registry),
            options: Arc::new(options),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Start resolving `roots` in the background.
    ///
    /// The dependency closure is validated first, so a cycle or an unknown
    /// root fails here before any task executes.
    pub fn start(&self, roots: &[TaskIdentifier]) -> Result<RunStreams, ExecutorError> {
        let graph = DependencyGraph::for_roots(&self.registry, roots)?;
        graph.validate()?;

        if tracing::enabled!(target: "diagkit.executor", tracing::Level::DEBUG) {
            let plan: Vec<Vec<String>> = graph
                .stages()?
                .into_iter()
                .map(|stage| stage.into_iter().map(|id| id.to_string()).collect())
                .collect();
            tracing::debug!(
                target: "diagkit.executor",
                roots = roots.len(),
                tasks = graph.len(),
                missing = graph.missing.len(),
                ?plan,
                "execution plan"
            );
        }

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (files_tx, files_rx) = mpsc::unbounded_channel();
        let resolver = Arc::new(Resolver::new(
            self.registry.clone(),
            self.options.clone(),
            results_tx,
            files_tx,
        ));

        let roots = roots.to_vec();
        let max_concurrency = self.max_concurrency;
        let handle = tokio::spawn(async move {
            let outcome = dispatch_roots(&roots, resolver.clone(), max_concurrency).await;
            tracing::debug!(
                target: "diagkit.executor",
                executed = resolver.resolved_count(),
                ok = outcome.is_ok(),
                "dispatch finished"
            );
            // The resolver owns the stream senders; dropping it closes both.
            drop(resolver);
            outcome
        });

        Ok(RunStreams {
            results: results_rx,
            files: files_rx,
            handle,
        })
    }

    /// Start every registered task as a root.
    pub fn start_all(&self) -> Result<RunStreams, ExecutorError> {
        let roots: Vec<TaskIdentifier> = self.registry.identifiers().cloned().collect();
        self.start(&roots)
    }
}
