use thiserror::Error;

/// Errors raised while validating or resolving the task graph.
///
/// Task-local failures never show up here; they are ordinary outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Unknown task requested: {0}")]
    UnknownTask(String),

    #[error("Task worker failed: {0}")]
    Join(String),
}
