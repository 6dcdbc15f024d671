use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use diagkit_core::task::{Options, Outcome, Status, Task, TaskIdentifier, Upstream};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverrideParseError {
    #[error("override must look like ID=STATUS[:SUMMARY], got {0:?}")]
    Shape(String),

    #[error("invalid task identifier in override: {0}")]
    Identifier(String),

    #[error("invalid status in override: {0}")]
    Status(String),
}

/// A task that reports a fixed outcome under an existing identifier.
///
/// Built from `--override ID=STATUS[:SUMMARY]`. It keeps the replaced
/// task's explain text and dependencies so the graph is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideSpec {
    pub identifier: TaskIdentifier,
    pub status: Status,
    pub summary: Option<String>,
}

impl FromStr for OverrideSpec {
    type Err = OverrideParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, rest) = s
            .split_once('=')
            .ok_or_else(|| OverrideParseError::Shape(s.to_string()))?;
        let (status, summary) = match rest.split_once(':') {
            Some((status, summary)) => (status, Some(summary.to_string())),
            None => (rest, None),
        };
        let identifier = id
            .parse()
            .map_err(|e: diagkit_core::error::IdentifierError| {
                OverrideParseError::Identifier(e.to_string())
            })?;
        let status = status
            .trim()
            .parse()
            .map_err(|_| OverrideParseError::Status(status.to_string()))?;
        Ok(Self {
            identifier,
            status,
            summary,
        })
    }
}

pub struct OverrideTask {
    spec: OverrideSpec,
    explain: String,
    dependencies: Vec<TaskIdentifier>,
}

impl OverrideTask {
    /// Wrap `spec`, borrowing metadata from the task being replaced.
    pub fn replacing(spec: OverrideSpec, replaced: &dyn Task) -> Self {
        Self {
            explain: replaced.explain(),
            dependencies: replaced.dependencies(),
            spec,
        }
    }
}

#[async_trait]
impl Task for OverrideTask {
    fn identifier(&self) -> TaskIdentifier {
        self.spec.identifier.clone()
    }

    fn explain(&self) -> String {
        self.explain.clone()
    }

    fn dependencies(&self) -> Vec<TaskIdentifier> {
        self.dependencies.clone()
    }

    async fn execute(&self, _options: &Options, _upstream: &Upstream) -> Outcome {
        let summary = self
            .spec
            .summary
            .clone()
            .unwrap_or_else(|| format!("Status set to {} by override", self.spec.status));
        Outcome::new(self.spec.status, summary)
    }
}
