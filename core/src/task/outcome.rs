use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

use super::envelope::FileCopyEnvelope;
use super::traits::Task;
use super::TaskIdentifier;

/// Summary used for dependencies that are declared but not registered.
pub const DEPENDENCY_NOT_FOUND: &str = "dependency not found";

/// Outcome classification of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    None,
    Success,
    Info,
    Warning,
    Failure,
    Error,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::None,
        Status::Success,
        Status::Info,
        Status::Warning,
        Status::Failure,
        Status::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Success => "Success",
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Failure => "Failure",
            Self::Error => "Error",
        }
    }

    /// Position in [`Status::ALL`], used for per-status counters.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Warning, Failure and Error are reported as issues.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Warning | Self::Failure | Self::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status '{s}'"))
    }
}

/// What a task reports back after executing.
///
/// The payload is a private contract between a task and the tasks that
/// declare it as a dependency; the engine carries it without looking inside.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub status: Status,
    pub summary: String,
    pub url: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub files_to_copy: Vec<FileCopyEnvelope>,
}

impl Outcome {
    pub fn new(status: Status, summary: impl Into<String>) -> Self {
        Self {
            status,
            summary: summary.into(),
            ..Self::default()
        }
    }

    pub fn success(summary: impl Into<String>) -> Self {
        Self::new(Status::Success, summary)
    }

    pub fn info(summary: impl Into<String>) -> Self {
        Self::new(Status::Info, summary)
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(Status::Warning, summary)
    }

    pub fn failure(summary: impl Into<String>) -> Self {
        Self::new(Status::Failure, summary)
    }

    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(Status::Error, summary)
    }

    pub fn none(summary: impl Into<String>) -> Self {
        Self::new(Status::None, summary)
    }

    /// Stand-in for a declared dependency with no registration.
    pub fn dependency_not_found() -> Self {
        Self::none(DEPENDENCY_NOT_FOUND)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_files(mut self, files: Vec<FileCopyEnvelope>) -> Self {
        self.files_to_copy = files;
        self
    }

    /// Attach a typed payload. A value that cannot be represented is logged
    /// and dropped, leaving the outcome without payload.
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => self.payload = Some(value),
            Err(err) => {
                tracing::warn!(
                    target: "diagkit.task",
                    error = %err,
                    "payload could not be encoded; dropping it"
                );
                self.payload = None;
            }
        }
        self
    }

    pub fn has_payload(&self) -> bool {
        self.payload.as_ref().is_some_and(|v| !v.is_null())
    }

    /// Decode the payload into the shape the producing task promised.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        let value = self.payload.as_ref().ok_or(PayloadError::Missing)?;
        serde_json::from_value(value.clone()).map_err(|e| PayloadError::Decode {
            expected: std::any::type_name::<T>(),
            message: e.to_string(),
        })
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

/// A task paired with its outcome; the unit flowing through the results stream.
#[derive(Clone)]
pub struct TaskResult {
    pub task: Arc<dyn Task>,
    pub outcome: Arc<Outcome>,
    pub was_override: bool,
}

impl TaskResult {
    pub fn identifier(&self) -> TaskIdentifier {
        self.task.identifier()
    }
}

impl fmt::Debug for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskResult")
            .field("task", &self.task.identifier())
            .field("outcome", &self.outcome)
            .field("was_override", &self.was_override)
            .finish()
    }
}
