use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ArchiveError;
use crate::task::{Status, TaskResult};

use super::script::ScriptData;

/// One task's entry in the output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub identifier: String,
    pub category: String,
    pub subcategory: String,
    pub name: String,
    pub explain: String,
    pub status: Status,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default)]
    pub was_override: bool,
}

impl From<&TaskResult> for ResultEntry {
    fn from(result: &TaskResult) -> Self {
        let id = result.identifier();
        let outcome = &result.outcome;
        Self {
            identifier: id.to_string(),
            category: id.category().to_string(),
            subcategory: id.subcategory().to_string(),
            name: id.name().to_string(),
            explain: result.task.explain(),
            status: outcome.status,
            summary: outcome.summary.clone(),
            url: outcome.url.clone(),
            payload: outcome.payload.clone(),
            files: outcome
                .files_to_copy
                .iter()
                .map(|f| f.path.display().to_string())
                .collect(),
            was_override: result.was_override,
        }
    }
}

/// The serialized record of a run: ordered results plus run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub run_id: String,
    pub run_date: DateTime<Utc>,
    pub version: String,
    pub results: Vec<ResultEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_output: Option<ScriptData>,
}

impl OutputDocument {
    pub fn new(version: impl Into<String>, results: &[TaskResult], script: Option<&ScriptData>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            run_date: Utc::now(),
            version: version.into(),
            results: results.iter().map(ResultEntry::from).collect(),
            script_output: script.cloned(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document to `dir/name`, creating `dir` if needed.
    pub fn write_to(&self, dir: &Path, name: &str) -> Result<PathBuf, ArchiveError> {
        std::fs::create_dir_all(dir).map_err(|e| ArchiveError::io(dir, e))?;
        let path = dir.join(name);
        let json = self
            .to_json()
            .map_err(|e| ArchiveError::io(&path, std::io::Error::other(e)))?;
        std::fs::write(&path, json).map_err(|e| ArchiveError::io(&path, e))?;
        tracing::debug!(target: "diagkit.output", path = %path.display(), "output document written");
        Ok(path)
    }
}
