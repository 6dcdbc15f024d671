use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use super::outcome::Outcome;
use super::TaskIdentifier;

/// Outcomes of a task's declared dependencies, keyed by dependency identifier.
///
/// Every declared dependency is present. Dependencies with no registration
/// show up as [`Outcome::dependency_not_found`].
pub type Upstream = HashMap<TaskIdentifier, Arc<Outcome>>;

/// Read-only run options handed to every task (e.g. `k8s_namespace`).
#[derive(Debug, Clone, Default)]
pub struct Options {
    values: BTreeMap<String, String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A single diagnostic check.
#[async_trait]
pub trait Task: Send + Sync {
    fn identifier(&self) -> TaskIdentifier;

    /// One-line help text.
    fn explain(&self) -> String;

    fn dependencies(&self) -> Vec<TaskIdentifier> {
        Vec::new()
    }

    async fn execute(&self, options: &Options, upstream: &Upstream) -> Outcome;
}
