use std::collections::BTreeMap;

use async_trait::async_trait;

use diagkit_core::task::{
    ContentStream, FileCopyEnvelope, Options, Outcome, Task, TaskIdentifier, Upstream,
};
use diagkit_core::task_id;

/// Variables collected by name in addition to the prefixed ones.
const COLLECTED_NAMES: &[&str] = &[
    "PATH",
    "JAVA_HOME",
    "JAVA_OPTS",
    "NODE_OPTIONS",
    "PYTHONPATH",
    "DOTNET_ROOT",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
];

const COLLECTED_PREFIXES: &[&str] = &["NEW_RELIC_", "NEWRELIC_", "DIAGKIT_"];

/// Name fragments whose values are masked in the artifact.
const SECRET_MARKERS: &[&str] = &["KEY", "TOKEN", "SECRET", "PASSWORD"];

/// Payload: the collected variables by name.
pub type EnvVars = BTreeMap<String, String>;

/// Snapshots the environment variables relevant to other checks.
pub struct CollectEnvVars {
    source: Option<EnvVars>,
}

impl CollectEnvVars {
    pub const ID: &'static str = "Base/Env/CollectEnvVars";

    /// Read from the process environment at execution time.
    pub fn new() -> Self {
        Self { source: None }
    }

    /// Use a fixed set of variables instead of the process environment.
    pub fn with_vars(vars: EnvVars) -> Self {
        Self { source: Some(vars) }
    }

    fn wanted(name: &str) -> bool {
        COLLECTED_NAMES.contains(&name) || COLLECTED_PREFIXES.iter().any(|p| name.starts_with(p))
    }
}

impl Default for CollectEnvVars {
    fn default() -> Self {
        Self::new()
    }
}

fn masked(name: &str, value: &str) -> String {
    if SECRET_MARKERS.iter().any(|m| name.contains(m)) && !value.is_empty() {
        "********".to_string()
    } else {
        value.to_string()
    }
}

#[async_trait]
impl Task for CollectEnvVars {
    fn identifier(&self) -> TaskIdentifier {
        task_id!(Self::ID)
    }

    fn explain(&self) -> String {
        "Collect relevant environment variables".to_string()
    }

    async fn execute(&self, _options: &Options, _upstream: &Upstream) -> Outcome {
        let all: Vec<(String, String)> = match &self.source {
            Some(vars) => vars.clone().into_iter().collect(),
            None => std::env::vars().collect(),
        };
        let vars: EnvVars = all.into_iter().filter(|(k, _)| Self::wanted(k)).collect();

        if vars.is_empty() {
            return Outcome::none("No relevant environment variables found");
        }

        let listing: String = vars
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, masked(k, v)))
            .collect();
        Outcome::info(format!("{} environment variable(s) collected", vars.len()))
            .with_payload(&vars)
            .with_files(vec![FileCopyEnvelope::from_stream(
                "env_vars.txt",
                ContentStream::from_blob(listing),
            )])
    }
}
