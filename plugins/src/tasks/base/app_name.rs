use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use diagkit_core::task::{Options, Outcome, Status, Task, TaskIdentifier, Upstream};
use diagkit_core::task_id;

use super::env_vars::{CollectEnvVars, EnvVars};

const APP_NAME_ENV_VAR: &str = "NEW_RELIC_APP_NAME";
const NAMING_DOCS_URL: &str =
    "https://docs.newrelic.com/docs/agents/manage-apm-agents/app-naming/name-your-application";

/// Names agents fall back to when none is configured.
const DEFAULT_APP_NAMES: &[&str] = &[
    "PHP Application",
    "Python Application",
    "Python Application (Development)",
    "Python Application (Staging)",
    "My Application",
    "My Application (Development)",
    "My Application (Test)",
    "My Application (Staging)",
];

/// Payload entry: an application name and where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppNameInfo {
    pub name: String,
    pub source: String,
}

/// Flags default application names, which make unrelated apps report as one.
pub struct AppName;

impl AppName {
    pub const ID: &'static str = "Base/Config/AppName";
}

#[async_trait]
impl Task for AppName {
    fn identifier(&self) -> TaskIdentifier {
        task_id!(Self::ID)
    }

    fn explain(&self) -> String {
        "Check for default application names in agent configuration".to_string()
    }

    fn dependencies(&self) -> Vec<TaskIdentifier> {
        vec![task_id!(CollectEnvVars::ID)]
    }

    async fn execute(&self, _options: &Options, upstream: &Upstream) -> Outcome {
        let Some(env) = upstream.get(CollectEnvVars::ID) else {
            return Outcome::none("Task did not meet requirements necessary to run: no environment data");
        };
        if env.status != Status::Info {
            return Outcome::none(
                "Task did not meet requirements necessary to run: no environment variables collected",
            );
        }

        let vars: EnvVars = match env.payload_as() {
            Ok(vars) => vars,
            Err(err) => return Outcome::error(format!("Unexpected upstream payload: {err}")),
        };

        let Some(name) = vars.get(APP_NAME_ENV_VAR).filter(|n| !n.trim().is_empty()) else {
            return Outcome::warning(format!(
                "No application name was found. Please ensure an app name is set in your agent configuration file or through the {APP_NAME_ENV_VAR} environment variable."
            ))
            .with_url(NAMING_DOCS_URL);
        };

        if DEFAULT_APP_NAMES.contains(&name.as_str()) {
            return Outcome::warning(format!(
                "Your application is using a default appname: \"{name}\" as specified in {APP_NAME_ENV_VAR}\nMultiple applications with the same default appname will all report to the same source. Consider changing to a unique appname."
            ))
            .with_url(NAMING_DOCS_URL);
        }

        let found = vec![AppNameInfo {
            name: name.clone(),
            source: APP_NAME_ENV_VAR.to_string(),
        }];
        Outcome::success(format!(
            "A unique application name was found through the {APP_NAME_ENV_VAR} environment variable: {name}"
        ))
        .with_payload(&found)
    }
}
