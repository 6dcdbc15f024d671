use std::sync::Arc;

use async_trait::async_trait;

use diagkit_core::error::IdentifierError;
use diagkit_core::task::{
    ContentStream, FileCopyEnvelope, Options, Outcome, Task, TaskIdentifier, Upstream,
};

use crate::command::{CommandError, CommandExecutor};

/// Option key naming the namespace to query.
pub const NAMESPACE_OPTION: &str = "k8s_namespace";

const KUBECTL: &str = "kubectl";

/// Collects container logs for one application's pods via `kubectl logs`.
pub struct PodLogs {
    id: TaskIdentifier,
    app_name: String,
    label_selector: String,
    executor: Arc<dyn CommandExecutor>,
}

impl PodLogs {
    pub fn new(
        app_name: impl Into<String>,
        label_selector: impl Into<String>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self, IdentifierError> {
        let app_name = app_name.into();
        Ok(Self {
            id: TaskIdentifier::new("K8s", "Logs", &app_name)?,
            app_name,
            label_selector: label_selector.into(),
            executor,
        })
    }

    fn args(&self, namespace: Option<&str>) -> Vec<String> {
        let mut args = vec!["logs".to_string()];
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            args.push("-n".to_string());
            args.push(ns.to_string());
        }
        args.extend([
            "-l".to_string(),
            self.label_selector.clone(),
            "--all-containers".to_string(),
            "--prefix".to_string(),
        ]);
        args
    }
}

#[async_trait]
impl Task for PodLogs {
    fn identifier(&self) -> TaskIdentifier {
        self.id.clone()
    }

    fn explain(&self) -> String {
        format!("Collect {} pod logs", self.app_name)
    }

    async fn execute(&self, options: &Options, _upstream: &Upstream) -> Outcome {
        let namespace = options.get(NAMESPACE_OPTION);
        let output = match self.executor.output(KUBECTL, &self.args(namespace)).await {
            Ok(output) => output,
            Err(CommandError::NotFound(_)) => {
                return Outcome::none("kubectl is not available on this host");
            }
            Err(err) => {
                tracing::debug!(target: "diagkit.k8s", app = %self.app_name, error = %err, "kubectl logs failed");
                return Outcome::error(format!("Unable to collect {} logs: {err}", self.app_name));
            }
        };

        if output.is_empty() {
            return Outcome::none(format!(
                "No pods matched {} in namespace {}",
                self.label_selector,
                namespace.unwrap_or("default")
            ));
        }

        let text = String::from_utf8_lossy(&output).into_owned();
        let lines = text.lines().count();
        Outcome::info(format!("Collected {lines} log line(s) for {}", self.app_name)).with_files(
            vec![FileCopyEnvelope::from_stream(
                format!("{}.log", self.app_name),
                ContentStream::from_blob(text),
            )],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::CannedExecutor;
    use diagkit_core::task::Status;

    fn task(executor: Arc<CannedExecutor>) -> PodLogs {
        PodLogs::new("checkout", "app=checkout", executor).unwrap()
    }

    #[tokio::test]
    async fn test_logs_become_a_stream_artifact() {
        let exec = Arc::new(CannedExecutor::ok("[pod/a] started\n[pod/a] ready\n"));
        let outcome = task(exec.clone())
            .execute(&Options::new().with(NAMESPACE_OPTION, "shop"), &Upstream::new())
            .await;

        assert_eq!(outcome.status, Status::Info);
        let env = &outcome.files_to_copy[0];
        assert_eq!(env.store_name(), "checkout.log");
        let body: String = env.stream.as_ref().unwrap().chunks().collect();
        assert_eq!(body, "[pod/a] started\n[pod/a] ready\n");

        let calls = exec.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            vec![
                "kubectl", "logs", "-n", "shop", "-l", "app=checkout", "--all-containers", "--prefix"
            ]
        );
    }

    #[tokio::test]
    async fn test_namespace_is_optional() {
        let exec = Arc::new(CannedExecutor::ok("line\n"));
        task(exec.clone())
            .execute(&Options::new(), &Upstream::new())
            .await;
        let calls = exec.calls.lock().unwrap();
        assert!(!calls[0].contains(&"-n".to_string()));
    }

    #[tokio::test]
    async fn test_missing_kubectl_is_none() {
        let exec = Arc::new(CannedExecutor::err(CommandError::NotFound("kubectl".into())));
        let outcome = task(exec).execute(&Options::new(), &Upstream::new()).await;
        assert_eq!(outcome.status, Status::None);
    }

    #[tokio::test]
    async fn test_kubectl_failure_is_error() {
        let exec = Arc::new(CannedExecutor::err(CommandError::Failed {
            program: "kubectl".into(),
            code: 1,
            stderr: "forbidden".into(),
        }));
        let outcome = task(exec).execute(&Options::new(), &Upstream::new()).await;
        assert_eq!(outcome.status, Status::Error);
        assert!(outcome.summary.contains("forbidden"));
    }

    #[test]
    fn test_identifier_uses_app_name() {
        let exec = Arc::new(CannedExecutor::ok(""));
        assert_eq!(task(exec).identifier().to_string(), "K8s/Logs/checkout");
        let exec = Arc::new(CannedExecutor::ok(""));
        assert!(PodLogs::new("a/b", "app=x", exec).is_err());
    }
}
