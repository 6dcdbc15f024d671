use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ExecutorError;
use crate::task::{Task, TaskIdentifier};

/// A task as it sits in the registry.
#[derive(Clone)]
pub struct Registration {
    pub task: Arc<dyn Task>,
    /// Set when the original implementation was replaced via [`TaskRegistry::override_task`].
    pub was_override: bool,
}

/// All known tasks keyed by identifier, iterated in identifier order.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskIdentifier, Registration>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Arc<dyn Task>) -> Result<(), ExecutorError> {
        let id = task.identifier();
        if self.tasks.contains_key(&id) {
            return Err(ExecutorError::DuplicateTaskId(id.to_string()));
        }
        tracing::trace!(target: "diagkit.registry", task = %id, "registered");
        self.tasks.insert(
            id,
            Registration {
                task,
                was_override: false,
            },
        );
        Ok(())
    }

    /// Swap the implementation registered under `task`'s identifier.
    ///
    /// Returns the replaced task. Overriding an identifier that was never
    /// registered is an error.
    pub fn override_task(&mut self, task: Arc<dyn Task>) -> Result<Arc<dyn Task>, ExecutorError> {
        let id = task.identifier();
        let slot = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| ExecutorError::UnknownTask(id.to_string()))?;
        tracing::debug!(target: "diagkit.registry", task = %id, "override registered");
        let previous = std::mem::replace(
            slot,
            Registration {
                task,
                was_override: true,
            },
        );
        Ok(previous.task)
    }

    pub fn get(&self, id: &str) -> Option<&Registration> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &TaskIdentifier> {
        self.tasks.keys()
    }

    pub fn registrations(&self) -> impl Iterator<Item = (&TaskIdentifier, &Registration)> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Options, Outcome, Upstream};
    use async_trait::async_trait;

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl Task for Named {
        fn identifier(&self) -> TaskIdentifier {
            self.0.parse().unwrap()
        }

        fn explain(&self) -> String {
            self.1.to_string()
        }

        async fn execute(&self, _options: &Options, _upstream: &Upstream) -> Outcome {
            Outcome::success(self.1)
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = TaskRegistry::new();
        registry.register(Arc::new(Named("Base/Env/A", "one"))).unwrap();
        let err = registry
            .register(Arc::new(Named("Base/Env/A", "two")))
            .unwrap_err();
        assert_eq!(err, ExecutorError::DuplicateTaskId("Base/Env/A".into()));
    }

    #[test]
    fn test_override_replaces_and_marks() {
        let mut registry = TaskRegistry::new();
        registry.register(Arc::new(Named("Base/Env/A", "original"))).unwrap();
        let previous = registry
            .override_task(Arc::new(Named("Base/Env/A", "replacement")))
            .unwrap();

        assert_eq!(previous.explain(), "original");
        let reg = registry.get("Base/Env/A").unwrap();
        assert!(reg.was_override);
        assert_eq!(reg.task.explain(), "replacement");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_override_of_unknown_task_fails() {
        let mut registry = TaskRegistry::new();
        let err = registry
            .override_task(Arc::new(Named("Base/Env/Missing", "x")))
            .err().unwrap();
        assert!(matches!(err, ExecutorError::UnknownTask(_)));
    }

    #[test]
    fn test_identifiers_are_ordered() {
        let mut registry = TaskRegistry::new();
        registry.register(Arc::new(Named("K8s/Logs/Agent", ""))).unwrap();
        registry.register(Arc::new(Named("Base/Env/A", ""))).unwrap();
        let ids: Vec<String> = registry.identifiers().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["Base/Env/A", "K8s/Logs/Agent"]);
    }
}
