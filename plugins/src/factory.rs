use std::sync::Arc;

use anyhow::{Context, Result};

use diagkit_core::attach::{AttachClient, AttachSettings};
use diagkit_core::config::AppConfig;
use diagkit_core::output::OutputRenderer;
use diagkit_core::task::Options;
use diagkit_core::TaskRegistry;

use crate::attach::HttpAttachClient;
use crate::command::{CommandExecutor, TokioCommandExecutor};
use crate::renderers::{JsonlRenderer, TextRenderer};
use crate::tasks::base::{AppName, CollectEnvVars, InitSystem};
use crate::tasks::k8s::PodLogs;
use crate::tasks::{OverrideSpec, OverrideTask};

/// Register every built-in check.
pub fn build_registry(cfg: &AppConfig) -> Result<TaskRegistry> {
    build_registry_with(cfg, Arc::new(TokioCommandExecutor))
}

pub fn build_registry_with(cfg: &AppConfig, executor: Arc<dyn CommandExecutor>) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    registry.register(Arc::new(InitSystem::new()))?;
    registry.register(Arc::new(CollectEnvVars::new()))?;
    registry.register(Arc::new(AppName))?;
    for app in &cfg.k8s.apps {
        let task = PodLogs::new(&app.name, &app.selector, executor.clone())
            .with_context(|| format!("invalid pod log app name: {}", app.name))?;
        registry.register(Arc::new(task))?;
    }
    Ok(registry)
}

/// Replace registered tasks with fixed-outcome stand-ins.
pub fn apply_overrides(registry: &mut TaskRegistry, specs: &[OverrideSpec]) -> Result<()> {
    for spec in specs {
        let replaced = registry
            .get(spec.identifier.as_str())
            .map(|reg| reg.task.clone())
            .with_context(|| format!("cannot override unknown task {}", spec.identifier))?;
        registry.override_task(Arc::new(OverrideTask::replacing(spec.clone(), replaced.as_ref())))?;
    }
    Ok(())
}

pub fn build_options(cfg: &AppConfig) -> Options {
    cfg.options
        .iter()
        .fold(Options::new(), |opts, (k, v)| opts.with(k.clone(), v.clone()))
}

pub fn build_renderer(format: &str) -> Arc<dyn OutputRenderer> {
    match format {
        "jsonl" => Arc::new(JsonlRenderer::new(false)),
        _ => Arc::new(TextRenderer::new(!atty::is(atty::Stream::Stdout))),
    }
}

pub fn build_attach_client(settings: &AttachSettings) -> Result<Box<dyn AttachClient>> {
    Ok(Box::new(HttpAttachClient::new(settings)?))
}
