#![allow(dead_code)]

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use diagkit_core::output::{OutputRenderer, RenderEvent};
use diagkit_core::task::{FileCopyEnvelope, Options, Outcome, Task, TaskIdentifier, Upstream};

/// Task returning a fixed outcome, optionally depending on others.
pub struct FixedTask {
    pub id: &'static str,
    pub deps: Vec<&'static str>,
    pub outcome: Outcome,
}

impl FixedTask {
    pub fn new(id: &'static str, outcome: Outcome) -> Self {
        Self {
            id,
            deps: Vec::new(),
            outcome,
        }
    }

    pub fn depends_on(mut self, deps: &[&'static str]) -> Self {
        self.deps = deps.to_vec();
        self
    }
}

#[async_trait]
impl Task for FixedTask {
    fn identifier(&self) -> TaskIdentifier {
        self.id.parse().unwrap()
    }

    fn explain(&self) -> String {
        format!("fixed outcome for {}", self.id)
    }

    fn dependencies(&self) -> Vec<TaskIdentifier> {
        self.deps.iter().map(|d| d.parse().unwrap()).collect()
    }

    async fn execute(&self, _options: &Options, _upstream: &Upstream) -> Outcome {
        self.outcome.clone()
    }
}

/// Task that copies a list of files.
pub fn file_task(id: &'static str, files: Vec<FileCopyEnvelope>) -> FixedTask {
    FixedTask::new(id, Outcome::info(format!("{} files", files.len())).with_files(files))
}

#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<RenderEvent>>,
}

impl OutputRenderer for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn format(&self) -> &str {
        "test"
    }

    fn render(&self, event: &RenderEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn recorder() -> Arc<Recorder> {
    Arc::new(Recorder::default())
}

pub fn zip_entries(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

pub fn zip_entry(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    text
}
