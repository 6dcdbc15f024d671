use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::executor::FileBatch;
use crate::task::{FileCopyEnvelope, TaskIdentifier};

/// Attempts at finding a free archive name before an envelope is dropped.
pub const MAX_NAME_ATTEMPTS: u32 = 50;

/// Why an envelope was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Missing,
    Executable,
    Undeterminable(String),
    DuplicatePath,
    NoFreeName,
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Executable => "executable",
            Self::Undeterminable(_) => "undeterminable",
            Self::DuplicatePath => "duplicate_path",
            Self::NoFreeName => "no_free_name",
        }
    }
}

/// Drains the files stream into the ordered artifact manifest.
#[derive(Debug, Default)]
pub struct ArtifactCollector {
    names: HashSet<String>,
    paths: HashSet<PathBuf>,
    accepted: Vec<FileCopyEnvelope>,
    rejected: BTreeMap<&'static str, usize>,
}

impl ArtifactCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume `files` until the stream closes and return the accepted
    /// envelopes in arrival order.
    pub async fn consume(mut self, mut files: mpsc::UnboundedReceiver<FileBatch>) -> Vec<FileCopyEnvelope> {
        while let Some(batch) = files.recv().await {
            self.offer_batch(batch);
        }
        tracing::debug!(
            target: "diagkit.collector",
            accepted = self.accepted.len(),
            rejected = ?self.rejected,
            "files stream closed"
        );
        self.accepted
    }

    /// Offer every envelope of `batch`, counting rejections by kind.
    pub fn offer_batch(&mut self, batch: FileBatch) {
        tracing::debug!(
            target: "diagkit.collector",
            task = %batch.task_id,
            files = batch.files.len(),
            "collecting files"
        );
        for envelope in batch.files {
            if let Err(rejection) = self.offer(&batch.task_id, envelope) {
                *self.rejected.entry(rejection.kind()).or_default() += 1;
            }
        }
    }

    /// Run one envelope through the acceptance rules.
    pub fn offer(
        &mut self,
        producer: &TaskIdentifier,
        mut envelope: FileCopyEnvelope,
    ) -> Result<(), Rejection> {
        let path = envelope.path.display().to_string();

        if !envelope.exists() {
            tracing::debug!(target: "diagkit.collector", %path, "file does not exist, skipping");
            return Err(Rejection::Missing);
        }

        match envelope.is_executable() {
            Ok(false) => {}
            Ok(true) => {
                tracing::debug!(target: "diagkit.collector", %path, "skipping executable file");
                return Err(Rejection::Executable);
            }
            Err(err) => {
                tracing::debug!(
                    target: "diagkit.collector",
                    %path,
                    error = %err,
                    "unable to determine if file is executable, skipping"
                );
                return Err(Rejection::Undeterminable(err.to_string()));
            }
        }

        if !envelope.is_stream() && self.paths.contains(&envelope.path) {
            tracing::debug!(target: "diagkit.collector", %path, "already in the file list, skipping");
            return Err(Rejection::DuplicatePath);
        }

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = envelope.store_name();
            if self.names.contains(&name) {
                tracing::trace!(target: "diagkit.collector", %name, "name taken, trying next");
                envelope.increment_duplicate_count();
                continue;
            }

            tracing::debug!(target: "diagkit.collector", %name, %path, "file accepted");
            self.names.insert(name);
            if !envelope.is_stream() {
                self.paths.insert(envelope.path.clone());
            }
            if envelope.identifier.is_none() {
                envelope.identifier = Some(producer.to_string());
            }
            self.accepted.push(envelope);
            return Ok(());
        }

        tracing::warn!(
            target: "diagkit.collector",
            %path,
            attempts = MAX_NAME_ATTEMPTS,
            "no unique archive name found, dropping file"
        );
        Err(Rejection::NoFreeName)
    }

    /// Rejections seen by [`offer_batch`](Self::offer_batch), counted by kind.
    pub fn rejections(&self) -> &BTreeMap<&'static str, usize> {
        &self.rejected
    }

    pub fn accepted(&self) -> &[FileCopyEnvelope] {
        &self.accepted
    }

    pub fn into_accepted(self) -> Vec<FileCopyEnvelope> {
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ContentStream;
    use std::collections::HashSet;
    use std::fs;

    fn producer() -> TaskIdentifier {
        "Base/Log/Collect".parse().unwrap()
    }

    #[test]
    fn test_missing_and_executable_files_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("agent");
        fs::write(&exe, b"\x7fELF\x02\x01").unwrap();
        let log = dir.path().join("agent.log");
        fs::write(&log, "started\n").unwrap();

        let mut collector = ArtifactCollector::new();
        assert_eq!(
            collector.offer(&producer(), FileCopyEnvelope::from_path(dir.path().join("nope.log"))),
            Err(Rejection::Missing)
        );
        assert_eq!(
            collector.offer(&producer(), FileCopyEnvelope::from_path(&exe)),
            Err(Rejection::Executable)
        );
        collector
            .offer(&producer(), FileCopyEnvelope::from_path(&log))
            .unwrap();

        assert_eq!(collector.accepted().len(), 1);
        assert_eq!(
            collector.accepted()[0].identifier.as_deref(),
            Some("Base/Log/Collect")
        );
    }

    #[test]
    fn test_repeated_path_is_accepted_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        fs::write(&log, "x").unwrap();

        let mut collector = ArtifactCollector::new();
        collector
            .offer(&producer(), FileCopyEnvelope::from_path(&log))
            .unwrap();
        assert_eq!(
            collector.offer(&producer(), FileCopyEnvelope::from_path(&log)),
            Err(Rejection::DuplicatePath)
        );
    }

    #[test]
    fn test_explicit_identifier_is_kept() {
        let mut collector = ArtifactCollector::new();
        let env = FileCopyEnvelope::from_stream("pods.txt", ContentStream::from_blob("a"))
            .with_identifier("K8s/Logs/Custom");
        collector.offer(&producer(), env).unwrap();
        assert_eq!(
            collector.accepted()[0].identifier.as_deref(),
            Some("K8s/Logs/Custom")
        );
    }

    #[test]
    fn test_sixty_identical_names_accept_fifty() {
        let dir = tempfile::tempdir().unwrap();
        let mut collector = ArtifactCollector::new();
        let mut dropped = 0;
        for i in 0..60 {
            let sub = dir.path().join(format!("node{i}"));
            fs::create_dir(&sub).unwrap();
            let log = sub.join("newrelic.log");
            fs::write(&log, format!("node {i}\n")).unwrap();
            if collector
                .offer(&producer(), FileCopyEnvelope::from_path(&log))
                .is_err()
            {
                dropped += 1;
            }
        }

        assert_eq!(collector.accepted().len(), 50);
        assert_eq!(dropped, 10);
        let names: HashSet<String> = collector
            .accepted()
            .iter()
            .map(FileCopyEnvelope::store_name)
            .collect();
        assert_eq!(names.len(), 50);
        assert!(names.contains("newrelic.log"));
        assert!(names.contains("newrelic_49.log"));
    }

    #[test]
    fn test_streams_skip_path_dedup_but_not_name_dedup() {
        let mut collector = ArtifactCollector::new();
        for _ in 0..3 {
            let env = FileCopyEnvelope::from_stream("pods.txt", ContentStream::from_blob("a"));
            collector.offer(&producer(), env).unwrap();
        }
        let names: Vec<String> = collector
            .accepted()
            .iter()
            .map(FileCopyEnvelope::store_name)
            .collect();
        assert_eq!(names, vec!["pods.txt", "pods_1.txt", "pods_2.txt"]);
    }

    #[tokio::test]
    async fn test_consume_preserves_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(FileBatch {
            task_id: producer(),
            files: vec![FileCopyEnvelope::from_path(&b)],
        })
        .unwrap();
        tx.send(FileBatch {
            task_id: "Base/Env/Other".parse().unwrap(),
            files: vec![FileCopyEnvelope::from_path(&a), FileCopyEnvelope::from_path(&b)],
        })
        .unwrap();
        drop(tx);

        let accepted = ArtifactCollector::new().consume(rx).await;
        let names: Vec<String> = accepted.iter().map(FileCopyEnvelope::store_name).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
        assert_eq!(accepted[1].identifier.as_deref(), Some("Base/Env/Other"));
    }

    #[test]
    fn test_batch_rejections_are_counted_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("agent.log");
        fs::write(&log, "started\n").unwrap();

        let mut collector = ArtifactCollector::new();
        collector.offer_batch(FileBatch {
            task_id: producer(),
            files: vec![
                FileCopyEnvelope::from_path(&log),
                FileCopyEnvelope::from_path(&log),
                FileCopyEnvelope::from_path(dir.path().join("gone.log")),
                FileCopyEnvelope::from_path(dir.path().join("also-gone.log")),
            ],
        });

        assert_eq!(collector.accepted().len(), 1);
        let counts: Vec<(&str, usize)> = collector
            .rejections()
            .iter()
            .map(|(kind, n)| (*kind, *n))
            .collect();
        assert_eq!(counts, vec![("duplicate_path", 1), ("missing", 2)]);
    }
}
