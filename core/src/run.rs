use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{CliError, ExecutorError};
use crate::executor::{ExecutionEngine, RunStreams};
use crate::output::{
    ArchiveBuilder, ArchiveInputs, ArchiveReport, ArtifactCollector, OutputDocument,
    OutputRenderer, ResultAggregator, ScriptData, StatusFilter, DEFAULT_ARCHIVE_NAME,
    OUTPUT_DOCUMENT_NAME,
};
use crate::task::{FileCopyEnvelope, TaskIdentifier, TaskResult};

/// What one run should do.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Tasks to run; `None` runs everything registered.
    pub roots: Option<Vec<TaskIdentifier>>,
    pub filter: StatusFilter,
    pub output_dir: PathBuf,
    pub archive_name: String,
    /// Skip the archive and only write the output document.
    pub skip_archive: bool,
    pub include: Option<PathBuf>,
    pub script: Option<ScriptData>,
    /// Recorded in the output document.
    pub version: String,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            roots: None,
            filter: StatusFilter::default(),
            output_dir: PathBuf::from("."),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            skip_archive: false,
            include: None,
            script: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    /// Every result observed, in arrival order.
    pub results: Vec<TaskResult>,
    /// Artifacts accepted by the collector, in arrival order.
    pub artifacts: Vec<FileCopyEnvelope>,
    pub output_document: PathBuf,
    pub archive: Option<ArchiveReport>,
}

/// Run the requested tasks end to end.
///
/// The aggregator and the collector drain their streams concurrently with
/// the engine; archiving starts only after both have finished.
pub async fn run(
    engine: &ExecutionEngine,
    request: RunRequest,
    renderer: Arc<dyn OutputRenderer>,
) -> Result<RunReport, CliError> {
    let RunStreams {
        results,
        files,
        handle,
    } = match &request.roots {
        Some(roots) => engine.start(roots)?,
        None => engine.start_all()?,
    };

    let aggregator = ResultAggregator::new(request.filter, renderer);
    let results_task = tokio::spawn(aggregator.consume(results));
    let files_task = tokio::spawn(ArtifactCollector::new().consume(files));

    let (dispatched, results, artifacts) = tokio::join!(handle, results_task, files_task);
    let roots = dispatched.map_err(|e| ExecutorError::Join(e.to_string()))??;
    let results = results.map_err(|e| ExecutorError::Join(e.to_string()))?;
    let artifacts = artifacts.map_err(|e| ExecutorError::Join(e.to_string()))?;
    tracing::info!(
        target: "diagkit.run",
        roots,
        results = results.len(),
        artifacts = artifacts.len(),
        "all tasks finished"
    );

    let document = OutputDocument::new(&request.version, &results, request.script.as_ref());
    let output_document = document.write_to(&request.output_dir, OUTPUT_DOCUMENT_NAME)?;

    if request.skip_archive {
        return Ok(RunReport {
            results,
            artifacts,
            output_document,
            archive: None,
        });
    }

    let json = document
        .to_json()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    let dest = request.output_dir.join(&request.archive_name);
    let include = request.include.clone();
    let script = request.script.clone();
    let (artifacts, archive) = tokio::task::spawn_blocking(move || {
        let report = ArchiveBuilder::new().build(
            &dest,
            &ArchiveInputs {
                artifacts: &artifacts,
                output_document: &json,
                script: script.as_ref(),
                include: include.as_deref(),
            },
        );
        (artifacts, report)
    })
    .await
    .map_err(|e| ExecutorError::Join(e.to_string()))?;

    Ok(RunReport {
        results,
        artifacts,
        output_document,
        archive: Some(archive?),
    })
}
