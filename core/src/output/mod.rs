//! Consumers of the two run streams and the artifacts they produce:
//! result rendering, artifact collection, the output document and the
//! archive.

mod aggregator;
mod archive;
mod collector;
mod document;
mod filter;
mod renderer;
mod script;
mod summary;

pub use aggregator::{excerpt, Classification, ResultAggregator, SUMMARY_EXCERPT_CHARS};
pub use archive::{
    total_size, ArchiveBuilder, ArchiveInputs, ArchiveReport, ARCHIVE_ROOT, INCLUDE_DIR,
    MAX_INCLUDE_BYTES, SCRIPT_OUTPUT_DIR,
};
pub use collector::{ArtifactCollector, Rejection, MAX_NAME_ATTEMPTS};
pub use document::{OutputDocument, ResultEntry};
pub use filter::{HiddenCounts, StatusFilter};
pub use renderer::{NullRenderer, OutputRenderer, RenderEvent};
pub use script::ScriptData;
pub use summary::write_summary;

/// Name of the JSON output document, in the output directory and the archive.
pub const OUTPUT_DOCUMENT_NAME: &str = "diagkit-output.json";
/// Listing of archived artifact names.
pub const FILE_LIST_NAME: &str = "diagkit-filelist.txt";
pub const DEFAULT_ARCHIVE_NAME: &str = "diagkit-output.zip";
