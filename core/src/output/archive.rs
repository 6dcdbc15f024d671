use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;
use crate::task::FileCopyEnvelope;

use super::script::ScriptData;
use super::{FILE_LIST_NAME, OUTPUT_DOCUMENT_NAME};

/// Every entry lives under this directory inside the archive.
pub const ARCHIVE_ROOT: &str = "diagkit-output/";
pub const SCRIPT_OUTPUT_DIR: &str = "ScriptOutput/";
pub const INCLUDE_DIR: &str = "Include/";

/// Include paths totalling this many bytes or more are rejected.
pub const MAX_INCLUDE_BYTES: u64 = 4_000_000_000;

/// Everything that goes into one archive.
#[derive(Debug, Default)]
pub struct ArchiveInputs<'a> {
    pub artifacts: &'a [FileCopyEnvelope],
    /// Already serialized output document.
    pub output_document: &'a str,
    pub script: Option<&'a ScriptData>,
    pub include: Option<&'a Path>,
}

/// What ended up in the archive and what did not.
#[derive(Debug)]
pub struct ArchiveReport {
    pub path: PathBuf,
    /// Entry names, in write order.
    pub entries: Vec<String>,
    /// Sources skipped because of an I/O error, with the reason.
    pub skipped: Vec<(String, String)>,
    /// Set when the include step was rejected; the rest of the archive is
    /// still complete.
    pub include_error: Option<ArchiveError>,
}

/// Writes the run's artifacts into a single deflate-compressed zip file.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    max_include_bytes: u64,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self {
            max_include_bytes: MAX_INCLUDE_BYTES,
        }
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_include_bytes(mut self, max: u64) -> Self {
        self.max_include_bytes = max;
        self
    }

    /// Build the archive at `dest`.
    ///
    /// Only failing to create or finalize the archive itself is an error.
    /// Per-file problems are logged and recorded in the report.
    pub fn build(&self, dest: &Path, inputs: &ArchiveInputs<'_>) -> Result<ArchiveReport, ArchiveError> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        let file = File::create(dest).map_err(|e| ArchiveError::io(dest, e))?;
        let mut session = Session {
            zip: ZipWriter::new(BufWriter::new(file)),
            report: ArchiveReport {
                path: dest.to_path_buf(),
                entries: Vec::new(),
                skipped: Vec::new(),
                include_error: None,
            },
            file_list: Vec::new(),
            names: HashSet::new(),
        };

        session.write_bytes(
            &format!("{ARCHIVE_ROOT}{OUTPUT_DOCUMENT_NAME}"),
            inputs.output_document.as_bytes(),
        )?;

        for envelope in inputs.artifacts {
            session.add_artifact(envelope)?;
        }

        if let Some(script) = inputs.script {
            for path in script.files() {
                let name = format!("{ARCHIVE_ROOT}{SCRIPT_OUTPUT_DIR}{}", relative_slash_path(path));
                if session.add_file(&name, path)? {
                    session.file_list.push(name);
                }
            }
        }

        if let Some(include) = inputs.include {
            match self.check_include(include) {
                Ok(size) => {
                    tracing::info!(
                        target: "diagkit.archive",
                        path = %include.display(),
                        bytes = size,
                        "adding included files"
                    );
                    session.add_include(include)?;
                }
                Err(err) => {
                    tracing::warn!(target: "diagkit.archive", error = %err, "include rejected");
                    session.report.include_error = Some(err);
                }
            }
        }

        let listing = session.file_list.join("\n");
        session.write_bytes(&format!("{ARCHIVE_ROOT}{FILE_LIST_NAME}"), listing.as_bytes())?;

        let Session { zip, report, .. } = session;
        let mut out = zip.finish()?;
        out.flush().map_err(|e| ArchiveError::io(dest, e))?;

        tracing::info!(
            target: "diagkit.archive",
            path = %dest.display(),
            entries = report.entries.len(),
            skipped = report.skipped.len(),
            "archive written"
        );
        Ok(report)
    }

    /// Total size of the regular files under `path`, failing when it
    /// reaches the include ceiling.
    fn check_include(&self, path: &Path) -> Result<u64, ArchiveError> {
        if !path.exists() {
            return Err(ArchiveError::IncludeMissing(path.to_path_buf()));
        }
        let size = total_size(path);
        if size >= self.max_include_bytes {
            return Err(ArchiveError::IncludeTooLarge {
                path: path.to_path_buf(),
                size,
            });
        }
        Ok(size)
    }
}

/// Sum of regular file sizes under `path`. Unreadable entries are logged
/// and not counted.
pub fn total_size(path: &Path) -> u64 {
    let mut total = 0u64;
    for entry in WalkDir::new(path) {
        match entry.and_then(|e| e.metadata().map(|m| (e, m))) {
            Ok((_, meta)) if meta.is_file() => total = total.saturating_add(meta.len()),
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(target: "diagkit.archive", error = %err, "error getting size");
            }
        }
    }
    total
}

struct Session {
    zip: ZipWriter<BufWriter<File>>,
    report: ArchiveReport,
    file_list: Vec<String>,
    names: HashSet<String>,
}

impl Session {
    fn options(large: bool) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(large)
    }

    fn write_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        self.zip.start_file(name, Self::options(false))?;
        self.zip
            .write_all(bytes)
            .map_err(|e| ArchiveError::io(name, e))?;
        self.names.insert(name.to_string());
        self.report.entries.push(name.to_string());
        Ok(())
    }

    /// Open entry `name` for writing. A taken name or a refused header
    /// skips `source` instead of failing the archive.
    fn start_entry(&mut self, name: &str, source: &str, large: bool) -> bool {
        if self.names.contains(name) {
            self.skip(source, &format!("archive already has an entry named {name}"));
            return false;
        }
        if let Err(err) = self.zip.start_file(name, Self::options(large)) {
            self.skip(source, &err);
            return false;
        }
        self.names.insert(name.to_string());
        true
    }

    /// Drop the partially written current entry after a copy error.
    fn abort_entry(&mut self, name: &str, source: &str, err: &dyn fmt::Display) {
        self.names.remove(name);
        if let Err(abort_err) = self.zip.abort_file() {
            tracing::warn!(
                target: "diagkit.archive",
                source,
                error = %abort_err,
                "could not remove partial entry"
            );
        }
        self.skip(source, err);
    }

    fn add_artifact(&mut self, envelope: &FileCopyEnvelope) -> Result<(), ArchiveError> {
        let namespace = envelope.identifier.as_deref().unwrap_or("Unknown");
        let name = format!(
            "{ARCHIVE_ROOT}{}/{}",
            namespace.trim_end_matches('/'),
            envelope.store_name()
        );

        if let Some(stream) = &envelope.stream {
            if !self.start_entry(&name, &name, false) {
                return Ok(());
            }
            for chunk in stream.chunks() {
                if let Err(err) = self.zip.write_all(chunk.as_bytes()) {
                    self.abort_entry(&name, &name, &err);
                    return Ok(());
                }
            }
            self.report.entries.push(name.clone());
            self.file_list.push(name);
            return Ok(());
        }

        if self.add_file(&name, &envelope.path)? {
            self.file_list.push(name);
        }
        Ok(())
    }

    /// Copy one on-disk file. Returns whether it was archived.
    fn add_file(&mut self, name: &str, path: &Path) -> Result<bool, ArchiveError> {
        let opened = File::open(path).and_then(|f| f.metadata().map(|m| (f, m)));
        let (mut file, meta) = match opened {
            Ok(v) => v,
            Err(err) => {
                self.skip(&path.display().to_string(), &err);
                return Ok(false);
            }
        };

        let source = path.display().to_string();
        if !self.start_entry(name, &source, meta.len() >= u64::from(u32::MAX)) {
            return Ok(false);
        }
        if let Err(err) = io::copy(&mut file, &mut self.zip) {
            self.abort_entry(name, &source, &err);
            return Ok(false);
        }
        tracing::debug!(target: "diagkit.archive", entry = %name, "file added");
        self.report.entries.push(name.to_string());
        Ok(true)
    }

    fn add_include(&mut self, root: &Path) -> Result<(), ArchiveError> {
        let base = if root.is_dir() {
            root.to_path_buf()
        } else {
            root.parent().map(Path::to_path_buf).unwrap_or_default()
        };

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    self.skip(&path, &err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(&base).unwrap_or(entry.path());
            let name = format!("{ARCHIVE_ROOT}{INCLUDE_DIR}{}", slash_path(rel));
            self.add_file(&name, entry.path())?;
        }
        Ok(())
    }

    fn skip(&mut self, source: &str, err: &dyn fmt::Display) {
        tracing::warn!(
            target: "diagkit.archive",
            source,
            error = %err,
            "could not copy file into archive, skipping"
        );
        self.report
            .skipped
            .push((source.to_string(), err.to_string()));
    }
}

/// `path` as a relative, slash-separated entry name: root, prefix and
/// parent components are dropped.
fn relative_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
