use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

type LineSource = dyn Fn() -> Box<dyn Iterator<Item = String> + Send> + Send + Sync;

/// Lazily produced text content for artifacts that never existed on disk
/// (command output, generated reports).
#[derive(Clone)]
pub struct ContentStream {
    source: Arc<LineSource>,
}

impl ContentStream {
    pub fn from_fn<F, I>(f: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = String> + Send + 'static,
    {
        let source: Arc<LineSource> =
            Arc::new(move || Box::new(f()) as Box<dyn Iterator<Item = String> + Send>);
        Self { source }
    }

    /// Stream an in-memory blob line by line, keeping line terminators.
    pub fn from_blob(blob: impl Into<String>) -> Self {
        let blob: Arc<str> = Arc::from(blob.into());
        Self::from_fn(move || {
            let lines: Vec<String> = blob.split_inclusive('\n').map(str::to_string).collect();
            lines.into_iter()
        })
    }

    pub fn chunks(&self) -> Box<dyn Iterator<Item = String> + Send> {
        (self.source)()
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentStream(..)")
    }
}

/// A file a task wants bundled into the output archive.
#[derive(Debug, Clone)]
pub struct FileCopyEnvelope {
    pub path: PathBuf,
    pub stream: Option<ContentStream>,
    /// Provenance namespace inside the archive; defaults to the producing
    /// task's identifier when the collector accepts the envelope.
    pub identifier: Option<String>,
    duplicate_count: u32,
}

const EXECUTABLE_MAGIC: &[&[u8]] = &[
    b"\x7fELF",         // ELF
    b"MZ",              // PE / COFF
    b"\xfe\xed\xfa\xce", // Mach-O 32
    b"\xfe\xed\xfa\xcf", // Mach-O 64
    b"\xce\xfa\xed\xfe", // Mach-O 32, reversed
    b"\xcf\xfa\xed\xfe", // Mach-O 64, reversed
    b"\xca\xfe\xba\xbe", // Mach-O universal
];

impl FileCopyEnvelope {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stream: None,
            identifier: None,
            duplicate_count: 0,
        }
    }

    /// `name` becomes the in-archive file name; nothing is read from disk.
    pub fn from_stream(name: impl Into<PathBuf>, stream: ContentStream) -> Self {
        Self {
            path: name.into(),
            stream: Some(stream),
            identifier: None,
            duplicate_count: 0,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn is_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn duplicate_count(&self) -> u32 {
        self.duplicate_count
    }

    pub fn increment_duplicate_count(&mut self) {
        self.duplicate_count += 1;
    }

    /// File name used inside the archive. Collisions are broken by the
    /// duplicate counter: `app.log`, `app_1.log`, `app_2.log`, ...
    pub fn store_name(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string());

        if self.duplicate_count == 0 {
            return file_name;
        }

        let path = Path::new(&file_name);
        match (path.file_stem(), path.extension()) {
            (Some(stem), Some(ext)) => format!(
                "{}_{}.{}",
                stem.to_string_lossy(),
                self.duplicate_count,
                ext.to_string_lossy()
            ),
            _ => format!("{}_{}", file_name, self.duplicate_count),
        }
    }

    /// Whether the source is present: streams always are, paths must exist.
    pub fn exists(&self) -> bool {
        self.is_stream() || self.path.exists()
    }

    /// Detect native executables by their magic number. Streams are text
    /// and never executable.
    pub fn is_executable(&self) -> io::Result<bool> {
        if self.is_stream() {
            return Ok(false);
        }
        let mut header = [0u8; 4];
        let mut file = File::open(&self.path)?;
        let mut read = 0;
        while read < header.len() {
            let n = file.read(&mut header[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        let header = &header[..read];
        Ok(EXECUTABLE_MAGIC.iter().any(|magic| header.starts_with(magic)))
    }
}
