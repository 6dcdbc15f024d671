use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(
        "the file(s) included from {path} total {size} bytes, 4GB or larger; please specify a smaller path"
    )]
    IncludeTooLarge { path: PathBuf, size: u64 },

    #[error("no files found at: {0}")]
    IncludeMissing(PathBuf),
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
