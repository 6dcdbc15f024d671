use thiserror::Error;

use super::{ArchiveError, AttachError, ExecutorError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("execution failed: {0}")]
    Executor(#[from] ExecutorError),
    #[error("archive failed: {0}")]
    Archive(#[from] ArchiveError),
    #[error("upload failed: {0}")]
    Attach(#[from] AttachError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
