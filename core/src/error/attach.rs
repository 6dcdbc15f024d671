use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single upload. The first one aborts the whole batch.
#[derive(Error, Debug)]
pub enum AttachError {
    #[error("could not obtain upload url for {filename}: {message}")]
    UploadUrl { filename: String, message: String },

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("transport error talking to {url}: {message}")]
    Transport { url: String, message: String },

    #[error("could not open {path} for upload: {source}")]
    Reader {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}
