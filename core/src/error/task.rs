use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier must have exactly three '/'-separated parts: {0}")]
    WrongPartCount(String),

    #[error("identifier parts must be non-empty and contain no '/': {0}")]
    InvalidPart(String),
}

/// Raised when a dependent reads an upstream payload of the wrong shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("upstream result carries no payload")]
    Missing,

    #[error("payload does not decode as {expected}: {message}")]
    Decode {
        expected: &'static str,
        message: String,
    },
}
