#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;
pub mod task;
pub mod archive;
pub mod attach;

pub use archive::ArchiveError;
pub use attach::AttachError;
pub use error::CliError;
pub use executor::ExecutorError;
pub use task::{IdentifierError, PayloadError};
