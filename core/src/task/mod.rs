//! Task model: identifiers, the task capability set, outcomes and artifacts.

mod envelope;
mod identifier;
mod outcome;
mod traits;

pub use envelope::{ContentStream, FileCopyEnvelope};
pub use identifier::TaskIdentifier;
pub use outcome::{Outcome, Status, TaskResult, DEPENDENCY_NOT_FOUND};
pub use traits::{Options, Task, Upstream};
