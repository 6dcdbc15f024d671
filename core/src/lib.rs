//! Core of diagkit: the task model, the dependency engine that runs checks
//! and the pipeline that turns their results into an output document, an
//! archive and optionally an upload.

pub mod attach;
pub mod config;
pub mod error;
pub mod executor;
pub mod output;
pub mod run;
pub mod task;

pub use executor::{ExecutionEngine, TaskRegistry};
pub use run::{run, RunReport, RunRequest};
pub use task::{FileCopyEnvelope, Options, Outcome, Status, Task, TaskIdentifier, TaskResult};
