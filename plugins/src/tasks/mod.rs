//! Built-in checks.

pub mod base;
pub mod k8s;
pub mod override_task;

pub use override_task::{OverrideParseError, OverrideSpec, OverrideTask};
