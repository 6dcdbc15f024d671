//! Task execution: registry, dependency graph, memoizing resolver and the
//! engine that ties them to the two output streams.
//!
//! ```text
//! TaskRegistry
//!   ↓
//! DependencyGraph::for_roots() → validate() (cycles fail before anything runs)
//!   ↓
//! dispatch_roots() → one tokio task per root
//!   ↓
//! Resolver::resolve() → dependencies first, each task at most once
//!   ↓
//! results stream (TaskResult) + files stream (FileBatch)
//! ```

mod engine;
mod graph;
mod registry;
mod resolver;
mod scheduler;

pub use engine::{ExecutionEngine, RunStreams};
pub use graph::DependencyGraph;
pub use registry::{Registration, TaskRegistry};
pub use resolver::{FileBatch, Resolver};
pub use scheduler::dispatch_roots;
