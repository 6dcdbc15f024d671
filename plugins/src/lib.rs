pub mod attach;
pub mod command;
pub mod factory;
pub mod renderers;
pub mod tasks;
