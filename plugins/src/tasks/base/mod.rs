pub mod app_name;
pub mod env_vars;
pub mod init_system;

pub use app_name::{AppName, AppNameInfo};
pub use env_vars::{CollectEnvVars, EnvVars};
pub use init_system::InitSystem;
