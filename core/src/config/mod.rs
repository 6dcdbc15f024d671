mod load;
mod types;

pub use load::{get_diagkit_data_dir, load_default, load_from};
pub use types::{AppConfig, AttachConfig, K8sConfig, LoggingConfig, OutputConfig, PodLogApp};
