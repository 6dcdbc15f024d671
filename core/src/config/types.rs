use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::output::{StatusFilter, DEFAULT_ARCHIVE_NAME};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub attach: AttachConfig,

    #[serde(default)]
    pub k8s: K8sConfig,

    /// Options handed to every task, e.g. `k8s_namespace = "monitoring"`.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "diagkit.collector=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the output document and archive are written.
    #[serde(default = "default_output_directory")]
    pub directory: String,

    #[serde(default = "default_archive_name")]
    pub archive_name: String,

    /// Statuses shown while results stream in.
    #[serde(default)]
    pub filter: StatusFilter,

    /// Roots resolved concurrently.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_output_directory() -> String {
    ".".to_string()
}

fn default_archive_name() -> String {
    DEFAULT_ARCHIVE_NAME.to_string()
}

fn default_max_concurrency() -> usize {
    16
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            archive_name: default_archive_name(),
            filter: StatusFilter::default(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachConfig {
    /// Persisted attachment endpoint; a command-line value wins over it.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_upload_timeout_secs() -> u64 {
    crate::attach::UPLOAD_TIMEOUT.as_secs()
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_upload_timeout_secs(),
        }
    }
}

/// One application whose pod logs are collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodLogApp {
    pub name: String,
    /// Label selector passed to `kubectl logs -l`.
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct K8sConfig {
    #[serde(default = "default_pod_log_apps")]
    pub apps: Vec<PodLogApp>,
}

fn default_pod_log_apps() -> Vec<PodLogApp> {
    vec![
        PodLogApp {
            name: "Infrastructure".to_string(),
            selector: "app.kubernetes.io/name=newrelic-infrastructure".to_string(),
        },
        PodLogApp {
            name: "Logging".to_string(),
            selector: "app.kubernetes.io/name=newrelic-logging".to_string(),
        },
    ]
}

impl Default for K8sConfig {
    fn default() -> Self {
        Self {
            apps: default_pod_log_apps(),
        }
    }
}
