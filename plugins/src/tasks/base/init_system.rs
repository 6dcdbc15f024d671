use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use diagkit_core::task::{Options, Outcome, Task, TaskIdentifier, Upstream};
use diagkit_core::task_id;

lazy_static! {
    static ref SYSTEMD: Regex = Regex::new(r".*/systemd$").unwrap();
    static ref UPSTART: Regex = Regex::new(r".*upstart$").unwrap();
}

type LinkResolver = dyn Fn(&Path) -> io::Result<PathBuf> + Send + Sync;

/// Works out which init system the host runs from where `/sbin/init` points.
pub struct InitSystem {
    runtime_os: String,
    resolve_link: Arc<LinkResolver>,
}

impl InitSystem {
    pub const ID: &'static str = "Base/Env/InitSystem";

    pub fn new() -> Self {
        Self {
            runtime_os: std::env::consts::OS.to_string(),
            resolve_link: Arc::new(|p: &Path| std::fs::canonicalize(p)),
        }
    }

    pub fn with_resolver<F>(runtime_os: &str, resolve_link: F) -> Self
    where
        F: Fn(&Path) -> io::Result<PathBuf> + Send + Sync + 'static,
    {
        Self {
            runtime_os: runtime_os.to_string(),
            resolve_link: Arc::new(resolve_link),
        }
    }
}

impl Default for InitSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Map the resolved init path to a system manager name.
pub fn parse_init_system(init_path: &str) -> Option<&'static str> {
    if init_path == "/sbin/init" {
        return Some("SysV");
    }
    if SYSTEMD.is_match(init_path) {
        return Some("Systemd");
    }
    if UPSTART.is_match(init_path) {
        return Some("Upstart");
    }
    // OpenRC ships /sbin/init as a link to busybox
    if init_path.contains("busybox") {
        return Some("OpenRC Busybox integration");
    }
    None
}

#[async_trait]
impl Task for InitSystem {
    fn identifier(&self) -> TaskIdentifier {
        task_id!(Self::ID)
    }

    fn explain(&self) -> String {
        "Determine Linux init system".to_string()
    }

    async fn execute(&self, _options: &Options, _upstream: &Upstream) -> Outcome {
        match self.runtime_os.as_str() {
            "windows" => return Outcome::none("Task does not apply to Windows"),
            "macos" => return Outcome::none("Task does not apply to Mac OS"),
            _ => {}
        }

        let init_path = match (self.resolve_link)(Path::new("/sbin/init")) {
            Ok(path) => path.display().to_string(),
            Err(err) => {
                return Outcome::none(format!(
                    "Unable to read symbolic link for /sbin/init: {err}"
                ));
            }
        };

        match parse_init_system(&init_path) {
            Some(system) => Outcome::info(format!("{system} detected")).with_payload(&system),
            None => Outcome::none(format!("Unable to parse init system from: {init_path}")),
        }
    }
}
