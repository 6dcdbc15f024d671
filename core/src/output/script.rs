use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output of a user script run outside the task engine, bundled under
/// `ScriptOutput/` in the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptData {
    pub output_path: PathBuf,
    #[serde(default)]
    pub addtl_files: Vec<PathBuf>,
}

impl ScriptData {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            addtl_files: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.addtl_files.push(path.into());
        self
    }

    /// The output file followed by the additional files.
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.output_path).chain(self.addtl_files.iter())
    }
}
