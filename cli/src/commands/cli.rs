use std::path::PathBuf;

use clap::Parser;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "diagkit", version, about = "Run diagnostic checks and bundle the results")]
pub struct Args {
    /// Comma-separated task identifiers to run, e.g. `Base/Config/AppName`.
    /// Runs every registered task when omitted.
    #[arg(long, short = 't', value_delimiter = ',')]
    pub tasks: Vec<String>,

    /// Statuses shown while results stream in: a comma list
    /// (`success,warning,failure,error,info,none`) or `all`.
    #[arg(long)]
    pub filter: Option<String>,

    /// Extra file or directory bundled under `Include/` in the archive.
    #[arg(long)]
    pub include: Option<PathBuf>,

    /// Directory for the output document and archive.
    #[arg(long, short = 'o')]
    pub output_path: Option<PathBuf>,

    /// Upload the results with this attachment key.
    #[arg(long)]
    pub attach_key: Option<String>,

    /// Attachment endpoint; wins over the configured one.
    #[arg(long)]
    pub attachment_endpoint: Option<String>,

    /// Kubernetes namespace for cluster checks.
    #[arg(long)]
    pub namespace: Option<String>,

    /// Replace a task's outcome: `ID=STATUS[:SUMMARY]`. Repeatable.
    #[arg(long = "override", action = clap::ArgAction::Append)]
    pub overrides: Vec<String>,

    /// Output captured from a user script, bundled under `ScriptOutput/`.
    #[arg(long)]
    pub script_output: Option<PathBuf>,

    /// Additional files written by the script. Repeatable.
    #[arg(long = "script-file", action = clap::ArgAction::Append, requires = "script_output")]
    pub script_files: Vec<PathBuf>,

    /// List registered tasks and exit.
    #[arg(long)]
    pub list: bool,

    /// Config file to load instead of the default search path.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write only the output document, no archive.
    #[arg(long)]
    pub no_archive: bool,
}
