use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{0}: command not found")]
    NotFound(String),

    #[error("{program} exited with {code}: {stderr}")]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to run {program}: {source}")]
    Io { program: String, source: io::Error },
}

/// Runs external programs for checks that shell out (kubectl, ...).
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` to completion and return its stdout.
    async fn output(&self, program: &str, args: &[String]) -> Result<Vec<u8>, CommandError>;
}

pub struct TokioCommandExecutor;

#[async_trait]
impl CommandExecutor for TokioCommandExecutor {
    async fn output(&self, program: &str, args: &[String]) -> Result<Vec<u8>, CommandError> {
        tracing::debug!(target: "diagkit.command", program, ?args, "running");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => CommandError::NotFound(program.to_string()),
                _ => CommandError::Io {
                    program: program.to_string(),
                    source,
                },
            })?;

        if !output.status.success() {
            return Err(CommandError::Failed {
                program: program.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Returns a canned response and records every invocation.
    pub struct CannedExecutor {
        pub response: Mutex<Option<Result<Vec<u8>, CommandError>>>,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    impl CannedExecutor {
        pub fn ok(stdout: &str) -> Self {
            Self {
                response: Mutex::new(Some(Ok(stdout.as_bytes().to_vec()))),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn err(err: CommandError) -> Self {
            Self {
                response: Mutex::new(Some(Err(err))),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandExecutor for CannedExecutor {
        async fn output(&self, program: &str, args: &[String]) -> Result<Vec<u8>, CommandError> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().cloned());
            self.calls.lock().unwrap().push(call);
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_not_found() {
        let err = TokioCommandExecutor
            .output("diagkit-definitely-missing-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stdout_is_returned() {
        let out = TokioCommandExecutor
            .output("sh", &["-c".to_string(), "printf hello".to_string()])
            .await
            .unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let err = TokioCommandExecutor
            .output("sh", &["-c".to_string(), "echo nope >&2; exit 3".to_string()])
            .await
            .unwrap_err();
        match err {
            CommandError::Failed { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
