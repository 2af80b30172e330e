use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use remedy_core::error::RemedyError;
use remedy_core::types::ProcessResult;
use tokio::process::Command;
use tracing::{info, warn};

const MAX_CAPTURE_BYTES: usize = 12000;

#[async_trait]
pub(crate) trait ProcessInvoker: Send + Sync {
    /// Runs `argv[0]` with the remaining arguments and waits for it to exit.
    async fn run(&self, argv: &[String]) -> Result<ProcessResult, RemedyError>;
}

pub(crate) struct TokioProcessInvoker {
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl TokioProcessInvoker {
    pub(crate) fn new(working_dir: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            working_dir,
            timeout,
        }
    }
}

#[async_trait]
impl ProcessInvoker for TokioProcessInvoker {
    async fn run(&self, argv: &[String]) -> Result<ProcessResult, RemedyError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RemedyError::ProcessInvocationFailed("empty command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        info!("exec: {}", argv.join(" "));
        let out = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(r) => r.map_err(|err| {
                RemedyError::ProcessInvocationFailed(format!("spawn {program} failed: {err}"))
            })?,
            Err(_) => {
                warn!(
                    "exec timed out after {}s, child killed: {}",
                    self.timeout.as_secs(),
                    argv.join(" ")
                );
                return Err(RemedyError::ProcessInvocationFailed(format!(
                    "{program} timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let mut stdout = out.stdout;
        let mut stderr = out.stderr;
        stdout.truncate(MAX_CAPTURE_BYTES);
        stderr.truncate(MAX_CAPTURE_BYTES);
        Ok(ProcessResult {
            // Killed by a signal: no code.
            exit_code: out.status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use super::*;

    /// Records every argv it is handed and answers with a canned result.
    pub(crate) struct SpyInvoker {
        pub(crate) calls: Mutex<Vec<Vec<String>>>,
        pub(crate) reply: Result<ProcessResult, RemedyError>,
    }

    impl SpyInvoker {
        pub(crate) fn exiting(code: i32, stderr: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply: Ok(ProcessResult {
                    exit_code: code,
                    stdout: Vec::new(),
                    stderr: stderr.as_bytes().to_vec(),
                }),
            }
        }

        pub(crate) fn failing(err: RemedyError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply: Err(err),
            }
        }

        pub(crate) fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessInvoker for SpyInvoker {
        async fn run(&self, argv: &[String]) -> Result<ProcessResult, RemedyError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            self.reply.clone()
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_exit_code_and_streams() {
        let invoker = TokioProcessInvoker::new(None, Duration::from_secs(10));
        let out = invoker
            .run(&sh("echo up; echo boom >&2; exit 3"))
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout_text(), "up");
        assert_eq!(out.stderr_text(), "boom");
        assert!(!out.success());
    }

    #[tokio::test]
    async fn runs_in_working_dir() {
        let dir = std::env::temp_dir();
        let invoker = TokioProcessInvoker::new(Some(dir.clone()), Duration::from_secs(10));
        let out = invoker.run(&sh("pwd -P")).await.unwrap();
        assert!(out.success());
        let expected = dir.canonicalize().unwrap();
        assert_eq!(out.stdout_text(), expected.display().to_string());
    }

    #[tokio::test]
    async fn missing_binary_is_invocation_failure() {
        let invoker = TokioProcessInvoker::new(None, Duration::from_secs(10));
        let err = invoker
            .run(&["definitely-not-a-real-binary-7f3a".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::ProcessInvocationFailed(_)));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let invoker = TokioProcessInvoker::new(None, Duration::from_millis(200));
        let err = invoker.run(&sh("sleep 5")).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn empty_argv_is_rejected() {
        let invoker = TokioProcessInvoker::new(None, Duration::from_secs(1));
        assert!(invoker.run(&[]).await.is_err());
    }
}
