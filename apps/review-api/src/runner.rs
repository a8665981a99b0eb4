//! Runs archive invocations as child processes

use async_trait::async_trait;
use review_export::{Invocation, ToolOutput};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Executes a planned invocation and captures its stdout
#[async_trait]
pub trait ArchiveRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> ToolOutput;
}

/// Spawns Ghostscript, killing it once the timeout elapses
pub struct GhostscriptRunner {
    timeout: Duration,
}

impl GhostscriptRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ArchiveRunner for GhostscriptRunner {
    async fn run(&self, invocation: &Invocation) -> ToolOutput {
        tracing::info!("Running {}", invocation.command_line());

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => {
                if !output.stderr.is_empty() {
                    tracing::debug!("stderr: {}", String::from_utf8_lossy(&output.stderr));
                }
                ToolOutput {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to spawn {}: {}", invocation.program.display(), e);
                ToolOutput {
                    success: false,
                    stdout: format!("Failed to run {}: {}", invocation.program.display(), e),
                }
            }
            Err(_) => ToolOutput {
                success: false,
                stdout: format!("Timed out after {}s", self.timeout.as_secs()),
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn invocation(program: &str, args: &[&str]) -> Invocation {
        Invocation {
            program: PathBuf::from(program),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let runner = GhostscriptRunner::new(Duration::from_secs(10));
        let output = runner.run(&invocation("echo", &["rendered"])).await;
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "rendered");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let runner = GhostscriptRunner::new(Duration::from_secs(10));
        let output = runner.run(&invocation("sh", &["-c", "echo broken; exit 3"])).await;
        assert!(!output.success);
        assert_eq!(output.stdout.trim(), "broken");
    }

    #[tokio::test]
    async fn test_missing_binary_is_failure() {
        let runner = GhostscriptRunner::new(Duration::from_secs(10));
        let output = runner.run(&invocation("/nonexistent/gs", &[])).await;
        assert!(!output.success);
        assert!(output.stdout.starts_with("Failed to run"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = GhostscriptRunner::new(Duration::from_millis(100));
        let output = runner.run(&invocation("sleep", &["5"])).await;
        assert!(!output.success);
        assert!(output.stdout.starts_with("Timed out"));
    }
}
