//! Generic external-process execution with timeout and guaranteed kill.
//!
//! Nothing in here knows about Terraform. The production implementation uses
//! tokio; test doubles return canned results without spawning processes.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

/// Default timeout for one Terraform invocation. Apply and destroy of the
/// full pipeline stack routinely block for many minutes; one hour is the
/// hard stop for a wedged provider plugin.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// One command invocation: program, arguments, working directory and the
/// extra environment variables layered on top of the inherited process env.
pub struct CommandSpec<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    pub current_dir: &'a Path,
    pub env: &'a [(String, String)],
}

impl CommandSpec<'_> {
    /// Rendered form for error messages, e.g. `terraform apply -input=false`.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.program.to_string();
        for arg in self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Abstracts process execution so the Terraform wrapper can be unit tested
/// against recorded invocations instead of real processes.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a command with the runner's default timeout.
    async fn run(&self, spec: &CommandSpec<'_>) -> Result<Output>;

    /// Run a command with a custom timeout (overrides the default).
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds
    /// `timeout`. On timeout the child must be killed, not left orphaned.
    async fn run_with_timeout(&self, spec: &CommandSpec<'_>, timeout: Duration) -> Result<Output>;
}

/// Production `CommandRunner` backed by `tokio::process`.
///
/// `tokio::time::timeout` around `.output().await` does not kill the child
/// on Windows when the timeout fires — the future is dropped but the OS
/// process keeps running. `tokio::select!` with an explicit `child.kill()`
/// guarantees termination on all platforms.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: &CommandSpec<'_>) -> Result<Output> {
        self.run_with_timeout(spec, self.timeout).await
    }

    async fn run_with_timeout(&self, spec: &CommandSpec<'_>, timeout: Duration) -> Result<Output> {
        let mut child = tokio::process::Command::new(spec.program)
            .args(spec.args)
            .current_dir(spec.current_dir)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", spec.program))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        // Read stdout/stderr CONCURRENTLY with wait(). Terraform writes far
        // more than the OS pipe buffer during apply; waiting first would
        // deadlock once the child blocks on a full pipe.
        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {}", spec.program))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{} timed out after {}s", spec.command_line(), timeout.as_secs())
            }
        }
    }
}
