//! Thin wrapper over the Terraform CLI.
//!
//! Every operation builds a fixed argument list and routes it through a
//! [`CommandRunner`], so unit tests can assert the exact invocations without
//! spawning processes. Failed runs whose output matches a configured
//! retryable pattern are re-run after a delay, up to the retry budget.

pub mod options;
pub mod outputs;

pub use options::{Options, RetryablePattern};
pub use outputs::StackOutputs;

use std::process::Output;

use anyhow::{Context, Result};

use crate::command_runner::{CommandRunner, CommandSpec, TokioCommandRunner};
use crate::error::TerraformError;
use crate::output as log;

pub struct TerraformCli<R: CommandRunner> {
    runner: R,
    options: Options,
}

impl TerraformCli<TokioCommandRunner> {
    /// Production wrapper with the default runner and timeout.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            runner: TokioCommandRunner::default(),
            options,
        }
    }
}

impl<R: CommandRunner> TerraformCli<R> {
    pub fn with_runner(runner: R, options: Options) -> Self {
        Self { runner, options }
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// # Errors
    ///
    /// Returns an error if `terraform init` fails after any configured
    /// retries.
    pub async fn init(&self) -> Result<()> {
        log::step("terraform init");
        self.run(self.build_args(&["init", "-input=false"], false))
            .await
            .map(drop)
    }

    /// Apply with every configured `-var`, auto-approved.
    ///
    /// # Errors
    ///
    /// Returns an error if the apply fails after any configured retries.
    /// Resources may exist even then — callers own the destroy.
    pub async fn apply(&self) -> Result<()> {
        log::step("terraform apply");
        self.run(self.build_args(&["apply", "-input=false", "-auto-approve"], true))
            .await
            .map(drop)
    }

    /// # Errors
    ///
    /// Returns the first error of `init` or `apply`.
    pub async fn init_and_apply(&self) -> Result<()> {
        self.init().await?;
        self.apply().await
    }

    /// # Errors
    ///
    /// Returns an error if the destroy fails after any configured retries.
    pub async fn destroy(&self) -> Result<()> {
        log::step("terraform destroy");
        self.run(self.build_args(&["destroy", "-input=false", "-auto-approve"], true))
            .await
            .map(drop)
    }

    /// Static syntax validation; provisions nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if validation reports any error.
    pub async fn validate(&self) -> Result<()> {
        self.run(self.build_args(&["validate"], false))
            .await
            .map(drop)
    }

    /// Check-only formatting pass; fails if any source file differs from
    /// canonical form.
    ///
    /// # Errors
    ///
    /// Returns an error if any file is not canonically formatted.
    pub async fn fmt_check(&self) -> Result<()> {
        self.run_command(&["fmt", "-check"]).await.map(drop)
    }

    /// Escape hatch for subcommands without a dedicated wrapper. Vars are
    /// not appended; the retry policy still applies.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails after any configured retries.
    pub async fn run_command(&self, args: &[&str]) -> Result<Output> {
        self.run(self.build_args(args, false)).await
    }

    /// Value of a single declared output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the output is missing,
    /// non-string, or empty.
    pub async fn output(&self, name: &str) -> Result<String> {
        let out = self
            .run(self.build_args(&["output", "-json", name], false))
            .await?;
        outputs::decode_single(name, &out.stdout)
    }

    /// Snapshot of every declared output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or its output cannot be
    /// decoded.
    pub async fn outputs(&self) -> Result<StackOutputs> {
        let out = self.run(self.build_args(&["output", "-json"], false)).await?;
        StackOutputs::decode(&out.stdout)
    }

    fn build_args(&self, base: &[&str], with_vars: bool) -> Vec<String> {
        let mut args: Vec<String> = base.iter().map(ToString::to_string).collect();
        if self.options.no_color {
            args.push("-no-color".to_string());
        }
        if with_vars {
            for (key, value) in &self.options.vars {
                args.push("-var".to_string());
                args.push(format!("{key}={value}"));
            }
        }
        args
    }

    /// Shared invocation path: run, classify failures, retry transient ones.
    async fn run(&self, args: Vec<String>) -> Result<Output> {
        let env: Vec<(String, String)> = self
            .options
            .env_vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let spec = CommandSpec {
            program: &self.options.terraform_binary,
            args: &args,
            current_dir: &self.options.terraform_dir,
            env: &env,
        };
        let command_line = spec.command_line();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let output = self
                .runner
                .run(&spec)
                .await
                .with_context(|| format!("failed to run `{command_line}`"))?;
            if output.status.success() {
                return Ok(output);
            }

            let combined = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            let Some(rule) = self.options.matching_retryable(&combined) else {
                return Err(TerraformError::CommandFailed {
                    command: command_line,
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
                .into());
            };
            if attempt > self.options.max_retries {
                return Err(TerraformError::RetriesExhausted {
                    command: command_line,
                    reason: rule.reason().to_string(),
                    attempts: attempt,
                }
                .into());
            }
            log::warn(&format!(
                "{} — retrying in {}s (attempt {attempt}/{})",
                rule.reason(),
                self.options.time_between_retries.as_secs(),
                self.options.max_retries
            ));
            tokio::time::sleep(self.options.time_between_retries).await;
        }
    }
}
