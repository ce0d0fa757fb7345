//! Typed harness error enums.
//!
//! All error types implement `thiserror::Error` and convert to
//! `anyhow::Error` via the `?` operator at the call sites.

use thiserror::Error;

/// Errors surfaced by the Terraform CLI wrapper.
#[derive(Debug, Error)]
pub enum TerraformError {
    #[error("`{command}` exited with {status}\n{stderr}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("`{command}` still failing after {attempts} attempts ({reason})")]
    RetriesExhausted {
        command: String,
        reason: String,
        attempts: u32,
    },

    #[error("output \"{0}\" is not declared by the stack")]
    MissingOutput(String),

    #[error("output \"{name}\" is not a string (got {found})")]
    NonStringOutput { name: String, found: &'static str },

    #[error("output \"{0}\" is empty")]
    EmptyOutput(String),
}
