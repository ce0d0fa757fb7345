//! Invocation options for the Terraform CLI wrapper.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;

/// Retries installed by [`Options::with_default_retryable_errors`].
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIME_BETWEEN_RETRIES: Duration = Duration::from_secs(5);

/// Transient failures worth retrying regardless of which stack is under
/// test: registry and backend flakiness, plugin startup races, throttling.
/// Patterns are matched against the combined stdout+stderr of a failed run.
const DEFAULT_RETRYABLE_ERRORS: &[(&str, &str)] = &[
    (
        r"(?s).*Failed to load state.*tcp.*timeout.*",
        "transient backend timeout while loading state",
    ),
    (
        r"(?s).*Failed to load backend.*TLS handshake timeout.*",
        "TLS handshake timeout reaching the backend",
    ),
    (
        r"(?s).*Error (installing|configuring).*TLS handshake timeout.*",
        "TLS handshake timeout during provider install",
    ),
    (
        r"(?s).*timeout while waiting for plugin to start.*",
        "provider plugin failed to start in time",
    ),
    (
        r"(?s).*timed out waiting for server handshake.*",
        "provider plugin handshake timed out",
    ),
    (
        r"(?s).*could not query provider registry.*",
        "provider registry unreachable",
    ),
    (
        r"(?s).*connection reset by peer.*",
        "connection reset by peer",
    ),
    (
        r"(?s).*(ThrottlingException|RequestLimitExceeded|Throttling: Rate exceeded).*",
        "AWS API throttling",
    ),
];

/// One retryable-error rule: a pattern over the command output and a short
/// reason used in retry log lines and exhaustion errors.
#[derive(Debug, Clone)]
pub struct RetryablePattern {
    regex: Regex,
    reason: String,
}

impl RetryablePattern {
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn new(pattern: &str, reason: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            reason: reason.to_string(),
        })
    }

    #[must_use]
    pub fn matches(&self, combined_output: &str) -> bool {
        self.regex.is_match(combined_output)
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// The default rule set. Every entry in [`DEFAULT_RETRYABLE_ERRORS`] is a
/// static known-good pattern; the unit suite pins the count to catch a
/// pattern silently dropped by a bad edit.
#[must_use]
pub fn default_retryable_errors() -> Vec<RetryablePattern> {
    DEFAULT_RETRYABLE_ERRORS
        .iter()
        .filter_map(|(pattern, reason)| RetryablePattern::new(pattern, reason).ok())
        .collect()
}

/// Everything one Terraform invocation needs besides the subcommand itself:
/// where to run, which variables and environment to pass, and the retry
/// policy for transient failures.
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory holding the Terraform sources under test.
    pub terraform_dir: PathBuf,
    /// Binary to invoke, `terraform` unless overridden.
    pub terraform_binary: String,
    /// Rendered as `-var key=value`, in key order.
    pub vars: BTreeMap<String, String>,
    /// Extra process environment for every invocation.
    pub env_vars: BTreeMap<String, String>,
    pub retryable_errors: Vec<RetryablePattern>,
    pub max_retries: u32,
    pub time_between_retries: Duration,
    /// Append `-no-color` to every invocation.
    pub no_color: bool,
}

impl Options {
    /// Options with no variables and no retries.
    #[must_use]
    pub fn new(terraform_dir: impl Into<PathBuf>) -> Self {
        Self {
            terraform_dir: terraform_dir.into(),
            terraform_binary: "terraform".to_string(),
            vars: BTreeMap::new(),
            env_vars: BTreeMap::new(),
            retryable_errors: Vec::new(),
            max_retries: 0,
            time_between_retries: DEFAULT_TIME_BETWEEN_RETRIES,
            no_color: false,
        }
    }

    #[must_use]
    pub fn with_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    #[must_use]
    pub fn with_env_vars(mut self, env_vars: BTreeMap<String, String>) -> Self {
        self.env_vars = env_vars;
        self
    }

    /// Install the default retryable-error rules with the default retry
    /// budget. Apply this to every options value that drives real
    /// provisioning; transient registry and API flakiness is the norm, not
    /// the exception.
    #[must_use]
    pub fn with_default_retryable_errors(mut self) -> Self {
        self.retryable_errors = default_retryable_errors();
        self.max_retries = DEFAULT_MAX_RETRIES;
        self.time_between_retries = DEFAULT_TIME_BETWEEN_RETRIES;
        self
    }

    #[must_use]
    pub fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }

    /// First retryable rule matching the combined output of a failed run.
    #[must_use]
    pub fn matching_retryable(&self, combined_output: &str) -> Option<&RetryablePattern> {
        self.retryable_errors
            .iter()
            .find(|rule| rule.matches(combined_output))
    }
}
