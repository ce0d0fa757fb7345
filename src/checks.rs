//! Non-fatal assertion collection.
//!
//! Acceptance checks must not abort the test body — every failure is
//! recorded, the remaining checks still run, and the stack still gets
//! destroyed. [`CheckReport::into_result`] turns the collected verdicts
//! into the single test outcome.

use anyhow::{Result, bail};

use crate::output as log;

#[derive(Debug, Default)]
pub struct CheckReport {
    passed: Vec<String>,
    failures: Vec<String>,
}

impl CheckReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Substring check.
    pub fn contains(&mut self, what: &str, actual: &str, fragment: &str) {
        if actual.contains(fragment) {
            self.pass(format!("{what} contains \"{fragment}\""));
        } else {
            self.fail(format!(
                "{what}: expected \"{actual}\" to contain \"{fragment}\""
            ));
        }
    }

    /// Exact-equality check — any deviation fails, including extra suffixes.
    pub fn equals(&mut self, what: &str, actual: &str, expected: &str) {
        if actual == expected {
            self.pass(format!("{what} == \"{expected}\""));
        } else {
            self.fail(format!(
                "{what}: expected exactly \"{expected}\", got \"{actual}\""
            ));
        }
    }

    pub fn non_empty(&mut self, what: &str, actual: &str) {
        if actual.is_empty() {
            self.fail(format!("{what} is empty"));
        } else {
            self.pass(format!("{what} is set"));
        }
    }

    pub fn is_true(&mut self, what: &str, condition: bool) {
        if condition {
            self.pass(what.to_string());
        } else {
            self.fail(format!("{what}: expected to hold, did not"));
        }
    }

    /// A check that could not even run (e.g. a cloud lookup failed). Counts
    /// as a failure; the error is preserved in the report.
    pub fn record_error(&mut self, what: &str, err: &anyhow::Error) {
        self.fail(format!("{what}: {err:#}"));
    }

    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.passed.len()
    }

    /// Final verdict: `Ok` iff every check passed.
    ///
    /// # Errors
    ///
    /// Returns an error listing every recorded failure.
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        bail!(
            "{} of {} checks failed:\n  - {}",
            self.failures.len(),
            self.failures.len() + self.passed.len(),
            self.failures.join("\n  - ")
        )
    }

    fn pass(&mut self, line: String) {
        log::success(&line);
        self.passed.push(line);
    }

    fn fail(&mut self, line: String) {
        log::error(&line);
        self.failures.push(line);
    }
}
