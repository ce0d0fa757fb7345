//! Test configuration for the pipeline stack.
//!
//! One immutable value per test, built from committed defaults, an optional
//! YAML override file, and environment overrides applied last. The derived
//! expectation names below are the single source of the `<project>-…`
//! naming convention the stack must follow.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Override file looked up relative to the test working directory.
pub const DEFAULT_CONFIG_FILE: &str = "harness.yaml";

/// The declared inputs of the Terraform stack, passed as `-var` flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub aws_region: String,
    pub project_name: String,
    pub github_owner: String,
    pub github_repo: String,
    pub github_token: String,
    pub allowed_ip_range: String,
    pub public_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aws_region: "us-east-1".to_string(),
            project_name: "test-dp".to_string(),
            github_owner: "SomRav".to_string(),
            github_repo: "aws-devops-pipeline".to_string(),
            github_token: "dummy-token-for-testing".to_string(),
            allowed_ip_range: "10.0.0.0/16".to_string(),
            public_key: "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC... dummy-key".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, then the override file (`PIPELINE_TEST_CONFIG` or
    /// [`DEFAULT_CONFIG_FILE`] if present), then environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an override file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("PIPELINE_TEST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Read a config file, falling back to defaults when it does not exist.
    /// Unknown fields are ignored so the file can carry operator notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PIPELINE_TEST_REGION") {
            self.aws_region = v;
        }
        if let Ok(v) = std::env::var("PIPELINE_TEST_PROJECT") {
            self.project_name = v;
        }
        if let Ok(v) = std::env::var("GITHUB_OWNER") {
            self.github_owner = v;
        }
        if let Ok(v) = std::env::var("GITHUB_REPO") {
            self.github_repo = v;
        }
        if let Ok(v) = std::env::var("GITHUB_TOKEN") {
            self.github_token = v;
        }
        if let Ok(v) = std::env::var("PIPELINE_TEST_ALLOWED_IP_RANGE") {
            self.allowed_ip_range = v;
        }
        if let Ok(v) = std::env::var("PIPELINE_TEST_PUBLIC_KEY") {
            self.public_key = v;
        }
    }

    /// Variable map for `-var` flags, one entry per declared input.
    #[must_use]
    pub fn vars(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("aws_region".to_string(), self.aws_region.clone()),
            ("project_name".to_string(), self.project_name.clone()),
            ("github_owner".to_string(), self.github_owner.clone()),
            ("github_repo".to_string(), self.github_repo.clone()),
            ("github_token".to_string(), self.github_token.clone()),
            (
                "allowed_ip_range".to_string(),
                self.allowed_ip_range.clone(),
            ),
            ("public_key".to_string(), self.public_key.clone()),
        ])
    }

    /// Process environment for every Terraform invocation.
    #[must_use]
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("AWS_DEFAULT_REGION".to_string(), self.aws_region.clone())])
    }

    // ── Derived expectations ─────────────────────────────────────────────

    /// Substring the `pipeline_name` output must contain.
    #[must_use]
    pub fn expected_pipeline_fragment(&self) -> String {
        format!("{}-pipeline", self.project_name)
    }

    /// Substring the `s3_bucket_name` output must contain.
    #[must_use]
    pub fn expected_artifacts_bucket_fragment(&self) -> String {
        format!("{}-codepipeline-artifacts", self.project_name)
    }

    /// Substring the `ecr_repository_url` output must contain.
    #[must_use]
    pub fn expected_ecr_fragment(&self) -> String {
        format!("{}-app", self.project_name)
    }

    /// Exact expected `codebuild_project_name`.
    #[must_use]
    pub fn expected_codebuild_project(&self) -> String {
        format!("{}-build", self.project_name)
    }

    /// Exact expected `codedeploy_application_name`.
    #[must_use]
    pub fn expected_codedeploy_application(&self) -> String {
        format!("{}-app", self.project_name)
    }

    /// `Name` tag carried by the app server instance.
    #[must_use]
    pub fn expected_server_name_tag(&self) -> String {
        format!("{}-app-server", self.project_name)
    }
}
