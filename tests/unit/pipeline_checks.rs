//! The full acceptance check list, run against stub inspectors.
//!
//! Everything the live test asserts is exercised here without AWS: naming
//! conventions, existence confirmation, and the record-don't-abort failure
//! semantics.

#![allow(clippy::expect_used)]

use std::sync::Mutex;

use anyhow::Result;
use pipeline_acceptance::aws::CloudInspector;
use pipeline_acceptance::config::PipelineConfig;
use pipeline_acceptance::terraform::{Options, StackOutputs, TerraformCli};
use pipeline_acceptance::verify::verify_pipeline_stack;

use crate::mocks::{MockCommandRunner, Scripted, ok_output};

/// Decode an output snapshot through the public wrapper path.
async fn outputs_from(json: &[u8]) -> StackOutputs {
    let mock = MockCommandRunner::with_script(vec![Scripted::Ok(ok_output(json))]);
    let tf = TerraformCli::with_runner(mock, Options::new("../terraform"));
    tf.outputs().await.expect("decode outputs")
}

fn healthy_outputs_json() -> Vec<u8> {
    br#"{
        "pipeline_name": {"sensitive": false, "type": "string", "value": "test-dp-pipeline"},
        "s3_bucket_name": {"sensitive": false, "type": "string", "value": "test-dp-codepipeline-artifacts-8f3a91"},
        "ecr_repository_url": {"sensitive": false, "type": "string", "value": "123456789012.dkr.ecr.us-east-1.amazonaws.com/test-dp-app"},
        "ec2_instance_id": {"sensitive": false, "type": "string", "value": "i-0abc1234def56789"},
        "codebuild_project_name": {"sensitive": false, "type": "string", "value": "test-dp-build"},
        "codedeploy_application_name": {"sensitive": false, "type": "string", "value": "test-dp-app"}
    }"#
    .to_vec()
}

// ── Stub inspectors ───────────────────────────────────────────────────────────

/// Bucket exists, one tagged instance; records the tag lookups it serves.
#[derive(Default)]
struct InspectorAllGood {
    tag_lookups: Mutex<Vec<(String, String)>>,
}

impl CloudInspector for InspectorAllGood {
    async fn bucket_exists(&self, _bucket: &str) -> Result<bool> {
        Ok(true)
    }
    async fn instance_ids_by_tag(&self, key: &str, value: &str) -> Result<Vec<String>> {
        self.tag_lookups
            .lock()
            .expect("mutex poisoned")
            .push((key.to_string(), value.to_string()));
        Ok(vec!["i-0abc1234def56789".to_string()])
    }
}

/// Stack outputs look right but the cloud disagrees.
struct InspectorMissingResources;

impl CloudInspector for InspectorMissingResources {
    async fn bucket_exists(&self, _bucket: &str) -> Result<bool> {
        Ok(false)
    }
    async fn instance_ids_by_tag(&self, _key: &str, _value: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// The inspection API itself is down.
struct InspectorUnavailable;

impl CloudInspector for InspectorUnavailable {
    async fn bucket_exists(&self, _bucket: &str) -> Result<bool> {
        anyhow::bail!("dispatch failure: connection refused")
    }
    async fn instance_ids_by_tag(&self, _key: &str, _value: &str) -> Result<Vec<String>> {
        anyhow::bail!("dispatch failure: connection refused")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn healthy_stack_passes_every_check() {
    let config = PipelineConfig::default();
    let outputs = outputs_from(&healthy_outputs_json()).await;
    let aws = InspectorAllGood::default();

    let report = verify_pipeline_stack(&config, &outputs, &aws).await;

    assert_eq!(report.failures(), &[] as &[String]);
    assert_eq!(report.passed_count(), 8);
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn app_server_is_looked_up_by_name_tag() {
    let config = PipelineConfig::default();
    let outputs = outputs_from(&healthy_outputs_json()).await;
    let aws = InspectorAllGood::default();

    let _ = verify_pipeline_stack(&config, &outputs, &aws).await;

    let lookups = aws.tag_lookups.lock().expect("mutex poisoned");
    assert_eq!(
        *lookups,
        [("Name".to_string(), "test-dp-app-server".to_string())]
    );
}

#[tokio::test]
async fn misnamed_resources_fail_exactly_their_checks() {
    let config = PipelineConfig::default();
    // CodeBuild has an extra suffix (exact check must fail); pipeline name
    // misses the project prefix (substring check must fail).
    let outputs = outputs_from(
        br#"{
        "pipeline_name": {"type": "string", "value": "legacy-pipeline"},
        "s3_bucket_name": {"type": "string", "value": "test-dp-codepipeline-artifacts-8f3a91"},
        "ecr_repository_url": {"type": "string", "value": "123456789012.dkr.ecr.us-east-1.amazonaws.com/test-dp-app"},
        "ec2_instance_id": {"type": "string", "value": "i-0abc1234def56789"},
        "codebuild_project_name": {"type": "string", "value": "test-dp-build-v2"},
        "codedeploy_application_name": {"type": "string", "value": "test-dp-app"}
    }"#,
    )
    .await;
    let aws = InspectorAllGood::default();

    let report = verify_pipeline_stack(&config, &outputs, &aws).await;

    assert_eq!(report.failures().len(), 2);
    assert_eq!(report.passed_count(), 6);
    let verdict = report.into_result().expect_err("two checks failed");
    let msg = verdict.to_string();
    assert!(msg.contains("pipeline_name"));
    assert!(msg.contains("codebuild_project_name"));
}

#[tokio::test]
async fn cloud_disagreement_fails_existence_checks_only() {
    let config = PipelineConfig::default();
    let outputs = outputs_from(&healthy_outputs_json()).await;

    let report = verify_pipeline_stack(&config, &outputs, &InspectorMissingResources).await;

    assert_eq!(report.failures().len(), 2);
    let verdict = report.into_result().expect_err("existence checks failed");
    let msg = verdict.to_string();
    assert!(msg.contains("artifact bucket exists"));
    assert!(msg.contains("app server found by Name tag"));
}

#[tokio::test]
async fn inspection_outage_is_recorded_not_fatal() {
    let config = PipelineConfig::default();
    let outputs = outputs_from(&healthy_outputs_json()).await;

    let report = verify_pipeline_stack(&config, &outputs, &InspectorUnavailable).await;

    // Both cloud lookups fail, every local check still ran.
    assert_eq!(report.failures().len(), 2);
    assert_eq!(report.passed_count(), 6);
    let verdict = report.into_result().expect_err("lookups failed");
    assert!(verdict.to_string().contains("connection refused"));
}

#[tokio::test]
async fn missing_outputs_are_each_recorded() {
    let config = PipelineConfig::default();
    let outputs = outputs_from(b"{}").await;
    let aws = InspectorAllGood::default();

    let report = verify_pipeline_stack(&config, &outputs, &aws).await;

    // Six output reads fail; the tag lookup is independent and still passes.
    assert_eq!(report.failures().len(), 6);
    assert_eq!(report.passed_count(), 1);
}
