//! Acceptance checks for a provisioned pipeline stack.
//!
//! Takes the output snapshot plus a [`CloudInspector`] and returns the full
//! [`CheckReport`]; callers decide the verdict with
//! [`CheckReport::into_result`]. Kept free of Terraform so the whole check
//! list runs against stubs in unit tests.

use crate::aws::CloudInspector;
use crate::checks::CheckReport;
use crate::config::PipelineConfig;
use crate::terraform::StackOutputs;

/// Every check the pipeline stack must pass after apply: output naming
/// conventions, plus independent existence checks for the artifact bucket
/// and the app server.
pub async fn verify_pipeline_stack(
    config: &PipelineConfig,
    outputs: &StackOutputs,
    aws: &impl CloudInspector,
) -> CheckReport {
    let mut report = CheckReport::new();

    match outputs.require("pipeline_name") {
        Ok(name) => report.contains("pipeline_name", &name, &config.expected_pipeline_fragment()),
        Err(e) => report.record_error("pipeline_name", &e),
    }

    match outputs.require("s3_bucket_name") {
        Ok(bucket) => {
            report.contains(
                "s3_bucket_name",
                &bucket,
                &config.expected_artifacts_bucket_fragment(),
            );
            match aws.bucket_exists(&bucket).await {
                Ok(exists) => report.is_true("artifact bucket exists in region", exists),
                Err(e) => report.record_error("artifact bucket exists in region", &e),
            }
        }
        Err(e) => report.record_error("s3_bucket_name", &e),
    }

    match outputs.require("ecr_repository_url") {
        Ok(url) => report.contains("ecr_repository_url", &url, &config.expected_ecr_fragment()),
        Err(e) => report.record_error("ecr_repository_url", &e),
    }

    match outputs.require("ec2_instance_id") {
        Ok(id) => report.non_empty("ec2_instance_id", &id),
        Err(e) => report.record_error("ec2_instance_id", &e),
    }
    // The app server is located by its Name tag, deliberately not by the
    // ec2_instance_id output value.
    match aws
        .instance_ids_by_tag("Name", &config.expected_server_name_tag())
        .await
    {
        Ok(ids) => report.is_true("app server found by Name tag", !ids.is_empty()),
        Err(e) => report.record_error("app server found by Name tag", &e),
    }

    match outputs.require("codebuild_project_name") {
        Ok(name) => report.equals(
            "codebuild_project_name",
            &name,
            &config.expected_codebuild_project(),
        ),
        Err(e) => report.record_error("codebuild_project_name", &e),
    }

    match outputs.require("codedeploy_application_name") {
        Ok(name) => report.equals(
            "codedeploy_application_name",
            &name,
            &config.expected_codedeploy_application(),
        ),
        Err(e) => report.record_error("codedeploy_application_name", &e),
    }

    report
}
