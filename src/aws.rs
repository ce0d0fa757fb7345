//! Cloud inspection — independent confirmation that provisioned resources
//! exist, queried from the AWS API rather than Terraform state.

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};

/// Read-only resource lookups used by the acceptance checks. Implemented by
/// [`AwsInspector`] in production and by handwritten stubs in tests.
#[allow(async_fn_in_trait)]
pub trait CloudInspector {
    /// Whether a bucket with this exact name exists in the inspector's
    /// region.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Ids of every EC2 instance carrying the `key=value` tag.
    async fn instance_ids_by_tag(&self, key: &str, value: &str) -> Result<Vec<String>>;
}

/// Production inspector over the AWS SDK, pinned to one region.
pub struct AwsInspector {
    s3: aws_sdk_s3::Client,
    ec2: aws_sdk_ec2::Client,
}

impl AwsInspector {
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .load()
            .await;
        Self {
            s3: aws_sdk_s3::Client::new(&config),
            ec2: aws_sdk_ec2::Client::new(&config),
        }
    }
}

impl CloudInspector for AwsInspector {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.s3.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(service_err).with_context(|| format!("checking bucket {bucket}"))
                }
            }
        }
    }

    async fn instance_ids_by_tag(&self, key: &str, value: &str) -> Result<Vec<String>> {
        let filter = aws_sdk_ec2::types::Filter::builder()
            .name(format!("tag:{key}"))
            .values(value)
            .build();
        let mut ids = Vec::new();
        let mut pages = self
            .ec2
            .describe_instances()
            .filters(filter)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page =
                page.with_context(|| format!("describing instances tagged {key}={value}"))?;
            for reservation in page.reservations() {
                for instance in reservation.instances() {
                    if let Some(id) = instance.instance_id() {
                        ids.push(id.to_string());
                    }
                }
            }
        }
        Ok(ids)
    }
}
