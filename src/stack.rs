//! Provisioned-stack lifetime.
//!
//! A stack must never outlive its owning test: [`with_stack`] provisions,
//! hands the output snapshot to the test body, and destroys on every exit
//! path — body failure, output-read failure, provisioning failure, and
//! panic.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use anyhow::{Context, Result, anyhow};
use futures_util::FutureExt;

use crate::command_runner::CommandRunner;
use crate::output as log;
use crate::terraform::{StackOutputs, TerraformCli};

/// Provision with `init` + `apply`, snapshot the declared outputs, run
/// `test`, then destroy unconditionally.
///
/// A failed apply still attempts the destroy — Terraform may have created
/// resources before failing. When both the body and the destroy fail, the
/// body's error is returned and the destroy failure is logged; a destroy
/// failure after a passing body fails the test on its own.
///
/// # Errors
///
/// Returns the first failure of provisioning, output reading, the test
/// body, or teardown.
pub async fn with_stack<R, Fut>(
    terraform: &TerraformCli<R>,
    test: impl FnOnce(StackOutputs) -> Fut,
) -> Result<()>
where
    R: CommandRunner,
    Fut: Future<Output = Result<()>>,
{
    let provisioned = terraform.init_and_apply().await;

    let body = match provisioned {
        Ok(()) => match terraform.outputs().await {
            Ok(outputs) => AssertUnwindSafe(test(outputs))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(anyhow!("test body panicked"))),
            Err(e) => Err(e),
        },
        Err(e) => Err(e).context("provisioning failed"),
    };

    let destroy = terraform.destroy().await;

    match (body, destroy) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(e)) => Err(e).context("stack destroy failed after passing checks"),
        (Err(e), Ok(())) => Err(e),
        (Err(body_err), Err(destroy_err)) => {
            log::warn(&format!("stack destroy also failed: {destroy_err:#}"));
            Err(body_err)
        }
    }
}
