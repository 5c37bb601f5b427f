//! Per-kind appliers and postcondition checks
//!
//! Every applier is idempotent: running it again with the same parameters
//! leaves the system unchanged and still succeeds.

use crate::backoff::BackoffConfig;
use crate::cancel::CancelToken;
use crate::context::{ApplyContext, ServiceStatus};
use crate::error::StepError;
use crate::probe::ReachabilityProbe;
use crate::step::{StepDescriptor, StepParams};
use std::time::Duration;

/// Bring the system to the state described by `step`.
pub(crate) fn apply_step(
    step: &StepDescriptor,
    ctx: &ApplyContext<'_>,
    backoff: &BackoffConfig,
    cancel: &CancelToken,
) -> Result<(), StepError> {
    match step.params() {
        StepParams::PackageInstall { packages } => {
            let missing = ctx.packages.missing_packages(packages)?;
            if missing.is_empty() {
                log::debug!("{}: all packages already present", step.id());
                return Ok(());
            }
            log::info!("{}: installing {}", step.id(), missing.join(" "));
            ctx.packages.install_packages(&missing)
        }
        StepParams::FileWrite {
            path,
            content,
            mode,
        } => ctx.fs.write_file(path, content, *mode),
        StepParams::ServiceEnable { unit, .. } => ctx.services.enable(unit),
        StepParams::ServiceStart { unit, restart, .. } => {
            if *restart {
                ctx.services.restart(unit)
            } else {
                ctx.services.start(unit)
            }
        }
        StepParams::NetworkWait {
            target,
            timeout_ms,
            max_attempts,
        } => {
            let reachable = ReachabilityProbe::new(ctx.network, cancel)
                .with_probe_timeout(Duration::from_millis(*timeout_ms))
                .wait_with(target, *max_attempts, backoff);
            if reachable {
                Ok(())
            } else if cancel.is_cancelled() {
                Err(StepError::Cancelled)
            } else {
                Err(StepError::transient(format!(
                    "{target} unreachable after {max_attempts} attempt(s)"
                )))
            }
        }
    }
}

/// Check that the postcondition of `step` holds.
pub(crate) fn verify_step(step: &StepDescriptor, ctx: &ApplyContext<'_>) -> Result<(), StepError> {
    match step.params() {
        StepParams::PackageInstall { packages } => {
            let missing = ctx.packages.missing_packages(packages)?;
            if missing.is_empty() {
                Ok(())
            } else {
                Err(StepError::verification(format!(
                    "packages not installed: {}",
                    missing.join(", ")
                )))
            }
        }
        StepParams::FileWrite {
            path,
            content,
            mode,
        } => {
            match ctx.fs.read_file(path)? {
                Some(actual) if actual == *content => {}
                Some(_) => {
                    return Err(StepError::verification(format!(
                        "{} content differs from desired",
                        path.display()
                    )));
                }
                None => {
                    return Err(StepError::verification(format!(
                        "{} does not exist",
                        path.display()
                    )));
                }
            }
            match ctx.fs.file_mode(path)? {
                Some(actual) if actual & 0o7777 == *mode => Ok(()),
                Some(actual) => Err(StepError::verification(format!(
                    "{} has mode {:04o}, expected {mode:04o}",
                    path.display(),
                    actual & 0o7777
                ))),
                None => Err(StepError::verification(format!(
                    "{} does not exist",
                    path.display()
                ))),
            }
        }
        StepParams::ServiceEnable { unit, .. } => {
            if ctx.services.is_enabled(unit)? {
                Ok(())
            } else {
                Err(StepError::verification(format!("{unit} is not enabled")))
            }
        }
        StepParams::ServiceStart { unit, .. } => match ctx.services.status(unit)? {
            ServiceStatus::Running => Ok(()),
            ServiceStatus::Stopped => {
                Err(StepError::verification(format!("{unit} is not active")))
            }
            ServiceStatus::Failed => Err(StepError::verification(format!("{unit} failed"))),
        },
        // A successful probe is the postcondition.
        StepParams::NetworkWait { .. } => Ok(()),
    }
}
