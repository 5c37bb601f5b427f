// Provisioning
pub mod apply;
pub mod plan;

// State management
pub mod clear;
pub mod status;

// Diagnostics
pub mod probe;

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::Plan;

use crate::Context;
use crate::config::ProvisionConfig;
use crate::identity::DeviceIdentity;
use crate::provision::build_plan;

/// Configuration, identity and the plan built from them
pub struct LoadedPlan {
    pub config: ProvisionConfig,
    pub identity: DeviceIdentity,
    pub plan: Plan,
}

/// Load the configuration and build the (optionally filtered) plan
pub fn load_plan(ctx: &Context, target: Option<&str>) -> Result<LoadedPlan> {
    let config = ctx
        .settings
        .provisioning()
        .context("Invalid provisioning configuration")?;
    let identity = DeviceIdentity::resolve(&config.sensor.device_id_file)?;
    if identity.generated {
        log::info!("Generated device id {}", identity.id);
    }

    let plan = build_plan(&config, &identity)?.filter_by_target(target);
    if plan.is_empty()
        && let Some(target) = target
    {
        bail!("No steps match '{target}'");
    }

    Ok(LoadedPlan {
        config,
        identity,
        plan,
    })
}
