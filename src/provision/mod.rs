//! The sensor node provisioning plan
//!
//! Turns the configuration into an ordered [`Plan`]: packages, the eduroam
//! client, the sensor service files, then services and the network gate.

pub mod templates;

use crate::config::ProvisionConfig;
use crate::identity::DeviceIdentity;
use anyhow::Result;
use declarative::{Plan, StepDescriptor, combine_fingerprints};
use std::path::Path;

pub const WPA_SUPPLICANT_CONF: &str = "/etc/wpa_supplicant/wpa_supplicant.conf";
pub const SENSOR_ENV_FILE: &str = "/etc/ratsensor/mqtt_config.env";
pub const SENSOR_UNIT: &str = "ratsensor.service";
pub const SENSOR_UNIT_FILE: &str = "/etc/systemd/system/ratsensor.service";
pub const DHCPCD_UNIT: &str = "dhcpcd.service";

const NETWORK_PACKAGES: &[&str] = &["wpasupplicant", "dhcpcd5"];
const SENSOR_PACKAGES: &[&str] = &[
    "python3",
    "python3-venv",
    "python3-pip",
    "sqlite3",
    "i2c-tools",
];

/// Build the plan for a sensor node
pub fn build_plan(config: &ProvisionConfig, identity: &DeviceIdentity) -> Result<Plan> {
    let wpa = StepDescriptor::file_write(
        "file.wpa-supplicant",
        WPA_SUPPLICANT_CONF,
        templates::wpa_supplicant_conf(&config.eduroam),
        0o600,
    )?;
    let device_id = StepDescriptor::file_write(
        "file.device-id",
        &config.sensor.device_id_file,
        identity.render()?,
        0o644,
    )?;
    let sensor_env = StepDescriptor::file_write(
        "file.sensor-env",
        SENSOR_ENV_FILE,
        templates::sensor_env(config),
        0o600,
    )?;
    let sensor_unit = StepDescriptor::file_write(
        "file.sensor-unit",
        SENSOR_UNIT_FILE,
        templates::sensor_unit(Path::new(SENSOR_ENV_FILE), config.retry.initial_delay.as_secs()),
        0o644,
    )?;

    // dhcpcd starts wpa_supplicant through its hook; restart it when the
    // network block changes.
    let dhcpcd_restart = StepDescriptor::service_start(
        "service.dhcpcd.restart",
        DHCPCD_UNIT,
        true,
        Some(wpa.fingerprint().to_string()),
    )?
    .after(["packages.network", "file.wpa-supplicant"]);
    let sensor_enable = StepDescriptor::service_enable(
        "service.ratsensor.enable",
        SENSOR_UNIT,
        Some(sensor_unit.fingerprint().to_string()),
    )?
    .after(["file.sensor-unit"]);
    let sensor_start = StepDescriptor::service_start(
        "service.ratsensor.start",
        SENSOR_UNIT,
        true,
        Some(combine_fingerprints([
            sensor_env.fingerprint(),
            sensor_unit.fingerprint(),
            device_id.fingerprint(),
        ])),
    )?
    .after([
        "packages.sensor",
        "file.device-id",
        "file.sensor-env",
        "file.sensor-unit",
        "service.ratsensor.enable",
    ]);
    // Runs last; the sensor's own broker reconnects cover the gap before it
    let network_wait = StepDescriptor::network_wait(
        "network.wait",
        &config.probe.target,
        config.probe.timeout,
        config.probe.max_attempts,
    )?
    .after(["service.dhcpcd.restart"]);

    let plan = Plan::from_steps([
        StepDescriptor::package_install("packages.network", NETWORK_PACKAGES.iter().copied())?,
        StepDescriptor::package_install("packages.sensor", SENSOR_PACKAGES.iter().copied())?,
        wpa,
        device_id,
        sensor_env,
        sensor_unit,
        dhcpcd_restart,
        sensor_enable,
        sensor_start,
        network_wait,
    ])?;
    log::debug!("Built plan with {} steps", plan.len());
    Ok(plan)
}
