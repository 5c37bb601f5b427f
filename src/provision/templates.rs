//! Rendered configuration files
//!
//! Output must be byte-for-byte stable for equal inputs: file content feeds
//! the step fingerprints.

use crate::config::{EduroamConfig, ProvisionConfig};
use std::fmt::Write;
use std::path::Path;

/// Where the sensor application is installed
pub const SENSOR_HOME: &str = "/opt/ratsensor";

/// `wpa_supplicant.conf` with a single eduroam network block
pub fn wpa_supplicant_conf(eduroam: &EduroamConfig) -> String {
    let mut out = String::new();
    out.push_str("ctrl_interface=DIR=/var/run/wpa_supplicant GROUP=netdev\n");
    out.push_str("update_config=1\n");
    let _ = writeln!(out, "country={}", eduroam.country);
    out.push('\n');
    out.push_str("network={\n");
    out.push_str("    ssid=\"eduroam\"\n");
    out.push_str("    scan_ssid=1\n");
    out.push_str("    key_mgmt=WPA-EAP\n");
    out.push_str("    eap=PEAP\n");
    let _ = writeln!(out, "    identity=\"{}\"", eduroam.identity);
    let _ = writeln!(out, "    anonymous_identity=\"{}\"", eduroam.anonymous_identity);
    let _ = writeln!(out, "    password=\"{}\"", eduroam.password);
    if let Some(ca_cert) = &eduroam.ca_cert {
        let _ = writeln!(out, "    ca_cert=\"{}\"", ca_cert.display());
    }
    out.push_str("    phase1=\"peaplabel=0\"\n");
    out.push_str("    phase2=\"auth=MSCHAPV2\"\n");
    out.push_str("}\n");
    out
}

/// Environment file read by the sensor service
pub fn sensor_env(config: &ProvisionConfig) -> String {
    let mqtt = &config.mqtt;
    let sensor = &config.sensor;
    let retry = &config.retry;

    let mut out = String::from("# Managed by piprov; local edits are overwritten\n");
    env_line(&mut out, "MQTT_BROKER", &mqtt.broker);
    env_line(&mut out, "MQTT_PORT", &mqtt.port.to_string());
    if let (Some(user), Some(pass)) = (&mqtt.username, &mqtt.password) {
        env_line(&mut out, "MQTT_USER", user);
        env_line(&mut out, "MQTT_PASS", pass);
    }
    env_line(&mut out, "MQTT_SENSOR_TOPIC_TEMPLATE", &mqtt.sensor_topic);
    env_line(&mut out, "MQTT_INFO_TOPIC_TEMPLATE", &mqtt.info_topic);
    if let Some(admin) = &mqtt.admin_topic {
        env_line(&mut out, "ADMIN_TOPIC", admin);
    }
    env_line(&mut out, "LISTEN_FOR_ADMIN_COMMANDS", bool_str(mqtt.listen_for_admin));

    env_line(&mut out, "MQTT_INITIAL_RETRY_DELAY", &retry.initial_delay.as_secs().to_string());
    env_line(&mut out, "MQTT_MAX_RETRY_DELAY", &retry.max_delay.as_secs().to_string());
    env_line(&mut out, "MQTT_RETRY_BACKOFF_FACTOR", &format!("{:?}", retry.factor));

    env_line(&mut out, "READ_INTERVAL_SECONDS", &sensor.read_interval_secs.to_string());
    env_path(&mut out, "DEVICE_ID_FILE", &sensor.device_id_file);
    env_path(&mut out, "DATABASE_FILE", &sensor.database_file);
    env_path(&mut out, "LOG_FILE", &sensor.log_file);
    env_line(&mut out, "SIMULATION_MODE", bool_str(sensor.simulation_mode));
    env_line(&mut out, "DHT_PIN", &sensor.dht_pin.to_string());
    out
}

/// systemd unit for the sensor service
pub fn sensor_unit(env_file: &Path, restart_secs: u64) -> String {
    format!(
        "[Unit]
Description=Rat sensor telemetry publisher
After=network-online.target
Wants=network-online.target

[Service]
Type=simple
EnvironmentFile={env_file}
WorkingDirectory={home}
ExecStart={home}/venv/bin/python {home}/main.py
Restart=on-failure
RestartSec={restart_secs}

[Install]
WantedBy=multi-user.target
",
        env_file = env_file.display(),
        home = SENSOR_HOME,
    )
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn env_path(out: &mut String, key: &str, value: &Path) {
    env_line(out, key, &value.to_string_lossy());
}

/// `KEY="value"` with backslashes and quotes escaped
fn env_line(out: &mut String, key: &str, value: &str) {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    let _ = writeln!(out, "{key}=\"{escaped}\"");
}
