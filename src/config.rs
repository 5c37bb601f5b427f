//! Provisioning configuration
//!
//! A flat `KEY=VALUE` env file, overlaid with the process environment.
//! Sections are parsed on demand so commands that only need the state file
//! or the probe settings work without eduroam credentials.

use anyhow::{Context, Result};
use declarative::{BackoffConfig, FailurePolicy};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default location of the provisioning env file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ratsensor/provision.env";

const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_STATE_FILE: &str = "/var/lib/piprov/state.toml";

/// Keys picked up from the process environment
const KNOWN_KEYS: &[&str] = &[
    "MQTT_BROKER",
    "MQTT_PORT",
    "MQTT_USER",
    "MQTT_PASS",
    "SENSOR_TOPIC",
    "INFO_TOPIC",
    "ADMIN_TOPIC",
    "LISTEN_FOR_ADMIN_COMMANDS",
    "READ_INTERVAL",
    "RETRY_INITIAL_DELAY",
    "RETRY_MAX_DELAY",
    "RETRY_BACKOFF_FACTOR",
    "DEVICE_ID_FILE",
    "DATABASE_FILE",
    "LOG_FILE",
    "SIMULATION_MODE",
    "DHT_PIN",
    "EDUROAM_IDENTITY",
    "EDUROAM_PASSWORD",
    "EDUROAM_ANONYMOUS_IDENTITY",
    "EDUROAM_CA_CERT",
    "WIFI_COUNTRY",
    "STATE_FILE",
    "PROBE_TARGET",
    "PROBE_TIMEOUT",
    "PROBE_MAX_ATTEMPTS",
    "STEP_MAX_ATTEMPTS",
    "FAILURE_POLICY",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is required but not set")]
    Missing(&'static str),

    #[error("invalid {key} '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Broker connection and topics for the sensor service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `{}` is replaced with the device id
    pub sensor_topic: String,
    pub info_topic: String,
    pub admin_topic: Option<String>,
    pub listen_for_admin: bool,
}

impl MqttConfig {
    pub fn sensor_topic_for(&self, device_id: &str) -> String {
        self.sensor_topic.replace("{}", device_id)
    }
}

/// eduroam (WPA-EAP PEAP/MSCHAPv2) client credentials
#[derive(Clone, PartialEq, Eq)]
pub struct EduroamConfig {
    pub identity: String,
    pub password: String,
    pub anonymous_identity: String,
    pub ca_cert: Option<PathBuf>,
    pub country: String,
}

impl fmt::Debug for EduroamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EduroamConfig")
            .field("identity", &self.identity)
            .field("password", &"<redacted>")
            .field("anonymous_identity", &self.anonymous_identity)
            .field("ca_cert", &self.ca_cert)
            .field("country", &self.country)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorConfig {
    pub read_interval_secs: u64,
    pub device_id_file: PathBuf,
    pub database_file: PathBuf,
    pub log_file: PathBuf,
    pub simulation_mode: bool,
    pub dht_pin: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// `host:port`
    pub target: String,
    pub timeout: Duration,
    pub max_attempts: u32,
}

/// Everything needed to build the provisioning plan
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub mqtt: MqttConfig,
    pub eduroam: EduroamConfig,
    pub sensor: SensorConfig,
    pub retry: BackoffConfig,
    pub probe: ProbeConfig,
}

// ============================================================================
// Settings
// ============================================================================

/// Raw key-value settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl Settings {
    /// Load the env file at `path` (or the default location), then overlay
    /// the process environment.
    ///
    /// An explicitly given file must exist; a missing default file only
    /// logs a warning.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), expand_path);

        let mut settings = Self::default();
        if path.exists() {
            let iter = dotenvy::from_path_iter(&path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            for item in iter {
                let (key, value) =
                    item.with_context(|| format!("Invalid line in {}", path.display()))?;
                settings.values.insert(key, value);
            }
            log::info!("Loaded configuration from {}", path.display());
            settings.source = Some(path);
        } else if explicit {
            anyhow::bail!("Config file not found: {}", path.display());
        } else {
            log::warn!(
                "Config file {} not found, using environment only",
                path.display()
            );
        }

        for key in KNOWN_KEYS {
            if let Ok(value) = env::var(key) {
                log::debug!("{key} taken from environment");
                settings.values.insert((*key).to_string(), value);
            }
        }

        Ok(settings)
    }

    /// Build settings from literal pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            source: None,
        }
    }

    /// File the settings were read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key)
            .map(str::to_string)
            .ok_or(ConfigError::Missing(key))
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e: T::Err| ConfigError::invalid(key, raw, e.to_string())),
        }
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                ConfigError::invalid(key, raw, "expected true/false, 1/0, yes/no")
            }),
        }
    }

    fn absolute_path(&self, key: &'static str, default: &str) -> Result<PathBuf, ConfigError> {
        let raw = self.string(key, default);
        let path = expand_path(Path::new(&raw));
        if path.is_absolute() {
            Ok(path)
        } else {
            Err(ConfigError::invalid(key, &raw, "must be an absolute path"))
        }
    }

    fn positive_secs(&self, key: &'static str, default: u64) -> Result<u64, ConfigError> {
        let secs: u64 = self.parse(key, default)?;
        if secs == 0 {
            return Err(ConfigError::invalid(key, "0", "must be at least 1 second"));
        }
        Ok(secs)
    }

    /// Location of the step state file
    pub fn state_file(&self) -> PathBuf {
        expand_path(Path::new(&self.string("STATE_FILE", DEFAULT_STATE_FILE)))
    }

    /// Attempts per step before the executor gives up
    pub fn step_max_attempts(&self) -> Result<u32, ConfigError> {
        let attempts: u32 = self.parse("STEP_MAX_ATTEMPTS", 3)?;
        if attempts == 0 {
            return Err(ConfigError::invalid(
                "STEP_MAX_ATTEMPTS",
                "0",
                "must be at least 1",
            ));
        }
        Ok(attempts)
    }

    pub fn failure_policy(&self) -> Result<FailurePolicy, ConfigError> {
        match self.get("FAILURE_POLICY") {
            None => Ok(FailurePolicy::Abort),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "abort" => Ok(FailurePolicy::Abort),
                "continue" => Ok(FailurePolicy::Continue),
                _ => Err(ConfigError::invalid(
                    "FAILURE_POLICY",
                    raw,
                    "expected 'abort' or 'continue'",
                )),
            },
        }
    }

    /// Backoff shared by step retries, network waits and the sensor's
    /// broker reconnects
    pub fn retry(&self) -> Result<BackoffConfig, ConfigError> {
        let initial = self.positive_secs("RETRY_INITIAL_DELAY", 15)?;
        let max = self.positive_secs("RETRY_MAX_DELAY", 300)?;
        let factor: f64 = self.parse("RETRY_BACKOFF_FACTOR", 2.0)?;

        if !factor.is_finite() || factor < 1.0 {
            return Err(ConfigError::invalid(
                "RETRY_BACKOFF_FACTOR",
                &factor.to_string(),
                "must be a number >= 1",
            ));
        }
        if max < initial {
            return Err(ConfigError::invalid(
                "RETRY_MAX_DELAY",
                &max.to_string(),
                format!("must not be below RETRY_INITIAL_DELAY ({initial})"),
            ));
        }

        Ok(BackoffConfig::new(
            Duration::from_secs(initial),
            factor,
            Duration::from_secs(max),
        ))
    }

    pub fn probe(&self) -> Result<ProbeConfig, ConfigError> {
        let target = self.string("PROBE_TARGET", "1.1.1.1:53");
        validate_target(&target)
            .map_err(|reason| ConfigError::invalid("PROBE_TARGET", &target, reason))?;
        Ok(ProbeConfig {
            target,
            timeout: Duration::from_secs(self.positive_secs("PROBE_TIMEOUT", 3)?),
            max_attempts: self.parse("PROBE_MAX_ATTEMPTS", 8)?,
        })
    }

    pub fn mqtt(&self) -> Result<MqttConfig, ConfigError> {
        let (broker, port) = parse_broker(
            &self.string("MQTT_BROKER", "localhost"),
            self.get("MQTT_PORT"),
        )?;

        let username = self.get("MQTT_USER").map(str::to_string);
        let password = self.get("MQTT_PASS").map(str::to_string);
        match (&username, &password) {
            (Some(_), None) => return Err(ConfigError::Missing("MQTT_PASS")),
            (None, Some(_)) => return Err(ConfigError::Missing("MQTT_USER")),
            _ => {}
        }

        Ok(MqttConfig {
            broker,
            port,
            username,
            password,
            sensor_topic: self.string("SENSOR_TOPIC", "sensor/{}"),
            info_topic: self.string("INFO_TOPIC", "info/{}"),
            admin_topic: self.get("ADMIN_TOPIC").map(str::to_string),
            listen_for_admin: self.flag("LISTEN_FOR_ADMIN_COMMANDS", false)?,
        })
    }

    pub fn eduroam(&self) -> Result<EduroamConfig, ConfigError> {
        let identity = self.required("EDUROAM_IDENTITY")?;
        let password = self.required("EDUROAM_PASSWORD")?;

        let realm = match identity.split_once('@') {
            Some((user, realm)) if !user.is_empty() && !realm.is_empty() => realm.to_string(),
            _ => {
                return Err(ConfigError::invalid(
                    "EDUROAM_IDENTITY",
                    &identity,
                    "expected user@realm",
                ));
            }
        };
        let anonymous_identity = self
            .get("EDUROAM_ANONYMOUS_IDENTITY")
            .map_or_else(|| format!("anonymous@{realm}"), str::to_string);

        check_quotable("EDUROAM_IDENTITY", &identity)?;
        check_quotable("EDUROAM_PASSWORD", &password)?;
        check_quotable("EDUROAM_ANONYMOUS_IDENTITY", &anonymous_identity)?;

        let ca_cert = match self.get("EDUROAM_CA_CERT") {
            None => None,
            Some(_) => Some(self.absolute_path("EDUROAM_CA_CERT", "")?),
        };

        let country = self.string("WIFI_COUNTRY", "GB").to_ascii_uppercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::invalid(
                "WIFI_COUNTRY",
                &country,
                "expected a two-letter ISO 3166 code",
            ));
        }

        Ok(EduroamConfig {
            identity,
            password,
            anonymous_identity,
            ca_cert,
            country,
        })
    }

    pub fn sensor(&self) -> Result<SensorConfig, ConfigError> {
        Ok(SensorConfig {
            read_interval_secs: self.positive_secs("READ_INTERVAL", 30)?,
            device_id_file: self.absolute_path("DEVICE_ID_FILE", "/etc/ratsensor/device_id.json")?,
            database_file: self
                .absolute_path("DATABASE_FILE", "/var/lib/ratsensor/sensor_data.db")?,
            log_file: self.absolute_path("LOG_FILE", "/var/log/ratsensor.log")?,
            simulation_mode: self.flag("SIMULATION_MODE", false)?,
            dht_pin: self.parse("DHT_PIN", 4)?,
        })
    }

    /// Every section needed to build the plan
    pub fn provisioning(&self) -> Result<ProvisionConfig, ConfigError> {
        Ok(ProvisionConfig {
            mqtt: self.mqtt()?,
            eduroam: self.eduroam()?,
            sensor: self.sensor()?,
            retry: self.retry()?,
            probe: self.probe()?,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand a leading `~` in a path
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).as_ref())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "t" | "yes" | "y" => Some(true),
        "false" | "0" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Split a broker setting into host and port.
///
/// Accepts a bare host or `tcp://host[:port]`. A port in the URL wins over
/// `MQTT_PORT`. An unparsable port falls back to 1883 with a warning.
fn parse_broker(url: &str, port: Option<&str>) -> Result<(String, u16), ConfigError> {
    let (host, port_raw, port_source) = match url.strip_prefix("tcp://") {
        Some(rest) => match rest.trim_end_matches('/').split_once(':') {
            Some((host, port)) => (host, Some(port), "MQTT_BROKER URL"),
            None => (rest.trim_end_matches('/'), port, "MQTT_PORT"),
        },
        None => (url, port, "MQTT_PORT"),
    };

    if host.trim().is_empty() {
        return Err(ConfigError::Missing("MQTT_BROKER"));
    }

    let port = match port_raw {
        None => DEFAULT_MQTT_PORT,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid port in {port_source}: '{raw}'. Using default {DEFAULT_MQTT_PORT}");
            DEFAULT_MQTT_PORT
        }),
    };

    Ok((host.trim().to_string(), port))
}

fn validate_target(target: &str) -> Result<(), &'static str> {
    match target.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => port
            .parse::<u16>()
            .map(|_| ())
            .map_err(|_| "port must be a number between 0 and 65535"),
        _ => Err("expected host:port"),
    }
}

/// wpa_supplicant quoted strings cannot carry quotes or newlines
fn check_quotable(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.contains(['"', '\n', '\r']) {
        return Err(ConfigError::invalid(
            key,
            "<hidden>",
            "must not contain quotes or line breaks",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn eduroam_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("EDUROAM_IDENTITY", "rat@uni.example.ac.uk"),
            ("EDUROAM_PASSWORD", "hunter2"),
        ]
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_pairs(eduroam_pairs());
        let config = settings.provisioning().unwrap();

        assert_eq!(config.mqtt.broker, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.sensor_topic_for("abc"), "sensor/abc");
        assert!(!config.mqtt.listen_for_admin);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(15));
        assert_eq!(config.retry.max_delay, Duration::from_secs(300));
        assert!((config.retry.factor - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.probe.target, "1.1.1.1:53");
        assert_eq!(config.probe.max_attempts, 8);
        assert_eq!(config.sensor.read_interval_secs, 30);
        assert_eq!(config.sensor.dht_pin, 4);
        assert_eq!(
            config.sensor.device_id_file,
            PathBuf::from("/etc/ratsensor/device_id.json")
        );
        assert_eq!(config.eduroam.anonymous_identity, "anonymous@uni.example.ac.uk");
        assert_eq!(config.eduroam.country, "GB");
        assert_eq!(settings.state_file(), PathBuf::from(DEFAULT_STATE_FILE));
        assert_eq!(settings.failure_policy().unwrap(), FailurePolicy::Abort);
        assert_eq!(settings.step_max_attempts().unwrap(), 3);
    }

    #[test]
    fn test_broker_url_forms() {
        assert_eq!(
            parse_broker("tcp://broker.lan:8883", Some("1883")).unwrap(),
            ("broker.lan".to_string(), 8883)
        );
        assert_eq!(
            parse_broker("tcp://broker.lan", Some("1884")).unwrap(),
            ("broker.lan".to_string(), 1884)
        );
        assert_eq!(
            parse_broker("10.0.0.5", None).unwrap(),
            ("10.0.0.5".to_string(), 1883)
        );
        assert_eq!(
            parse_broker("tcp://", None),
            Err(ConfigError::Missing("MQTT_BROKER"))
        );
    }

    #[test]
    fn test_invalid_port_falls_back() {
        assert_eq!(
            parse_broker("tcp://broker.lan:abc", None).unwrap(),
            ("broker.lan".to_string(), 1883)
        );
        assert_eq!(
            parse_broker("broker.lan", Some("not-a-port")).unwrap(),
            ("broker.lan".to_string(), 1883)
        );
    }

    #[test]
    fn test_bool_parsing() {
        for raw in ["true", "1", "t", "TRUE", "yes"] {
            let settings = Settings::from_pairs([("LISTEN_FOR_ADMIN_COMMANDS", raw)]);
            assert!(settings.mqtt().unwrap().listen_for_admin, "{raw}");
        }
        for raw in ["false", "0", "f", "no"] {
            let settings = Settings::from_pairs([("LISTEN_FOR_ADMIN_COMMANDS", raw)]);
            assert!(!settings.mqtt().unwrap().listen_for_admin, "{raw}");
        }
        let settings = Settings::from_pairs([("SIMULATION_MODE", "maybe")]);
        assert!(matches!(
            settings.sensor(),
            Err(ConfigError::Invalid { key: "SIMULATION_MODE", .. })
        ));
    }

    #[test]
    fn test_missing_eduroam_credentials_rejected() {
        let settings = Settings::default();
        assert_eq!(
            settings.eduroam(),
            Err(ConfigError::Missing("EDUROAM_IDENTITY"))
        );

        let settings = Settings::from_pairs([("EDUROAM_IDENTITY", "rat@uni.ac.uk")]);
        assert_eq!(
            settings.eduroam(),
            Err(ConfigError::Missing("EDUROAM_PASSWORD"))
        );

        // Sections that do not need credentials still load
        assert!(settings.probe().is_ok());
        assert!(settings.retry().is_ok());
    }

    #[test]
    fn test_eduroam_validation() {
        let settings = Settings::from_pairs([
            ("EDUROAM_IDENTITY", "no-realm"),
            ("EDUROAM_PASSWORD", "x"),
        ]);
        assert!(matches!(
            settings.eduroam(),
            Err(ConfigError::Invalid { key: "EDUROAM_IDENTITY", .. })
        ));

        let settings = Settings::from_pairs([
            ("EDUROAM_IDENTITY", "rat@uni.ac.uk"),
            ("EDUROAM_PASSWORD", "pa\"ss"),
        ]);
        let err = settings.eduroam().unwrap_err();
        assert!(!err.to_string().contains("pa\"ss"));

        let mut pairs = eduroam_pairs();
        pairs.push(("WIFI_COUNTRY", "de"));
        pairs.push(("EDUROAM_ANONYMOUS_IDENTITY", "guest@uni.example.ac.uk"));
        let eduroam = Settings::from_pairs(pairs).eduroam().unwrap();
        assert_eq!(eduroam.country, "DE");
        assert_eq!(eduroam.anonymous_identity, "guest@uni.example.ac.uk");
        assert!(!format!("{eduroam:?}").contains("hunter2"));
    }

    #[test]
    fn test_mqtt_credentials_come_in_pairs() {
        let settings = Settings::from_pairs([("MQTT_USER", "sensor")]);
        assert_eq!(settings.mqtt(), Err(ConfigError::Missing("MQTT_PASS")));

        let settings = Settings::from_pairs([("MQTT_USER", "sensor"), ("MQTT_PASS", "secret")]);
        let mqtt = settings.mqtt().unwrap();
        assert_eq!(mqtt.username.as_deref(), Some("sensor"));
    }

    #[test]
    fn test_retry_validation() {
        let settings = Settings::from_pairs([("RETRY_BACKOFF_FACTOR", "0.5")]);
        assert!(settings.retry().is_err());

        let settings = Settings::from_pairs([
            ("RETRY_INITIAL_DELAY", "60"),
            ("RETRY_MAX_DELAY", "30"),
        ]);
        assert!(settings.retry().is_err());

        let settings = Settings::from_pairs([("RETRY_INITIAL_DELAY", "soon")]);
        assert!(matches!(
            settings.retry(),
            Err(ConfigError::Invalid { key: "RETRY_INITIAL_DELAY", .. })
        ));
    }

    #[test]
    fn test_executor_settings() {
        let settings =
            Settings::from_pairs([("FAILURE_POLICY", "Continue"), ("STEP_MAX_ATTEMPTS", "5")]);
        assert_eq!(settings.failure_policy().unwrap(), FailurePolicy::Continue);
        assert_eq!(settings.step_max_attempts().unwrap(), 5);

        let settings = Settings::from_pairs([("FAILURE_POLICY", "ignore")]);
        assert!(settings.failure_policy().is_err());
        let settings = Settings::from_pairs([("STEP_MAX_ATTEMPTS", "0")]);
        assert!(settings.step_max_attempts().is_err());
    }

    #[test]
    fn test_probe_target_validation() {
        let settings = Settings::from_pairs([("PROBE_TARGET", "broker.lan")]);
        assert!(settings.probe().is_err());
        let settings = Settings::from_pairs([("PROBE_TARGET", "broker.lan:99999")]);
        assert!(settings.probe().is_err());
        let settings = Settings::from_pairs([("PROBE_TARGET", "broker.lan:1883")]);
        assert_eq!(settings.probe().unwrap().target, "broker.lan:1883");
    }

    #[test]
    fn test_relative_paths_rejected() {
        let settings = Settings::from_pairs([("DEVICE_ID_FILE", "device_id.json")]);
        assert!(matches!(
            settings.sensor(),
            Err(ConfigError::Invalid { key: "DEVICE_ID_FILE", .. })
        ));
    }

    #[test]
    fn test_load_env_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("provision.env");
        fs::write(
            &path,
            "# eduroam\n\
             EDUROAM_IDENTITY=rat@uni.example.ac.uk\n\
             EDUROAM_PASSWORD=\"s3cret pass\"\n\
             MQTT_BROKER=tcp://broker.lan:1884\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.source(), Some(path.as_path()));
        let eduroam = settings.eduroam().unwrap();
        assert_eq!(eduroam.password, "s3cret pass");
        assert_eq!(settings.mqtt().unwrap().port, 1884);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(Settings::load(Some(&tmp.path().join("nope.env"))).is_err());
    }
}
