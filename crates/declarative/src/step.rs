//! Step descriptors - immutable descriptions of one provisioning action
//!
//! A [`StepDescriptor`] pairs a stable id with kind-specific parameters and
//! a fingerprint computed from those parameters. The fingerprint is what the
//! state store compares against to detect drift between runs.

use crate::error::StepError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Kind of provisioning action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    PackageInstall,
    FileWrite,
    ServiceEnable,
    ServiceStart,
    NetworkWait,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageInstall => "package_install",
            Self::FileWrite => "file_write",
            Self::ServiceEnable => "service_enable",
            Self::ServiceStart => "service_start",
            Self::NetworkWait => "network_wait",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific step parameters
///
/// `trigger` on the service variants carries the fingerprints of the steps
/// whose changes must force this step to run again (a daemon restart after
/// its configuration file changed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepParams {
    PackageInstall {
        packages: Vec<String>,
    },
    FileWrite {
        path: PathBuf,
        content: String,
        mode: u32,
    },
    ServiceEnable {
        unit: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger: Option<String>,
    },
    ServiceStart {
        unit: String,
        restart: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger: Option<String>,
    },
    NetworkWait {
        target: String,
        timeout_ms: u64,
        max_attempts: u32,
    },
}

impl StepParams {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::PackageInstall { .. } => StepKind::PackageInstall,
            Self::FileWrite { .. } => StepKind::FileWrite,
            Self::ServiceEnable { .. } => StepKind::ServiceEnable,
            Self::ServiceStart { .. } => StepKind::ServiceStart,
            Self::NetworkWait { .. } => StepKind::NetworkWait,
        }
    }

    /// Reject parameters that can never be applied.
    fn validate(&self) -> Result<(), String> {
        match self {
            Self::PackageInstall { packages } => {
                if packages.is_empty() {
                    return Err("package list is empty".to_string());
                }
                if let Some(bad) = packages
                    .iter()
                    .find(|p| p.is_empty() || p.starts_with('-') || p.contains(char::is_whitespace))
                {
                    return Err(format!("invalid package name '{bad}'"));
                }
            }
            Self::FileWrite { path, mode, .. } => {
                if !path.is_absolute() {
                    return Err(format!(
                        "file path must be absolute: {}",
                        path.display()
                    ));
                }
                if path.to_str().is_none() {
                    return Err(format!(
                        "file path is not valid UTF-8: {}",
                        path.display()
                    ));
                }
                if *mode > 0o7777 {
                    return Err(format!("invalid file mode {mode:o}"));
                }
            }
            Self::ServiceEnable { unit, .. } | Self::ServiceStart { unit, .. } => {
                if unit.trim().is_empty() {
                    return Err("unit name is empty".to_string());
                }
            }
            Self::NetworkWait { target, .. } => {
                if target.trim().is_empty() {
                    return Err("reachability target is empty".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Characters shown for a shortened fingerprint
const SHORT_FINGERPRINT_LEN: usize = 12;

/// Immutable description of one idempotent provisioning action
///
/// `after` lists the ids of earlier steps this one builds on. It does not
/// feed the fingerprint; it only decides whether the step may run once an
/// earlier step has failed under [`crate::FailurePolicy::Continue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    id: String,
    params: StepParams,
    fingerprint: String,
    after: Vec<String>,
}

impl StepDescriptor {
    /// Build a descriptor, validating parameters and computing the fingerprint.
    pub fn new(id: impl Into<String>, params: StepParams) -> Result<Self, StepError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(StepError::configuration("step id is empty"));
        }

        let params = match params {
            StepParams::PackageInstall { mut packages } => {
                // Install order does not matter; keep the fingerprint stable.
                packages.sort();
                packages.dedup();
                StepParams::PackageInstall { packages }
            }
            other => other,
        };
        params
            .validate()
            .map_err(|e| StepError::configuration(format!("step '{id}': {e}")))?;

        let fingerprint = fingerprint(&params)?;
        Ok(Self {
            id,
            params,
            fingerprint,
            after: Vec::new(),
        })
    }

    /// Declare the steps this one depends on.
    pub fn after<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn package_install<I, S>(id: impl Into<String>, packages: I) -> Result<Self, StepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            id,
            StepParams::PackageInstall {
                packages: packages.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn file_write(
        id: impl Into<String>,
        path: impl AsRef<Path>,
        content: impl Into<String>,
        mode: u32,
    ) -> Result<Self, StepError> {
        Self::new(
            id,
            StepParams::FileWrite {
                path: path.as_ref().to_path_buf(),
                content: content.into(),
                mode,
            },
        )
    }

    pub fn service_enable(
        id: impl Into<String>,
        unit: impl Into<String>,
        trigger: Option<String>,
    ) -> Result<Self, StepError> {
        Self::new(
            id,
            StepParams::ServiceEnable {
                unit: unit.into(),
                trigger,
            },
        )
    }

    pub fn service_start(
        id: impl Into<String>,
        unit: impl Into<String>,
        restart: bool,
        trigger: Option<String>,
    ) -> Result<Self, StepError> {
        Self::new(
            id,
            StepParams::ServiceStart {
                unit: unit.into(),
                restart,
                trigger,
            },
        )
    }

    pub fn network_wait(
        id: impl Into<String>,
        target: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Self, StepError> {
        Self::new(
            id,
            StepParams::NetworkWait {
                target: target.into(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                max_attempts,
            },
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> StepKind {
        self.params.kind()
    }

    pub fn params(&self) -> &StepParams {
        &self.params
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn dependencies(&self) -> &[String] {
        &self.after
    }

    /// Leading characters of the fingerprint for display.
    pub fn short_fingerprint(&self) -> &str {
        short_fingerprint(&self.fingerprint)
    }

    /// Human-readable description of what this step does
    pub fn description(&self) -> String {
        match &self.params {
            StepParams::PackageInstall { packages } => {
                format!("Install packages: {}", packages.join(", "))
            }
            StepParams::FileWrite { path, mode, .. } => {
                format!("Write {} ({mode:04o})", path.display())
            }
            StepParams::ServiceEnable { unit, .. } => format!("Enable {unit}"),
            StepParams::ServiceStart { unit, restart, .. } => {
                if *restart {
                    format!("Restart {unit}")
                } else {
                    format!("Start {unit}")
                }
            }
            StepParams::NetworkWait { target, .. } => format!("Wait for {target}"),
        }
    }
}

/// Hash of a step's kind and parameters.
///
/// The canonical form is the JSON encoding of [`StepParams`], which includes
/// the kind tag, so two kinds with equal payloads never collide.
pub fn fingerprint(params: &StepParams) -> Result<String, StepError> {
    let canonical = serde_json::to_vec(params)
        .map_err(|e| StepError::configuration(format!("cannot encode step parameters: {e}")))?;
    Ok(blake3::hash(&canonical).to_hex().to_string())
}

/// Leading characters of any fingerprint, for display.
///
/// Cuts on a character boundary; fingerprints read back from a state file
/// may hold arbitrary text.
pub fn short_fingerprint(fingerprint: &str) -> &str {
    match fingerprint.char_indices().nth(SHORT_FINGERPRINT_LEN) {
        Some((end, _)) => &fingerprint[..end],
        None => fingerprint,
    }
}

/// Combine several fingerprints into one trigger value.
pub fn combine_fingerprints<'a>(fingerprints: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = blake3::Hasher::new();
    for fp in fingerprints {
        hasher.update(fp.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = StepDescriptor::file_write("f", "/etc/motd", "hello\n", 0o644).unwrap();
        let b = StepDescriptor::file_write("f", "/etc/motd", "hello\n", 0o644).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_parameters() {
        let a = StepDescriptor::file_write("f", "/etc/motd", "hello\n", 0o644).unwrap();
        let content = StepDescriptor::file_write("f", "/etc/motd", "bye\n", 0o644).unwrap();
        let mode = StepDescriptor::file_write("f", "/etc/motd", "hello\n", 0o600).unwrap();
        assert_ne!(a.fingerprint(), content.fingerprint());
        assert_ne!(a.fingerprint(), mode.fingerprint());
    }

    #[test]
    fn test_fingerprint_ignores_id() {
        let a = StepDescriptor::service_enable("one", "ssh.service", None).unwrap();
        let b = StepDescriptor::service_enable("two", "ssh.service", None).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_package_order_is_irrelevant() {
        let a = StepDescriptor::package_install("p", ["sqlite3", "python3", "python3"]).unwrap();
        let b = StepDescriptor::package_install("p", ["python3", "sqlite3"]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(
            a.params(),
            &StepParams::PackageInstall {
                packages: vec!["python3".to_string(), "sqlite3".to_string()]
            }
        );
    }

    #[test]
    fn test_kinds_with_same_payload_differ() {
        let enable = StepDescriptor::service_enable("s", "dhcpcd", None).unwrap();
        let start = StepDescriptor::service_start("s", "dhcpcd", false, None).unwrap();
        assert_ne!(enable.fingerprint(), start.fingerprint());
        assert_eq!(enable.kind(), StepKind::ServiceEnable);
        assert_eq!(start.kind(), StepKind::ServiceStart);
    }

    #[test]
    fn test_trigger_changes_fingerprint() {
        let plain = StepDescriptor::service_start("s", "dhcpcd", true, None).unwrap();
        let triggered =
            StepDescriptor::service_start("s", "dhcpcd", true, Some("abc".into())).unwrap();
        assert_ne!(plain.fingerprint(), triggered.fingerprint());
    }

    #[test]
    fn test_validation_rejects_bad_parameters() {
        assert!(StepDescriptor::package_install("p", Vec::<String>::new()).is_err());
        assert!(StepDescriptor::package_install("p", ["--purge"]).is_err());
        assert!(StepDescriptor::file_write("f", "relative/path", "", 0o644).is_err());
        assert!(StepDescriptor::file_write("f", "/etc/x", "", 0o17777).is_err());
        assert!(StepDescriptor::service_enable("s", "  ", None).is_err());
        assert!(StepDescriptor::network_wait("n", "", Duration::from_secs(1), 3).is_err());
        assert!(StepDescriptor::service_enable("", "ssh", None).is_err());

        let err = StepDescriptor::file_write("cfg", "etc/x", "", 0o644).unwrap_err();
        assert!(matches!(err, StepError::Configuration(_)));
        assert!(err.to_string().contains("cfg"));
    }

    #[test]
    fn test_combine_fingerprints() {
        let ab = combine_fingerprints(["a", "b"]);
        assert_eq!(ab, combine_fingerprints(["a", "b"]));
        assert_ne!(ab, combine_fingerprints(["b", "a"]));
        assert_ne!(ab, combine_fingerprints(["ab"]));
    }

    #[test]
    fn test_short_fingerprint() {
        assert_eq!(short_fingerprint("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_fingerprint("abc"), "abc");
        assert_eq!(short_fingerprint(""), "");
        // Multi-byte characters straddling byte 12 must not split
        assert_eq!(short_fingerprint("aéééééééééééé"), "aééééééééééé");
    }

    #[test]
    fn test_dependencies_do_not_affect_fingerprint() {
        let plain = StepDescriptor::service_enable("s", "ratsensor.service", None).unwrap();
        let ordered = plain.clone().after(["file.sensor-unit"]);
        assert_eq!(plain.fingerprint(), ordered.fingerprint());
        assert!(plain.dependencies().is_empty());
        assert_eq!(ordered.dependencies(), ["file.sensor-unit"]);
    }

    #[test]
    fn test_description() {
        let step = StepDescriptor::file_write("f", "/etc/motd", "", 0o600).unwrap();
        assert_eq!(step.description(), "Write /etc/motd (0600)");
        let step = StepDescriptor::service_start("s", "dhcpcd", true, None).unwrap();
        assert_eq!(step.description(), "Restart dhcpcd");
    }
}
