//! Debian package management through apt-get and dpkg-query

use crate::runner::{CommandRunner, SystemRunner};
use declarative::{PackageManager, StepError};
use std::cell::Cell;

const APT_ENV: &[(&str, &str)] = &[("DEBIAN_FRONTEND", "noninteractive")];

pub struct AptPackageManager<R = SystemRunner> {
    runner: R,
    /// Package lists refreshed during this process
    updated: Cell<bool>,
}

impl AptPackageManager {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner)
    }
}

impl Default for AptPackageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> AptPackageManager<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            updated: Cell::new(false),
        }
    }

    fn apt_get(&self, args: &[&str]) -> Result<(), StepError> {
        let output = self
            .runner
            .run("apt-get", args, APT_ENV)
            .map_err(|e| StepError::from_io(&e, "apt-get"))?;
        if output.success {
            Ok(())
        } else {
            Err(classify_apt_failure(&output.message()))
        }
    }

    /// Refresh package lists once; fresh images ship without them.
    fn ensure_updated(&self) -> Result<(), StepError> {
        if self.updated.get() {
            return Ok(());
        }
        log::info!("Refreshing package lists");
        self.apt_get(&["update", "-q"])?;
        self.updated.set(true);
        Ok(())
    }

    fn is_installed(&self, name: &str) -> Result<bool, StepError> {
        let output = self
            .runner
            .run("dpkg-query", &["-W", "-f=${Status}", name], &[])
            .map_err(|e| StepError::from_io(&e, "dpkg-query"))?;
        // Unknown packages exit non-zero; that just means "not installed"
        Ok(output.success && output.stdout.trim() == "install ok installed")
    }
}

impl<R: CommandRunner> PackageManager for AptPackageManager<R> {
    fn install_packages(&self, names: &[String]) -> Result<(), StepError> {
        if names.is_empty() {
            return Ok(());
        }
        self.ensure_updated()?;

        let mut args = vec!["install", "-y", "-q", "--no-install-recommends"];
        args.extend(names.iter().map(String::as_str));
        self.apt_get(&args)
    }

    fn missing_packages(&self, names: &[String]) -> Result<Vec<String>, StepError> {
        let mut missing = Vec::new();
        for name in names {
            if !self.is_installed(name)? {
                missing.push(name.clone());
            }
        }
        Ok(missing)
    }
}

/// Map apt-get stderr to an error category.
///
/// Lock contention (unattended-upgrades on first boot) and mirror problems
/// clear up on their own; unknown packages and missing privileges do not.
pub fn classify_apt_failure(stderr: &str) -> StepError {
    let lower = stderr.to_lowercase();

    if lower.contains("could not get lock")
        || lower.contains("unable to acquire the dpkg frontend lock")
        || lower.contains("unable to lock")
        || lower.contains("is another process using it")
    {
        return StepError::transient(format!("package manager busy: {}", first_line(stderr)));
    }

    if lower.contains("failed to fetch")
        || lower.contains("temporary failure resolving")
        || lower.contains("could not resolve")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to fetch some archives")
        || lower.contains("hash sum mismatch")
    {
        return StepError::transient(format!("download failed: {}", first_line(stderr)));
    }

    if lower.contains("unable to locate package")
        || lower.contains("has no installation candidate")
        || lower.contains("permission denied")
        || lower.contains("are you root")
        || lower.contains("dpkg was interrupted")
    {
        return StepError::configuration(first_line(stderr));
    }

    StepError::transient(format!("apt-get failed: {}", first_line(stderr)))
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScriptedRunner;
    use declarative::ErrorCategory;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_missing_packages_queries_dpkg() {
        let runner = ScriptedRunner::default();
        runner
            .ok("install ok installed")
            .fail(1, "dpkg-query: no packages found matching i2c-tools");
        let apt = AptPackageManager::with_runner(runner);

        let missing = apt.missing_packages(&names(&["python3", "i2c-tools"])).unwrap();
        assert_eq!(missing, vec!["i2c-tools"]);
        assert_eq!(
            apt.runner.calls.borrow()[0],
            "dpkg-query -W -f=${Status} python3"
        );
    }

    #[test]
    fn test_deinstalled_package_counts_as_missing() {
        let runner = ScriptedRunner::default();
        runner.ok("deinstall ok config-files");
        let apt = AptPackageManager::with_runner(runner);
        assert_eq!(apt.missing_packages(&names(&["dhcpcd5"])).unwrap(), vec!["dhcpcd5"]);
    }

    #[test]
    fn test_install_updates_lists_once() {
        let apt = AptPackageManager::with_runner(ScriptedRunner::default());
        apt.install_packages(&names(&["sqlite3"])).unwrap();
        apt.install_packages(&names(&["python3"])).unwrap();

        let calls = apt.runner.calls.borrow();
        assert_eq!(
            *calls,
            vec![
                "apt-get update -q",
                "apt-get install -y -q --no-install-recommends sqlite3",
                "apt-get install -y -q --no-install-recommends python3",
            ]
        );
    }

    #[test]
    fn test_install_failure_is_classified() {
        let runner = ScriptedRunner::default();
        runner
            .ok("")
            .fail(100, "E: Unable to locate package python4");
        let apt = AptPackageManager::with_runner(runner);

        let err = apt.install_packages(&names(&["python4"])).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_classify_apt_failure() {
        let lock = classify_apt_failure(
            "E: Could not get lock /var/lib/dpkg/lock-frontend. \
             It is held by process 812 (unattended-upgr)",
        );
        assert!(lock.is_retryable());
        assert!(lock.to_string().contains("busy"));

        let fetch = classify_apt_failure("E: Failed to fetch http://raspbian.raspberrypi.org/...");
        assert!(fetch.is_retryable());

        let unknown = classify_apt_failure("\nE: Package 'foo' has no installation candidate\n");
        assert_eq!(unknown.category(), ErrorCategory::Configuration);
        assert_eq!(
            unknown.to_string(),
            "configuration error: E: Package 'foo' has no installation candidate"
        );

        assert!(classify_apt_failure("").is_retryable());
    }
}
