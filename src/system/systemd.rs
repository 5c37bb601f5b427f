//! systemd units through systemctl

use crate::runner::{CommandOutput, CommandRunner, SystemRunner};
use declarative::{ServiceManager, ServiceStatus, StepError};

pub struct Systemd<R = SystemRunner> {
    runner: R,
}

impl Systemd {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner)
    }
}

impl Default for Systemd {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> Systemd<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    fn systemctl(&self, args: &[&str]) -> Result<CommandOutput, StepError> {
        self.runner
            .run("systemctl", args, &[])
            .map_err(|e| StepError::from_io(&e, "systemctl"))
    }

    fn checked(&self, args: &[&str]) -> Result<(), StepError> {
        let output = self.systemctl(args)?;
        if output.success {
            Ok(())
        } else {
            Err(classify_systemctl_failure(&args.join(" "), &output.message()))
        }
    }

    /// Unit files may have just been rewritten
    fn reload(&self) -> Result<(), StepError> {
        self.checked(&["daemon-reload"])
    }
}

impl<R: CommandRunner> ServiceManager for Systemd<R> {
    fn enable(&self, unit: &str) -> Result<(), StepError> {
        self.reload()?;
        self.checked(&["enable", unit])
    }

    fn is_enabled(&self, unit: &str) -> Result<bool, StepError> {
        // Exits non-zero for disabled units; the state is on stdout
        let output = self.systemctl(&["is-enabled", unit])?;
        Ok(matches!(
            output.stdout.trim(),
            "enabled" | "enabled-runtime" | "alias"
        ))
    }

    fn start(&self, unit: &str) -> Result<(), StepError> {
        self.reload()?;
        self.checked(&["start", unit])
    }

    fn restart(&self, unit: &str) -> Result<(), StepError> {
        self.reload()?;
        self.checked(&["restart", unit])
    }

    fn status(&self, unit: &str) -> Result<ServiceStatus, StepError> {
        let output = self.systemctl(&["is-active", unit])?;
        Ok(match output.stdout.trim() {
            "active" | "reloading" => ServiceStatus::Running,
            "failed" => ServiceStatus::Failed,
            _ => ServiceStatus::Stopped,
        })
    }
}

/// Map systemctl stderr to an error category
pub fn classify_systemctl_failure(command: &str, stderr: &str) -> StepError {
    let lower = stderr.to_lowercase();
    let message = format!("systemctl {command}: {}", stderr.trim());

    if lower.contains("not found")
        || lower.contains("does not exist")
        || lower.contains("access denied")
        || lower.contains("interactive authentication required")
        || lower.contains("bad unit file setting")
    {
        StepError::configuration(message)
    } else if lower.contains("job for") && lower.contains("failed") {
        // The unit ran and crashed; worth another go after the backoff
        StepError::verification(message)
    } else {
        StepError::transient(message)
    }
}
