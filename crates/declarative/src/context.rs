//! Apply context and collaborator traits
//!
//! The engine never talks to apt, the filesystem, systemd or the network
//! directly. It goes through these traits so the binary can plug in real
//! system backends and tests can plug in mocks.

use crate::error::StepError;
use crate::step::StepDescriptor;
use crate::types::StepResult;
use std::path::Path;
use std::time::Duration;

/// OS package manager
pub trait PackageManager {
    /// Install packages. Already-installed packages must not be an error.
    fn install_packages(&self, names: &[String]) -> Result<(), StepError>;

    /// Return the subset of `names` that is not installed.
    fn missing_packages(&self, names: &[String]) -> Result<Vec<String>, StepError>;
}

/// File materialization
pub trait Filesystem {
    /// Write `content` to `path` with permission bits `mode`.
    ///
    /// Parent directories are created. Permissions must be in place by the
    /// time the file is visible at `path`.
    fn write_file(&self, path: &Path, content: &str, mode: u32) -> Result<(), StepError>;

    /// Read a file, `None` if it does not exist.
    fn read_file(&self, path: &Path) -> Result<Option<String>, StepError>;

    /// Permission bits of a file, `None` if it does not exist.
    fn file_mode(&self, path: &Path) -> Result<Option<u32>, StepError>;
}

/// State reported by the service manager for a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Stopped,
    Failed,
}

/// Service manager (systemd)
pub trait ServiceManager {
    fn enable(&self, unit: &str) -> Result<(), StepError>;
    fn is_enabled(&self, unit: &str) -> Result<bool, StepError>;
    fn start(&self, unit: &str) -> Result<(), StepError>;
    fn restart(&self, unit: &str) -> Result<(), StepError>;
    fn status(&self, unit: &str) -> Result<ServiceStatus, StepError>;
}

/// Network layer
pub trait NetworkLayer {
    /// One bounded connectivity check. Never loops.
    fn reachability_check(&self, address: &str, timeout: Duration) -> bool;
}

/// Collaborators handed to the appliers
#[derive(Clone, Copy)]
pub struct ApplyContext<'a> {
    pub packages: &'a dyn PackageManager,
    pub fs: &'a dyn Filesystem,
    pub services: &'a dyn ServiceManager,
    pub network: &'a dyn NetworkLayer,
}

impl<'a> ApplyContext<'a> {
    pub fn new(
        packages: &'a dyn PackageManager,
        fs: &'a dyn Filesystem,
        services: &'a dyn ServiceManager,
        network: &'a dyn NetworkLayer,
    ) -> Self {
        Self {
            packages,
            fs,
            services,
            network,
        }
    }
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during a run.
pub trait ProgressCallback {
    /// Called before a step is looked at (index is 0-based)
    fn on_step_start(&mut self, index: usize, total: usize, step: &StepDescriptor);

    /// Called when an attempt failed and another one is scheduled
    fn on_retry(
        &mut self,
        step: &StepDescriptor,
        attempt: u32,
        max_attempts: u32,
        error: &StepError,
        delay: Duration,
    );

    /// Called with the final result of a step
    fn on_step_complete(&mut self, step: &StepDescriptor, result: &StepResult);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_step_start(&mut self, _index: usize, _total: usize, _step: &StepDescriptor) {}
    fn on_retry(
        &mut self,
        _step: &StepDescriptor,
        _attempt: u32,
        _max_attempts: u32,
        _error: &StepError,
        _delay: Duration,
    ) {
    }
    fn on_step_complete(&mut self, _step: &StepDescriptor, _result: &StepResult) {}
}
