//! In-memory collaborators for unit tests.

use crate::context::{
    ApplyContext, Filesystem, NetworkLayer, PackageManager, ServiceManager, ServiceStatus,
};
use crate::error::StepError;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scripted failures shared by the mocks
#[derive(Default)]
pub struct Failures {
    queue: RefCell<VecDeque<StepError>>,
    always: RefCell<Option<StepError>>,
}

impl Failures {
    pub fn fail_next(&self, err: StepError) {
        self.queue.borrow_mut().push_back(err);
    }

    pub fn fail_always(&self, err: StepError) {
        *self.always.borrow_mut() = Some(err);
    }

    fn take(&self) -> Result<(), StepError> {
        if let Some(err) = self.always.borrow().clone() {
            return Err(err);
        }
        match self.queue.borrow_mut().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MockPackages {
    pub installed: RefCell<BTreeSet<String>>,
    pub install_calls: Cell<u32>,
    pub failures: Failures,
    /// Report success without installing anything
    pub lie: Cell<bool>,
}

impl PackageManager for MockPackages {
    fn install_packages(&self, names: &[String]) -> Result<(), StepError> {
        self.install_calls.set(self.install_calls.get() + 1);
        self.failures.take()?;
        if !self.lie.get() {
            self.installed.borrow_mut().extend(names.iter().cloned());
        }
        Ok(())
    }

    fn missing_packages(&self, names: &[String]) -> Result<Vec<String>, StepError> {
        let installed = self.installed.borrow();
        Ok(names
            .iter()
            .filter(|n| !installed.contains(*n))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MockFs {
    pub files: RefCell<HashMap<PathBuf, (String, u32)>>,
    pub writes: Cell<u32>,
    pub failures: Failures,
}

impl MockFs {
    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .borrow()
            .get(Path::new(path))
            .map(|(content, _)| content.clone())
    }
}

impl Filesystem for MockFs {
    fn write_file(&self, path: &Path, content: &str, mode: u32) -> Result<(), StepError> {
        self.writes.set(self.writes.get() + 1);
        self.failures.take()?;
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), (content.to_string(), mode));
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>, StepError> {
        Ok(self.files.borrow().get(path).map(|(c, _)| c.clone()))
    }

    fn file_mode(&self, path: &Path) -> Result<Option<u32>, StepError> {
        Ok(self.files.borrow().get(path).map(|(_, m)| *m))
    }
}

#[derive(Default)]
pub struct MockServices {
    pub enabled: RefCell<BTreeSet<String>>,
    pub active: RefCell<BTreeSet<String>>,
    /// Units that crash right after starting
    pub broken: RefCell<BTreeSet<String>>,
    pub calls: RefCell<Vec<String>>,
    pub failures: Failures,
}

impl MockServices {
    fn record(&self, call: &str, unit: &str) -> Result<(), StepError> {
        self.calls.borrow_mut().push(format!("{call}:{unit}"));
        self.failures.take()
    }

    fn activate(&self, unit: &str) {
        if !self.broken.borrow().contains(unit) {
            self.active.borrow_mut().insert(unit.to_string());
        }
    }
}

impl ServiceManager for MockServices {
    fn enable(&self, unit: &str) -> Result<(), StepError> {
        self.record("enable", unit)?;
        self.enabled.borrow_mut().insert(unit.to_string());
        Ok(())
    }

    fn is_enabled(&self, unit: &str) -> Result<bool, StepError> {
        Ok(self.enabled.borrow().contains(unit))
    }

    fn start(&self, unit: &str) -> Result<(), StepError> {
        self.record("start", unit)?;
        self.activate(unit);
        Ok(())
    }

    fn restart(&self, unit: &str) -> Result<(), StepError> {
        self.record("restart", unit)?;
        self.activate(unit);
        Ok(())
    }

    fn status(&self, unit: &str) -> Result<ServiceStatus, StepError> {
        if self.broken.borrow().contains(unit) {
            Ok(ServiceStatus::Failed)
        } else if self.active.borrow().contains(unit) {
            Ok(ServiceStatus::Running)
        } else {
            Ok(ServiceStatus::Stopped)
        }
    }
}

/// Network that becomes reachable after a number of failed checks
pub struct MockNetwork {
    failures_before_success: u32,
    calls: Cell<u32>,
    last_timeout: Cell<Option<Duration>>,
}

impl MockNetwork {
    pub fn reachable() -> Self {
        Self::reachable_after(0)
    }

    pub fn unreachable() -> Self {
        Self::reachable_after(u32::MAX)
    }

    pub fn reachable_after(failures: u32) -> Self {
        Self {
            failures_before_success: failures,
            calls: Cell::new(0),
            last_timeout: Cell::new(None),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    pub fn last_timeout(&self) -> Option<Duration> {
        self.last_timeout.get()
    }
}

impl NetworkLayer for MockNetwork {
    fn reachability_check(&self, _address: &str, timeout: Duration) -> bool {
        let call = self.calls.get();
        self.calls.set(call + 1);
        self.last_timeout.set(Some(timeout));
        call >= self.failures_before_success
    }
}

/// All four mocks together
pub struct MockSystem {
    pub packages: MockPackages,
    pub fs: MockFs,
    pub services: MockServices,
    pub network: MockNetwork,
}

impl Default for MockSystem {
    fn default() -> Self {
        Self {
            packages: MockPackages::default(),
            fs: MockFs::default(),
            services: MockServices::default(),
            network: MockNetwork::reachable(),
        }
    }
}

impl MockSystem {
    pub fn context(&self) -> ApplyContext<'_> {
        ApplyContext::new(&self.packages, &self.fs, &self.services, &self.network)
    }
}
