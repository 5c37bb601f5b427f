//! Real collaborators for a Debian/Raspberry Pi OS host

mod apt;
mod fs;
mod net;
mod systemd;

pub use apt::AptPackageManager;
pub use fs::SystemFilesystem;
pub use net::TcpProbe;
pub use systemd::Systemd;

use declarative::ApplyContext;

/// The host's package manager, filesystem, init system and network
#[derive(Default)]
pub struct HostSystem {
    pub packages: AptPackageManager,
    pub fs: SystemFilesystem,
    pub services: Systemd,
    pub network: TcpProbe,
}

impl HostSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> ApplyContext<'_> {
        ApplyContext::new(&self.packages, &self.fs, &self.services, &self.network)
    }
}
