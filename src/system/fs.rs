//! Local filesystem with backup-then-replace writes

use declarative::atomic::write_atomic;
use declarative::{Filesystem, StepError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFilesystem;

impl SystemFilesystem {
    pub fn new() -> Self {
        Self
    }
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Copy the current file aside if it differs from what is about to be written
fn backup_if_changed(path: &Path, content: &str) -> io::Result<()> {
    match fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => Ok(()),
        Ok(_) => {
            let backup = backup_path(path);
            fs::copy(path, &backup)?;
            log::info!("Backed up {} to {}", path.display(), backup.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

impl Filesystem for SystemFilesystem {
    fn write_file(&self, path: &Path, content: &str, mode: u32) -> Result<(), StepError> {
        let what = path.display().to_string();
        backup_if_changed(path, content).map_err(|e| StepError::from_io(&e, &what))?;
        write_atomic(path, content.as_bytes(), Some(mode))
            .map_err(|e| StepError::from_io(&e, &what))?;
        log::debug!("Wrote {} ({mode:04o})", path.display());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>, StepError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StepError::from_io(&e, &path.display().to_string())),
        }
    }

    #[cfg(unix)]
    fn file_mode(&self, path: &Path) -> Result<Option<u32>, StepError> {
        use std::os::unix::fs::PermissionsExt;
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(meta.permissions().mode() & 0o7777)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StepError::from_io(&e, &path.display().to_string())),
        }
    }

    #[cfg(not(unix))]
    fn file_mode(&self, path: &Path) -> Result<Option<u32>, StepError> {
        Err(StepError::configuration(format!(
            "{}: file modes are not supported on this platform",
            path.display()
        )))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_mode() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("etc").join("ratsensor").join("mqtt_config.env");
        let fs_ = SystemFilesystem::new();

        fs_.write_file(&path, "MQTT_PORT=\"1883\"\n", 0o600).unwrap();
        assert_eq!(
            fs_.read_file(&path).unwrap().as_deref(),
            Some("MQTT_PORT=\"1883\"\n")
        );
        assert_eq!(fs_.file_mode(&path).unwrap(), Some(0o600));
        // Nothing to back up on first write
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_missing_file_reads_none() {
        let tmp = TempDir::new().unwrap();
        let fs_ = SystemFilesystem::new();
        assert_eq!(fs_.read_file(&tmp.path().join("nope")).unwrap(), None);
        assert_eq!(fs_.file_mode(&tmp.path().join("nope")).unwrap(), None);
    }

    #[test]
    fn test_changed_content_is_backed_up() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wpa_supplicant.conf");
        fs::write(&path, "hand edited\n").unwrap();
        let fs_ = SystemFilesystem::new();

        fs_.write_file(&path, "managed\n", 0o600).unwrap();
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "hand edited\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "managed\n");

        // Identical rewrite keeps the original backup
        fs_.write_file(&path, "managed\n", 0o600).unwrap();
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "hand edited\n");
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/etc/wpa_supplicant/wpa_supplicant.conf")),
            PathBuf::from("/etc/wpa_supplicant/wpa_supplicant.conf.bak")
        );
    }
}
