//! Device identity
//!
//! The sensor node is identified by a UUID stored as `{"device_id": "..."}`.
//! An existing id is reused so re-provisioning never renames a node; the file
//! itself is written by the plan, not here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct DeviceIdFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device_id: Option<String>,
}

/// The node's device id and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub id: String,
    /// Freshly generated rather than read from disk
    pub generated: bool,
}

impl DeviceIdentity {
    /// Read the id stored at `path`, or generate a new one.
    ///
    /// A missing file, unparsable JSON, or a missing/empty `device_id` key all
    /// produce a new UUID v4. Errors other than "not found" are fatal.
    pub fn resolve(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No device id at {}, generating one", path.display());
                return Ok(Self::generate());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Could not read device id file {}", path.display()));
            }
        };

        let file: DeviceIdFile = match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                log::warn!(
                    "Device id file {} is not valid JSON ({}), generating a new id",
                    path.display(),
                    e
                );
                return Ok(Self::generate());
            }
        };

        match file.device_id.map(|id| id.trim().to_string()) {
            Some(id) if !id.is_empty() => {
                log::debug!("Using existing device id {id}");
                Ok(Self {
                    id,
                    generated: false,
                })
            }
            _ => {
                log::warn!(
                    "device_id key missing in {}, generating a new id",
                    path.display()
                );
                Ok(Self::generate())
            }
        }
    }

    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            generated: true,
        }
    }

    /// File content holding this id
    pub fn render(&self) -> Result<String> {
        let file = DeviceIdFile {
            device_id: Some(self.id.clone()),
        };
        let mut json = serde_json::to_string_pretty(&file).context("Failed to encode device id")?;
        json.push('\n');
        Ok(json)
    }
}
