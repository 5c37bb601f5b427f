//! State store - durable record of applied steps
//!
//! One [`StepResult`] per step id. A missing or corrupt store reads as empty
//! so provisioning can always be re-run; it never blocks a run.

use crate::atomic::write_atomic;
use crate::types::StepResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Step records keyed by step id
pub type StateMap = BTreeMap<String, StepResult>;

/// Durable mapping of step id to its last result
pub trait StateStore {
    /// Load every record. Unreadable state loads as empty.
    fn load(&self) -> StateMap;

    /// Persist one record, replacing any previous record for `step_id`.
    fn save(&mut self, step_id: &str, result: &StepResult) -> Result<()>;

    /// Remove one record. Returns whether it existed.
    fn clear(&mut self, step_id: &str) -> Result<bool>;

    /// Remove every record.
    fn clear_all(&mut self) -> Result<()>;
}

/// On-disk document layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    steps: StateMap,
}

/// TOML file store with atomic replace-on-write
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> StateDocument {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(
                    "State file {} does not exist, starting empty",
                    self.path.display()
                );
                return StateDocument::default();
            }
            Err(e) => {
                log::warn!(
                    "Cannot read state file {}: {}; treating as empty",
                    self.path.display(),
                    e
                );
                return StateDocument::default();
            }
        };

        match toml::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!(
                    "State file {} is corrupt: {}; treating as empty",
                    self.path.display(),
                    e
                );
                StateDocument::default()
            }
        }
    }

    fn write_document(&self, doc: &StateDocument) -> Result<()> {
        let content = toml::to_string_pretty(doc).context("Failed to serialize state to TOML")?;
        write_atomic(&self.path, content.as_bytes(), Some(0o600))
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;
        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> StateMap {
        self.read_document().steps
    }

    fn save(&mut self, step_id: &str, result: &StepResult) -> Result<()> {
        let mut doc = self.read_document();
        doc.steps.insert(step_id.to_string(), result.clone());
        self.write_document(&doc)
    }

    fn clear(&mut self, step_id: &str) -> Result<bool> {
        let mut doc = self.read_document();
        if doc.steps.remove(step_id).is_none() {
            return Ok(false);
        }
        self.write_document(&doc)?;
        Ok(true)
    }

    fn clear_all(&mut self) -> Result<()> {
        self.write_document(&StateDocument::default())
    }
}

/// In-memory store for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    records: StateMap,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_records(records: StateMap) -> Self {
        Self { records }
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> StateMap {
        self.records.clone()
    }

    fn save(&mut self, step_id: &str, result: &StepResult) -> Result<()> {
        self.records.insert(step_id.to_string(), result.clone());
        Ok(())
    }

    fn clear(&mut self, step_id: &str) -> Result<bool> {
        Ok(self.records.remove(step_id).is_some())
    }

    fn clear_all(&mut self) -> Result<()> {
        self.records.clear();
        Ok(())
    }
}
