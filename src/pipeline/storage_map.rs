//! Storage → configuration backlink mapping.
//!
//! Every storage's project location records which pipeline
//! configuration(s) point at it, keyed by the configuration's three
//! platform paths. Path resolution walks this mapping to find the
//! configuration for an arbitrary project path, so stale entries from
//! copy-based project creation or forced re-installs must never survive:
//! provisioning clears the mapping before adding the current
//! configuration.

use crate::constants::{STORAGE_MAPPING_FILE, STORAGE_MARKER_DIR};
use crate::error::{Result, SlateError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One backlink: the three platform paths of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub mac_path: String,
    pub windows_path: String,
    pub linux_path: String,
}

/// The backlink mapping stored at a storage's project location.
#[derive(Debug, Clone)]
pub struct StorageMapping {
    storage_path: PathBuf,
}

impl StorageMapping {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        StorageMapping {
            storage_path: storage_path.into(),
        }
    }

    /// Path of the mapping file itself.
    pub fn file_path(&self) -> PathBuf {
        self.storage_path
            .join(STORAGE_MARKER_DIR)
            .join("config")
            .join(STORAGE_MAPPING_FILE)
    }

    /// Read all recorded configurations. A missing file is an empty list.
    pub fn configurations(&self) -> Result<Vec<MappingEntry>> {
        let path = self.file_path();
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| SlateError::persistence(&path, e))?;
        serde_yaml::from_str(&text).map_err(|e| SlateError::persistence(&path, e))
    }

    /// Remove every recorded configuration.
    pub fn clear_mappings(&self) -> Result<()> {
        debug!("Clearing backlinks in {}", self.file_path().display());
        self.save(&[])
    }

    /// Record a configuration. Existing entries with identical paths are
    /// not duplicated.
    pub fn add_configuration(&self, entry: MappingEntry) -> Result<()> {
        let mut entries = self.configurations()?;
        if !entries.contains(&entry) {
            entries.push(entry);
        }
        self.save(&entries)
    }

    fn save(&self, entries: &[MappingEntry]) -> Result<()> {
        let path = self.file_path();
        let text = serde_yaml::to_string(&entries)
            .map_err(|e| SlateError::persistence(&path, e))?;
        crate::fs::atomic_write_file(&path, &text)
    }
}
