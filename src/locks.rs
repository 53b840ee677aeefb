//! Advisory provisioning lock.
//!
//! Two simultaneous project setups against the same configuration
//! location would interleave their disk and tracker writes. A lock file
//! created with exclusive semantics next to the target location keeps a
//! single machine's runs sequential. The remote service itself is not
//! coordinated; see DESIGN.md for the documented limitation.

use crate::error::{Result, SlateError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Metadata written into the lock file for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    pub owner: String,
    pub pid: u32,
    pub created_at: DateTime<Utc>,
    pub action: String,
}

impl LockMetadata {
    fn new(action: &str) -> Self {
        LockMetadata {
            owner: owner_string(),
            pid: std::process::id(),
            created_at: Utc::now(),
            action: action.to_string(),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SlateError::persistence(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| SlateError::Lock(format!("unreadable lock '{}': {}", path.display(), e)))
    }
}

/// `user@host` identity for lock diagnostics.
fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    format!("{}@{}", user, host)
}

/// RAII guard for the provisioning lock. The lock file is removed when
/// the guard drops, including on panic and error paths.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            eprintln!("Warning: failed to release lock '{}': {}", self.path.display(), e);
        }
    }
}

/// Acquire the provisioning lock for a configuration location.
///
/// The lock file sits next to the target directory (`<location>.lock`)
/// so it works before the configuration itself exists.
pub fn acquire_provision_lock(config_location: &Path, action: &str) -> Result<LockGuard> {
    let file_name = config_location
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("configuration");
    let lock_path = config_location.with_file_name(format!("{}.lock", file_name));

    // The configuration may not exist yet; the lock lives in its parent.
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            SlateError::Lock(format!(
                "failed to create lock directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let metadata = LockMetadata::new(action);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                let holder = match LockMetadata::from_file(&lock_path) {
                    Ok(meta) => format!(
                        " (held by {} since {}, action: {})",
                        meta.owner,
                        meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        meta.action
                    ),
                    Err(_) => String::new(),
                };
                SlateError::Lock(format!(
                    "another setup is already running against '{}'{}. \
                     Remove '{}' if that process has died",
                    config_location.display(),
                    holder,
                    lock_path.display()
                ))
            } else {
                SlateError::Lock(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| SlateError::Lock(format!("failed to serialize lock metadata: {}", e)))?;
    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(&lock_path);
        SlateError::Lock(format!("failed to write lock metadata: {}", e))
    })?;

    Ok(LockGuard { path: lock_path })
}
