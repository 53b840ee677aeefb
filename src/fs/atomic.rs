//! Atomic file writes.
//!
//! Structured records (roots, install location, configuration cache,
//! backlink mappings) must never be observable in a half-written state:
//! other workstations read them over shared storage while provisioning
//! runs. Writes go to a temp file in the target directory, are synced,
//! and are then moved over the destination.

use crate::error::{Result, SlateError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file.
///
/// The parent directory is created if missing. On crash a stray
/// `.{name}.tmp` file may remain in the target directory; it is
/// overwritten by the next successful write.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| SlateError::persistence(parent, e))?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        SlateError::persistence(path, e)
    })?;

    // Persist the directory entry as well; best effort.
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SlateError::persistence(target, "invalid file name"))?;
    Ok(parent.join(format!(".{}.tmp", filename)))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| SlateError::persistence(path, e))?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        SlateError::persistence(path, e)
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        SlateError::persistence(path, e)
    })?;

    Ok(())
}
