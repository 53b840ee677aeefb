//! Recursive tree copies with open permissions.
//!
//! Configuration templates and core proxy trees are copied with relaxed
//! modes so that any user in the studio can run updates later. Version
//! control metadata and OS junk directories are skipped by name.

use crate::constants::COPY_SKIP_NAMES;
use crate::error::{Result, SlateError};
use crate::fs::chmod;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Recursively copy `src` into `dst`, creating `dst` if needed.
///
/// Entries whose file name appears in the skip list are pruned, including
/// everything below them. Existing files in `dst` are overwritten.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        debug!("Creating folder {}...", dst.display());
        fs::create_dir_all(dst).map_err(|e| SlateError::copy(src, dst, e))?;
        chmod(dst, 0o775)?;
    }

    let walker = WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry.file_name().to_str()));

    for entry in walker {
        let entry = entry.map_err(|e| SlateError::copy(src, dst, e))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| SlateError::copy(entry.path(), dst, e))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| SlateError::copy(entry.path(), &target, e))?;
            chmod(&target, 0o775)?;
        } else {
            debug!("Copying {} --> {}", entry.path().display(), target.display());
            fs::copy(entry.path(), &target)
                .map_err(|e| SlateError::copy(entry.path(), &target, e))?;
        }
    }

    Ok(())
}

fn is_skipped(name: Option<&str>) -> bool {
    match name {
        Some(name) => COPY_SKIP_NAMES.contains(&name),
        None => false,
    }
}
