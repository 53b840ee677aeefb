//! Filesystem helpers for slate.
//!
//! Provisioning writes across network mounts that are shared between
//! platforms and users, so everything here is explicit about permissions
//! and about never leaving half-written structured files behind.

mod atomic;
mod copy;
mod umask;

pub use atomic::{atomic_write, atomic_write_file};
pub use copy::copy_tree;
pub use umask::UmaskGuard;

use crate::error::{Result, SlateError};
use std::fs;
use std::path::Path;

/// Create a directory with an explicit permission mode.
///
/// The mode only applies on unix; elsewhere the platform default is used.
pub fn create_dir_with_mode(path: &Path, mode: u32) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| SlateError::persistence(path, e))?;
    chmod(path, mode)
}

/// Apply a permission mode to an existing path. No-op outside unix.
#[cfg(unix)]
pub fn chmod(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| SlateError::persistence(path, e))
}

#[cfg(not(unix))]
pub fn chmod(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Best-effort permission loosening for a file that may have been copied
/// from a template with restrictive bits. Failures are ignored; the
/// follow-up write reports the real problem if one exists.
pub fn loosen_permissions(path: &Path) {
    let _ = chmod(path, 0o666);
    #[cfg(not(unix))]
    {
        if let Ok(meta) = fs::metadata(path) {
            let mut perms = meta.permissions();
            if perms.readonly() {
                perms.set_readonly(false);
                let _ = fs::set_permissions(path, perms);
            }
        }
    }
}

/// Create an empty file with the given mode, used for ownership-neutral
/// cache files that any toolkit user must be able to write later.
pub fn touch_with_mode(path: &Path, mode: u32) -> Result<()> {
    fs::File::create(path).map_err(|e| SlateError::persistence(path, e))?;
    chmod(path, mode)
}
