//! Disk scaffold for a new pipeline configuration.
//!
//! Creates the fixed directory tree, installs the vendored launcher
//! binaries and the stub-API proxy, and writes the redirection and
//! location records. Everything is existence-checked so a re-run after a
//! partial failure continues instead of failing on what already exists.

use crate::constants::{
    BUNDLE_KIND_DIRS, CACHE_DIR, CONFIG_DIR, CORE_BACKUP_DIR, CORE_INSTALL_DIR, INSTALL_DIR,
    INSTALL_LOCATION_FILE, PLACEHOLDER_FILE,
};
use crate::error::{Result, SlateError};
use crate::fs::{atomic_write_file, chmod, copy_tree, create_dir_with_mode, loosen_permissions};
use crate::platform::Platform;
use crate::provision::params::ProjectSetupParameters;
use std::fs;
use std::path::Path;
use tracing::debug;

const PLACEHOLDER_TEXT: &str = "\
This placeholder file was automatically generated.

The placeholder file is needed when managing configurations in source
control packages such as git and perforce. These systems do not handle
empty folders, so a placeholder file is required for the folder to be
tracked and managed properly.
";

/// Create a folder with a mode, optionally dropping a placeholder file
/// so empty-tree-hostile version control keeps the directory.
fn make_folder(path: &Path, mode: u32, create_placeholder: bool) -> Result<()> {
    if !path.exists() {
        debug!("Creating folder {}...", path.display());
        create_dir_with_mode(path, mode)?;
    }
    if create_placeholder {
        let placeholder = path.join(PLACEHOLDER_FILE);
        if !placeholder.exists() {
            atomic_write_file(&placeholder, PLACEHOLDER_TEXT)?;
        }
    }
    Ok(())
}

/// Create the fixed configuration subtrees, in fixed order.
pub fn create_structure(config_root: &Path) -> Result<()> {
    if !config_root.exists() {
        // Creation feasibility was validated with the parameters.
        create_dir_with_mode(config_root, 0o775)?;
    }

    make_folder(&config_root.join(CACHE_DIR), 0o777, false)?;
    make_folder(&config_root.join(CONFIG_DIR), 0o775, false)?;
    let install = config_root.join(INSTALL_DIR);
    make_folder(&install, 0o775, false)?;
    let core = install.join(CORE_INSTALL_DIR);
    make_folder(&core, 0o777, false)?;
    make_folder(&core.join("api"), 0o777, false)?;
    make_folder(&core.join("setup"), 0o777, false)?;
    make_folder(&install.join(CORE_BACKUP_DIR), 0o777, true)?;
    for kind in BUNDLE_KIND_DIRS {
        make_folder(&install.join(kind), 0o777, true)?;
    }

    Ok(())
}

/// Copy the vendored launcher binaries to the top of the configuration
/// and the stub-API proxy tree into `install/core/api/`.
pub fn install_binaries(install_root: &Path, config_root: &Path) -> Result<()> {
    debug!("Copying launcher binaries...");
    let binaries_dir = install_root.join("setup").join("root_binaries");
    let entries = fs::read_dir(&binaries_dir)
        .map_err(|e| SlateError::copy(&binaries_dir, config_root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| SlateError::copy(&binaries_dir, config_root, e))?;
        let src = entry.path();
        if !src.is_file() {
            continue;
        }
        let dst = config_root.join(entry.file_name());
        fs::copy(&src, &dst).map_err(|e| SlateError::copy(&src, &dst, e))?;
        chmod(&dst, 0o775)?;
    }

    debug!("Copying API proxy stubs...");
    let proxy = install_root.join("setup").join("api_proxy");
    copy_tree(
        &proxy,
        &config_root.join(INSTALL_DIR).join(CORE_INSTALL_DIR).join("api"),
    )
}

/// Write the per-platform core redirection stubs.
///
/// Each stub is one line: the associated core install for that platform,
/// or the literal `undefined` when none is configured.
pub fn write_core_redirections(
    config_root: &Path,
    params: &ProjectSetupParameters,
) -> Result<()> {
    debug!("Creating core redirection config files...");
    let core_dir = config_root.join(INSTALL_DIR).join(CORE_INSTALL_DIR);
    for platform in Platform::ALL {
        let stub = core_dir.join(platform.redirect_file_name());
        let content = params.associated_core_path(platform).unwrap_or("undefined");
        atomic_write_file(&stub, content)?;
    }
    Ok(())
}

/// Write `config/core/install_location.yml` naming this configuration's
/// root on all three platforms. Replaces any copy brought along by the
/// template, loosening its permissions first.
pub fn write_install_location(
    config_root: &Path,
    params: &ProjectSetupParameters,
) -> Result<()> {
    write_install_location_paths(
        config_root,
        params.configuration_location(Platform::Windows),
        params.configuration_location(Platform::Mac),
        params.configuration_location(Platform::Linux),
    )
}

/// Path-triple form of [`write_install_location`], also used when a
/// configuration is cloned to a new root.
pub fn write_install_location_paths(
    config_root: &Path,
    windows: &str,
    mac: &str,
    linux: &str,
) -> Result<()> {
    let location_file = config_root
        .join(CONFIG_DIR)
        .join("core")
        .join(INSTALL_LOCATION_FILE);

    if location_file.exists() {
        loosen_permissions(&location_file);
    }

    let content = format!(
        "# Pipeline configuration location file\n\
         # This file was automatically created by setup_project\n\
         # This file reflects the paths in the primary pipeline\n\
         # configuration defined for this project.\n\
         \n\
         Windows: '{}'\n\
         Darwin: '{}'\n\
         Linux: '{}'\n\
         \n\
         # End of file.\n",
        windows, mac, linux,
    );
    atomic_write_file(&location_file, &content)
}
