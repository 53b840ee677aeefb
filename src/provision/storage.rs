//! Storage root registration and markers.
//!
//! Writes `roots.yml`, ensures every required storage carries the
//! bookkeeping subtree, and rewrites the storage → configuration
//! backlink mapping.

use crate::constants::{
    CONFIG_DIR, PATH_CACHE_FILE, PRIMARY_STORAGE_NAME, ROOTS_FILE, STORAGE_MARKER_DIR,
};
use crate::error::{Result, SlateError};
use crate::fs::{atomic_write_file, create_dir_with_mode, touch_with_mode};
use crate::pipeline::{MappingEntry, StorageMapping, StorageRootPaths};
use crate::platform::Platform;
use crate::provision::params::ProjectSetupParameters;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Write `config/core/roots.yml`, mapping every required storage to its
/// per-platform project path. A write failure is fatal and carries the
/// target path.
pub fn write_roots(config_root: &Path, params: &ProjectSetupParameters) -> Result<()> {
    debug!("Writing {}...", ROOTS_FILE);
    let roots_path = config_root.join(CONFIG_DIR).join("core").join(ROOTS_FILE);

    let mut roots: BTreeMap<String, StorageRootPaths> = BTreeMap::new();
    for storage in params.required_storages() {
        roots.insert(
            storage.clone(),
            StorageRootPaths {
                linux_path: params.project_path(&storage, Platform::Linux)?,
                mac_path: params.project_path(&storage, Platform::Mac)?,
                windows_path: params.project_path(&storage, Platform::Windows)?,
            },
        );
    }

    let text =
        serde_yaml::to_string(&roots).map_err(|e| SlateError::persistence(&roots_path, e))?;
    atomic_write_file(&roots_path, &text)
}

/// Ensure each storage's marker subtree exists and reset its backlink
/// mapping to point at this configuration.
pub fn setup_storages(params: &ProjectSetupParameters) -> Result<()> {
    let platform = Platform::current();

    for storage in params.required_storages() {
        info!("Setting up {} storage...", storage);

        let project_path = params.project_path(&storage, platform)?;
        debug!("Project path: {}", project_path);
        let project_path = Path::new(&project_path);

        let marker = project_path.join(STORAGE_MARKER_DIR);
        if !marker.exists() {
            create_dir_with_mode(&marker, 0o777)?;
        }
        let cache = marker.join("cache");
        if !cache.exists() {
            create_dir_with_mode(&cache, 0o777)?;
        }
        let config = marker.join("config");
        if !config.exists() {
            create_dir_with_mode(&config, 0o777)?;
        }

        if storage == PRIMARY_STORAGE_NAME {
            // Ownership-neutral path cache: any toolkit user must be
            // able to write to it later.
            let cache_file = cache.join(PATH_CACHE_FILE);
            if !cache_file.exists() {
                debug!("Touching path cache {}", cache_file.display());
                touch_with_mode(&cache_file, 0o666)?;
            }
        }

        // Reset the backlinks: stale entries survive copy-based project
        // creation and forced re-installs otherwise.
        debug!("Setting up storage -> configuration mapping...");
        let mapping = StorageMapping::new(project_path);
        mapping.clear_mappings()?;
        mapping.add_configuration(MappingEntry {
            mac_path: params.configuration_location(Platform::Mac).to_string(),
            windows_path: params.configuration_location(Platform::Windows).to_string(),
            linux_path: params.configuration_location(Platform::Linux).to_string(),
        })?;
    }

    Ok(())
}
