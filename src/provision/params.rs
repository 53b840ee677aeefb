//! Project setup parameters.
//!
//! All settings a setup run needs, gathered and validated before any
//! side effect happens. Parameters are loaded from a setup manifest (a
//! YAML file describing the project), which replaces interactive
//! prompting so that setups are repeatable and scriptable.

use crate::error::{Result, SlateError};
use crate::fs::copy_tree;
use crate::platform::{OptionalPlatformPaths, Platform, PlatformPaths};
use crate::remote::EntityId;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// On-disk shape of the setup manifest.
#[derive(Debug, Deserialize)]
pub struct SetupManifest {
    pub project_id: EntityId,
    #[serde(default)]
    pub force: bool,
    /// Disk name for the project. Derived from the project's tracker
    /// name when omitted. May contain slashes for multi-level layouts.
    #[serde(default)]
    pub project_disk_name: Option<String>,
    pub config_template: PathBuf,
    pub configuration_locations: PlatformPaths,
    #[serde(default)]
    pub associated_core: OptionalPlatformPaths,
    /// Storage name -> storage root per platform. Project paths are the
    /// storage root joined with the disk name.
    pub storages: BTreeMap<String, PlatformPaths>,
}

impl SetupManifest {
    pub fn load(path: &Path) -> Result<SetupManifest> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SlateError::Usage(format!(
                "cannot read setup manifest '{}': {}. Create one describing the project \
                 to set up",
                path.display(),
                e
            ))
        })?;
        serde_yaml::from_str(&text)
            .map_err(|e| SlateError::Usage(format!("invalid setup manifest '{}': {}", path.display(), e)))
    }
}

/// Validated parameters driving one project setup run.
#[derive(Debug)]
pub struct ProjectSetupParameters {
    project_id: EntityId,
    force: bool,
    project_disk_name: String,
    config_template: PathBuf,
    configuration_locations: PlatformPaths,
    associated_core: OptionalPlatformPaths,
    storages: BTreeMap<String, PlatformPaths>,
}

impl ProjectSetupParameters {
    /// Build parameters from a manifest, filling the disk name from the
    /// project's tracker name when the manifest leaves it out.
    pub fn from_manifest(manifest: SetupManifest, project_name: &str) -> Result<Self> {
        let disk_name = match manifest.project_disk_name {
            Some(name) => name,
            None => suggest_disk_name(project_name),
        };

        let params = ProjectSetupParameters {
            project_id: manifest.project_id,
            force: manifest.force,
            project_disk_name: disk_name,
            config_template: manifest.config_template,
            configuration_locations: manifest.configuration_locations,
            associated_core: manifest.associated_core,
            storages: manifest.storages,
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<()> {
        if self.project_id <= 0 {
            return Err(SlateError::Usage(format!(
                "invalid project id {}",
                self.project_id
            )));
        }

        if !valid_disk_name(&self.project_disk_name) {
            return Err(SlateError::Usage(format!(
                "invalid project disk name '{}'. Use letters, digits, underscores, \
                 dashes and dots, with '/' for multi-level names",
                self.project_disk_name
            )));
        }

        if !self.config_template.is_dir() {
            return Err(SlateError::Usage(format!(
                "configuration template '{}' does not exist",
                self.config_template.display()
            )));
        }

        if self.storages.is_empty() {
            return Err(SlateError::Usage(
                "the setup manifest must declare at least one storage".to_string(),
            ));
        }

        Ok(())
    }

    pub fn project_id(&self) -> EntityId {
        self.project_id
    }

    pub fn force_setup(&self) -> bool {
        self.force
    }

    pub fn project_disk_name(&self) -> &str {
        &self.project_disk_name
    }

    /// Configuration root for a platform. Always defined for all three.
    pub fn configuration_location(&self, platform: Platform) -> &str {
        self.configuration_locations.get(platform)
    }

    /// Associated core install for a platform, when one is configured.
    pub fn associated_core_path(&self, platform: Platform) -> Option<&str> {
        self.associated_core.get(platform)
    }

    /// Names of all storages this project requires.
    pub fn required_storages(&self) -> Vec<String> {
        self.storages.keys().cloned().collect()
    }

    /// Project path for a storage and platform: the storage root joined
    /// with each level of the disk name, using that platform's
    /// separator.
    pub fn project_path(&self, storage: &str, platform: Platform) -> Result<String> {
        let roots = self.storages.get(storage).ok_or_else(|| {
            SlateError::Usage(format!("storage '{}' is not declared in the manifest", storage))
        })?;
        let mut path = roots.get(platform).to_string();
        for level in self.project_disk_name.split('/') {
            path = platform.join(&path, level);
        }
        Ok(path)
    }

    /// Copy the configuration template into place.
    pub fn create_configuration(&self, dest: &Path) -> Result<()> {
        copy_tree(&self.config_template, dest)
    }
}

/// Whether a disk name is acceptable as provided. Dot-only components
/// would escape the storage root and are rejected.
fn valid_disk_name(name: &str) -> bool {
    // Unwrap is fine: the pattern is a literal.
    let pattern = Regex::new(r"^[A-Za-z0-9_.\-]+(/[A-Za-z0-9_.\-]+)*$").unwrap();
    pattern.is_match(name) && name.split('/').all(|level| level != "." && level != "..")
}

/// Derive a usable disk name from a free-form project name: non-word
/// characters become underscores, the result is lower-cased.
pub fn suggest_disk_name(project_name: &str) -> String {
    let pattern = Regex::new(r"\W").unwrap();
    pattern.replace_all(project_name, "_").to_lowercase()
}
