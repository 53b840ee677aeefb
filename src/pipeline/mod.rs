//! Pipeline configuration handle.
//!
//! A pipeline configuration is a directory tree bound to one project,
//! with platform-spanning path records under `config/core/`. This module
//! resolves arbitrary paths and tracker entities into a configuration
//! handle and reads the records provisioning wrote.

mod environment;
mod storage_map;

pub use environment::{
    BundleSettings, CommandMode, CommandSpec, DescriptorSpec, EngineSettings, Environment,
};
pub use storage_map::{MappingEntry, StorageMapping};

use crate::constants::{
    CACHE_DIR, CONFIG_DIR, CORE_INSTALL_DIR, INSTALL_DIR, INSTALL_LOCATION_FILE, NAME_FIELD,
    PIPELINE_CONFIG_ENTITY, PIPELINE_CONFIG_FILE, PRIMARY_CONFIG_NAME, PROJECT_ENTITY, ROOTS_FILE,
};
use crate::error::{Result, SlateError};
use crate::platform::Platform;
use crate::remote::{EntityId, Filter, TrackerClient, link};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The kind of an installable bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Engine,
    App,
    Framework,
}

impl BundleKind {
    /// Directory under `install/` holding bundles of this kind.
    pub fn install_dir(self) -> &'static str {
        match self {
            BundleKind::Engine => "engines",
            BundleKind::App => "apps",
            BundleKind::Framework => "frameworks",
        }
    }
}

/// Contents of `config/core/pipeline_configuration.yml`: the local
/// mirror of the remote pipeline configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfigMetadata {
    pub pc_id: EntityId,
    pub pc_name: String,
    pub project_id: EntityId,
    pub project_name: String,
    pub published_file_entity_type: String,
}

/// Per-storage platform paths as stored in `roots.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRootPaths {
    pub linux_path: String,
    pub mac_path: String,
    pub windows_path: String,
}

impl StorageRootPaths {
    pub fn get(&self, platform: Platform) -> &str {
        match platform {
            Platform::Linux => &self.linux_path,
            Platform::Mac => &self.mac_path,
            Platform::Windows => &self.windows_path,
        }
    }
}

/// Handle onto one pipeline configuration on disk.
#[derive(Debug, Clone)]
pub struct PipelineConfiguration {
    root: PathBuf,
    metadata: PipelineConfigMetadata,
}

impl PipelineConfiguration {
    /// Resolve a configuration from an arbitrary path.
    ///
    /// Walks from the path upwards. A directory is recognized either as
    /// a configuration root directly, or as a storage project location
    /// whose backlink mapping names the configuration.
    pub fn from_path(path: &Path) -> Result<PipelineConfiguration> {
        let mut saw_shared_core = false;
        let mut cursor = Some(path.to_path_buf());

        while let Some(dir) = cursor {
            if is_configuration_root(&dir) {
                return Self::load(&dir);
            }

            let mapping = StorageMapping::new(&dir);
            if mapping.file_path().is_file() {
                return Self::from_backlinks(&dir, &mapping);
            }

            if looks_like_shared_core(&dir) {
                saw_shared_core = true;
            }

            cursor = dir.parent().map(Path::to_path_buf);
        }

        if saw_shared_core {
            Err(SlateError::Resolution(format!(
                "the path '{}' belongs to a shared core-only install, not to a project \
                 configuration. Navigate to the configuration you want to operate on and \
                 run the command from there",
                path.display()
            )))
        } else {
            Err(SlateError::Resolution(format!(
                "the path '{}' is not associated with any pipeline configuration",
                path.display()
            )))
        }
    }

    fn from_backlinks(dir: &Path, mapping: &StorageMapping) -> Result<PipelineConfiguration> {
        let entries = mapping.configurations()?;
        let platform = Platform::current();
        let config_path = entries
            .iter()
            .map(|entry| match platform {
                Platform::Linux => entry.linux_path.as_str(),
                Platform::Mac => entry.mac_path.as_str(),
                Platform::Windows => entry.windows_path.as_str(),
            })
            .find(|p| !p.is_empty())
            .ok_or_else(|| {
                SlateError::Resolution(format!(
                    "the storage location '{}' does not map to any configuration for this \
                     platform",
                    dir.display()
                ))
            })?;
        debug!("Backlink at {} -> {}", dir.display(), config_path);
        Self::load(Path::new(config_path))
    }

    /// Resolve a configuration from a tracker entity.
    ///
    /// Non-project entities are followed to their project; the project's
    /// primary pipeline configuration record supplies the path for the
    /// current platform.
    pub fn from_entity(
        client: &dyn TrackerClient,
        entity_type: &str,
        id: EntityId,
    ) -> Result<PipelineConfiguration> {
        let project_id = if entity_type == PROJECT_ENTITY {
            id
        } else {
            let records = client.find(entity_type, &[Filter::is("id", json!(id))], &["project"])?;
            let record = records.first().ok_or_else(|| {
                SlateError::Resolution(format!(
                    "the item {} {} does not exist in the tracker",
                    entity_type, id
                ))
            })?;
            record.link_field("project").ok_or_else(|| {
                SlateError::Resolution(format!(
                    "the item {} {} is not associated with any project",
                    entity_type, id
                ))
            })?
        };

        let configs = client.find(
            PIPELINE_CONFIG_ENTITY,
            &[Filter::is("project", link(PROJECT_ENTITY, project_id))],
            &[NAME_FIELD, "linux_path", "mac_path", "windows_path"],
        )?;
        let config = configs
            .iter()
            .find(|c| c.str_field(NAME_FIELD) == Some(PRIMARY_CONFIG_NAME))
            .or_else(|| configs.first())
            .ok_or_else(|| {
                SlateError::Resolution(format!(
                    "project {} has not been set up with a pipeline configuration. \
                     Run setup_project first",
                    project_id
                ))
            })?;

        let path_field = Platform::current().path_field();
        let config_path = config.str_field(path_field).filter(|p| !p.is_empty()).ok_or_else(
            || {
                SlateError::Resolution(format!(
                    "the pipeline configuration for project {} has no path for this platform",
                    project_id
                ))
            },
        )?;

        debug!("Resolved {} {} -> {}", entity_type, id, config_path);
        Self::load(Path::new(config_path))
    }

    fn load(root: &Path) -> Result<PipelineConfiguration> {
        let metadata_path = pipeline_config_file(root);
        let text = std::fs::read_to_string(&metadata_path).map_err(|e| {
            SlateError::Resolution(format!(
                "'{}' does not look like a pipeline configuration: cannot read {}: {}",
                root.display(),
                metadata_path.display(),
                e
            ))
        })?;
        let metadata: PipelineConfigMetadata = serde_yaml::from_str(&text)
            .map_err(|e| SlateError::persistence(&metadata_path, e))?;
        Ok(PipelineConfiguration {
            root: root.to_path_buf(),
            metadata,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata(&self) -> &PipelineConfigMetadata {
        &self.metadata
    }

    pub fn project_id(&self) -> EntityId {
        self.metadata.project_id
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR)
    }

    pub fn core_config_dir(&self) -> PathBuf {
        self.config_dir().join("core")
    }

    pub fn cache_location(&self) -> PathBuf {
        self.root.join(CACHE_DIR)
    }

    pub fn core_install_dir(&self) -> PathBuf {
        self.root.join(INSTALL_DIR).join(CORE_INSTALL_DIR)
    }

    /// Whether this configuration carries its own core install rather
    /// than redirecting to a shared one.
    pub fn is_localized(&self) -> bool {
        self.core_install_dir().join("info.yml").is_file()
    }

    /// Read the associated-core pointer for a platform from the
    /// redirection stub. `undefined` and blank files read as None.
    pub fn associated_core_path(&self, platform: Platform) -> Option<String> {
        let stub = self.core_install_dir().join(platform.redirect_file_name());
        let text = std::fs::read_to_string(stub).ok()?;
        let value = text.trim();
        if value.is_empty() || value == "undefined" || value == "None" {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Platform paths of this configuration from `install_location.yml`.
    pub fn install_location(&self) -> Result<BTreeMap<String, String>> {
        let path = self.core_config_dir().join(INSTALL_LOCATION_FILE);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| SlateError::persistence(&path, e))?;
        serde_yaml::from_str(&text).map_err(|e| SlateError::persistence(&path, e))
    }

    /// The storage roots recorded for this configuration.
    pub fn roots(&self) -> Result<BTreeMap<String, StorageRootPaths>> {
        let path = self.core_config_dir().join(ROOTS_FILE);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| SlateError::persistence(&path, e))?;
        serde_yaml::from_str(&text).map_err(|e| SlateError::persistence(&path, e))
    }

    /// Names of all environments declared by this configuration.
    pub fn environment_names(&self) -> Result<Vec<String>> {
        let env_dir = self.config_dir().join("env");
        let mut names = Vec::new();
        if !env_dir.is_dir() {
            return Ok(names);
        }
        let entries = std::fs::read_dir(&env_dir)
            .map_err(|e| SlateError::persistence(&env_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| SlateError::persistence(&env_dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yml")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load one environment by name.
    pub fn environment(&self, name: &str) -> Result<Environment> {
        let path = self.config_dir().join("env").join(format!("{}.yml", name));
        if !path.is_file() {
            return Err(SlateError::Resolution(format!(
                "the environment '{}' is not part of the configuration in '{}'",
                name,
                self.root.display()
            )));
        }
        Environment::load(&path)
    }

    /// Create (or preview) the on-disk folders for an entity across all
    /// storages. Folder naming is deliberately schema-less here: one
    /// folder per entity type and name under each storage's project
    /// location.
    pub fn process_filesystem_structure(
        &self,
        entity_type: &str,
        entity_name: &str,
        preview: bool,
    ) -> Result<Vec<PathBuf>> {
        let platform = Platform::current();
        let mut processed = Vec::new();
        for paths in self.roots()?.values() {
            let storage_path = paths.get(platform);
            if storage_path.is_empty() {
                continue;
            }
            let folder = Path::new(storage_path)
                .join(entity_type.to_lowercase())
                .join(entity_name);
            if !preview && !folder.exists() {
                std::fs::create_dir_all(&folder)
                    .map_err(|e| SlateError::persistence(&folder, e))?;
            }
            processed.push(folder);
        }
        Ok(processed)
    }
}

/// Path of the configuration cache record for a given root.
pub fn pipeline_config_file(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join("core").join(PIPELINE_CONFIG_FILE)
}

/// Whether a directory is a pipeline configuration root.
pub fn is_configuration_root(dir: &Path) -> bool {
    pipeline_config_file(dir).is_file()
}

/// Whether a directory looks like a core-only (studio) install: it has a
/// core under `install/` but no pipeline configuration record.
pub fn looks_like_shared_core(dir: &Path) -> bool {
    dir.join(INSTALL_DIR).join(CORE_INSTALL_DIR).is_dir() && !is_configuration_root(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_pipeline_metadata as write_metadata;
    use tempfile::TempDir;

    #[test]
    fn from_path_finds_configuration_root_directly() {
        let tmp = TempDir::new().unwrap();
        write_metadata(tmp.path(), 7);

        let pc = PipelineConfiguration::from_path(tmp.path()).unwrap();
        assert_eq!(pc.project_id(), 7);
    }

    #[test]
    fn from_path_ascends_to_configuration_root() {
        let tmp = TempDir::new().unwrap();
        write_metadata(tmp.path(), 7);
        let nested = tmp.path().join("config").join("env");
        std::fs::create_dir_all(&nested).unwrap();

        let pc = PipelineConfiguration::from_path(&nested).unwrap();
        assert_eq!(pc.root(), tmp.path());
    }

    #[test]
    fn from_path_follows_storage_backlinks() {
        let tmp = TempDir::new().unwrap();
        let config_root = tmp.path().join("configs").join("myshow");
        write_metadata(&config_root, 12);

        let storage = tmp.path().join("projects").join("myshow");
        std::fs::create_dir_all(storage.join("shot").join("ABC123")).unwrap();
        let mapping = StorageMapping::new(&storage);
        mapping
            .add_configuration(MappingEntry {
                mac_path: config_root.to_str().unwrap().to_string(),
                windows_path: config_root.to_str().unwrap().to_string(),
                linux_path: config_root.to_str().unwrap().to_string(),
            })
            .unwrap();

        let pc =
            PipelineConfiguration::from_path(&storage.join("shot").join("ABC123")).unwrap();
        assert_eq!(pc.project_id(), 12);
    }

    #[test]
    fn from_path_distinguishes_shared_core_location() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("install").join("core")).unwrap();

        let err = PipelineConfiguration::from_path(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("core-only install"));
    }

    #[test]
    fn from_path_rejects_unrelated_location() {
        let tmp = TempDir::new().unwrap();
        let err = PipelineConfiguration::from_path(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("not associated"));
    }

    #[test]
    fn associated_core_reads_undefined_as_none() {
        let tmp = TempDir::new().unwrap();
        write_metadata(tmp.path(), 3);
        let core_dir = tmp.path().join("install").join("core");
        std::fs::create_dir_all(&core_dir).unwrap();
        std::fs::write(
            core_dir.join(Platform::current().redirect_file_name()),
            "undefined",
        )
        .unwrap();

        let pc = PipelineConfiguration::from_path(tmp.path()).unwrap();
        assert_eq!(pc.associated_core_path(Platform::current()), None);
    }

    #[test]
    fn environment_names_lists_env_files_sorted() {
        let tmp = TempDir::new().unwrap();
        write_metadata(tmp.path(), 3);
        let env_dir = tmp.path().join("config").join("env");
        std::fs::create_dir_all(&env_dir).unwrap();
        std::fs::write(env_dir.join("review.yml"), "engines: {}\n").unwrap();
        std::fs::write(env_dir.join("asset.yml"), "engines: {}\n").unwrap();
        std::fs::write(env_dir.join("notes.txt"), "not an env\n").unwrap();

        let pc = PipelineConfiguration::from_path(tmp.path()).unwrap();
        assert_eq!(pc.environment_names().unwrap(), vec!["asset", "review"]);
    }
}
