//! Installable bundle descriptors.
//!
//! A descriptor is a resolvable reference to an engine, app or framework
//! bundle: it knows whether the bundle is present in the configuration's
//! local install area, how to fetch it from the studio bundle store, and
//! how to run its one-time install hooks.

use crate::error::{Result, SlateError};
use crate::fs::copy_tree;
use crate::pipeline::{BundleKind, DescriptorSpec};
use crate::remote::TrackerClient;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Operations the provisioner needs from any descriptor implementation.
pub trait Descriptor {
    /// Human-readable name for logs and error summaries.
    fn display_name(&self) -> String;

    /// Whether the bundle is already present locally.
    fn exists_local(&self) -> bool;

    /// Fetch the bundle into the local install area.
    fn download_local(&self) -> Result<()>;

    /// Verify the tracker schema carries everything the bundle needs.
    fn ensure_tracker_fields_exist(&self, client: &dyn TrackerClient) -> Result<()>;

    /// Run the bundle's one-time post-install hook, if it has one.
    fn run_post_install(&self) -> Result<()>;
}

/// Optional manifest a bundle ships at its root.
#[derive(Debug, Default, Deserialize)]
struct BundleManifest {
    #[serde(default)]
    required_entity_types: Vec<String>,
}

/// Descriptor for a bundle stored in a filesystem bundle store.
#[derive(Debug, Clone)]
pub struct BundleDescriptor {
    kind: BundleKind,
    spec: DescriptorSpec,
    config_root: PathBuf,
}

impl BundleDescriptor {
    pub fn new(kind: BundleKind, spec: DescriptorSpec, config_root: &Path) -> Self {
        BundleDescriptor {
            kind,
            spec,
            config_root: config_root.to_path_buf(),
        }
    }

    /// Local install path: `install/<kind>/<name>/<version>`.
    pub fn local_path(&self) -> PathBuf {
        self.config_root
            .join("install")
            .join(self.kind.install_dir())
            .join(&self.spec.name)
            .join(&self.spec.version)
    }

    fn manifest(&self) -> BundleManifest {
        let path = self.local_path().join("info.yml");
        let Ok(text) = std::fs::read_to_string(&path) else {
            return BundleManifest::default();
        };
        serde_yaml::from_str(&text).unwrap_or_default()
    }
}

impl Descriptor for BundleDescriptor {
    fn display_name(&self) -> String {
        format!("{} {}", self.spec.name, self.spec.version)
    }

    fn exists_local(&self) -> bool {
        self.local_path().is_dir()
    }

    fn download_local(&self) -> Result<()> {
        let source_root = self.spec.source.as_deref().ok_or_else(|| {
            SlateError::Resolution(format!(
                "{} has no store location and is not installed locally",
                self.display_name()
            ))
        })?;

        // Stores lay bundles out either as <store>/<version>/ or flat.
        let versioned = Path::new(source_root).join(&self.spec.version);
        let source = if versioned.is_dir() {
            versioned
        } else {
            PathBuf::from(source_root)
        };

        debug!("Downloading {} from {}", self.display_name(), source.display());
        copy_tree(&source, &self.local_path())
    }

    fn ensure_tracker_fields_exist(&self, client: &dyn TrackerClient) -> Result<()> {
        let manifest = self.manifest();
        if manifest.required_entity_types.is_empty() {
            return Ok(());
        }
        let schema = client.schema_read()?;
        let missing: Vec<_> = manifest
            .required_entity_types
            .iter()
            .filter(|t| !schema.contains(t))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SlateError::Resolution(format!(
                "{} requires tracker entity types that are not enabled: {}",
                self.display_name(),
                missing.join(", ")
            )))
        }
    }

    fn run_post_install(&self) -> Result<()> {
        let hook = self.local_path().join("hooks").join("post_install");
        if !hook.is_file() {
            return Ok(());
        }
        info!("Running post-install hook for {}...", self.display_name());
        let status = Command::new(&hook)
            .current_dir(self.local_path())
            .status()
            .map_err(|e| {
                SlateError::Unexpected(anyhow::anyhow!(
                    "post-install hook for {} could not be started: {}",
                    self.display_name(),
                    e
                ))
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(SlateError::Unexpected(anyhow::anyhow!(
                "post-install hook for {} exited with {}",
                self.display_name(),
                status
            )))
        }
    }
}
