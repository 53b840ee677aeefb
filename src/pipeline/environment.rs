//! Environment files.
//!
//! An environment (`config/env/<name>.yml`) declares which engines run in
//! it, which apps those engines load, which frameworks everything shares,
//! and the commands each engine exposes. Each bundle reference is a
//! descriptor spec naming the bundle, its version and the store location
//! it can be fetched from.

use crate::error::{Result, SlateError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Reference to an installable engine/app/framework bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSpec {
    pub name: String,
    pub version: String,
    /// Store location downloads come from. Bundles without a source can
    /// only be used when already installed locally.
    #[serde(default)]
    pub source: Option<String>,
}

impl std::fmt::Display for DescriptorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// How a registered command expects to be invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMode {
    /// Plain invocation, no arguments.
    #[default]
    Simple,
    /// Takes the entity type and the selected entity ids.
    Legacy,
}

/// A command an engine exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mode: CommandMode,
    /// Command line executed when the command runs. Commands without one
    /// are registration-only entries.
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub deny_platforms: Vec<String>,
    #[serde(default)]
    pub deny_permissions: Vec<String>,
    #[serde(default)]
    pub supports_multiple_selection: bool,
}

/// An app entry inside an engine block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleSettings {
    pub location: DescriptorSpec,
}

/// An engine block inside an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub location: DescriptorSpec,
    #[serde(default)]
    pub apps: BTreeMap<String, BundleSettings>,
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSpec>,
}

/// A parsed environment file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub engines: BTreeMap<String, EngineSettings>,
    #[serde(default)]
    pub frameworks: BTreeMap<String, BundleSettings>,
}

impl Environment {
    /// Load an environment from its YAML file; the environment name is
    /// the file stem.
    pub fn load(path: &Path) -> Result<Environment> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SlateError::persistence(path, e))?;
        let mut env: Environment =
            serde_yaml::from_str(&text).map_err(|e| SlateError::persistence(path, e))?;
        env.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
        Ok(env)
    }

    /// Every descriptor referenced by this environment: each engine, each
    /// app of each engine, each framework.
    pub fn all_descriptors(&self) -> Vec<(super::BundleKind, DescriptorSpec)> {
        let mut out = Vec::new();
        for engine in self.engines.values() {
            out.push((super::BundleKind::Engine, engine.location.clone()));
            for app in engine.apps.values() {
                out.push((super::BundleKind::App, app.location.clone()));
            }
        }
        for framework in self.frameworks.values() {
            out.push((super::BundleKind::Framework, framework.location.clone()));
        }
        out
    }
}
