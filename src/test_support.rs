//! Shared helpers for unit tests.
//!
//! Builds the small on-disk fixtures most tests need: a pipeline
//! configuration root with its metadata record, environment files, and a
//! tracker store.

use crate::constants::PRIMARY_CONFIG_NAME;
use crate::pipeline::{PipelineConfigMetadata, PipelineConfiguration, pipeline_config_file};
use crate::remote::{EntityId, FileTracker};
use std::path::Path;

/// Write a minimal configuration metadata record at `root`, making it a
/// recognizable pipeline configuration.
pub fn write_pipeline_metadata(root: &Path, project_id: EntityId) {
    let metadata = PipelineConfigMetadata {
        pc_id: 1,
        pc_name: PRIMARY_CONFIG_NAME.to_string(),
        project_id,
        project_name: "myshow".to_string(),
        published_file_entity_type: "PublishedFile".to_string(),
    };
    let path = pipeline_config_file(root);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_yaml::to_string(&metadata).unwrap()).unwrap();
}

/// Write metadata and load the handle.
pub fn load_configuration(root: &Path, project_id: EntityId) -> PipelineConfiguration {
    write_pipeline_metadata(root, project_id);
    PipelineConfiguration::from_path(root).unwrap()
}

/// Drop an environment file into `config/env/`.
pub fn write_environment(root: &Path, name: &str, yaml: &str) {
    let env_dir = root.join("config").join("env");
    std::fs::create_dir_all(&env_dir).unwrap();
    std::fs::write(env_dir.join(format!("{}.yml", name)), yaml).unwrap();
}

/// Create a tracker store in `dir` with the given entity types enabled.
pub fn create_tracker(dir: &Path, entity_types: &[&str]) -> FileTracker {
    FileTracker::create_store(
        dir.join("tracker.yml"),
        entity_types.iter().map(|s| s.to_string()),
    )
    .unwrap()
}
