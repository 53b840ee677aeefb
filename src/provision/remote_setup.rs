//! Tracker-side registration for a new project.
//!
//! Force-reset of existing pipeline configuration records, creation of
//! the new record, published-file entity type resolution, the local
//! cache mirror, and the best-effort telemetry event.

use crate::constants::{
    CONFIG_DIR, LEGACY_PUBLISHED_FILE_ENTITY, NAME_FIELD, PIPELINE_CONFIG_ENTITY,
    PIPELINE_CONFIG_FILE, PRIMARY_CONFIG_NAME, PROJECT_DISK_NAME_FIELD, PROJECT_ENTITY,
    PUBLISHED_FILE_ENTITY, PUBLISHED_FILE_ENTITY_FAMILY,
};
use crate::error::{Result, SlateError};
use crate::fs::atomic_write_file;
use crate::pipeline::PipelineConfigMetadata;
use crate::platform::Platform;
use crate::provision::params::ProjectSetupParameters;
use crate::remote::{Fields, Filter, Record, TrackerClient, link};
use chrono::Utc;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info, warn};

/// Delete every pipeline configuration record tied to the project.
///
/// Runs before any disk change so a forced retry always starts from a
/// clean remote state.
pub fn force_reset(client: &dyn TrackerClient, params: &ProjectSetupParameters) -> Result<()> {
    let existing = client.find(
        PIPELINE_CONFIG_ENTITY,
        &[Filter::is("project", link(PROJECT_ENTITY, params.project_id()))],
        &[NAME_FIELD],
    )?;
    for record in existing {
        warn!(
            "Force mode: Deleting old pipeline configuration {}...",
            record.str_field(NAME_FIELD).unwrap_or("(unnamed)")
        );
        client.delete(PIPELINE_CONFIG_ENTITY, record.id)?;
    }
    Ok(())
}

/// Set the project's disk name and create the pipeline configuration
/// record.
pub fn register_project(
    client: &dyn TrackerClient,
    params: &ProjectSetupParameters,
) -> Result<Record> {
    info!("Registering project in the tracker...");
    let disk_name = params.project_disk_name();
    debug!("Setting Project.{} to {}", PROJECT_DISK_NAME_FIELD, disk_name);
    client.update(
        PROJECT_ENTITY,
        params.project_id(),
        Fields::from([(PROJECT_DISK_NAME_FIELD.to_string(), json!(disk_name))]),
    )?;

    info!("Creating the pipeline configuration record...");
    let fields = Fields::from([
        (
            "project".to_string(),
            link(PROJECT_ENTITY, params.project_id()),
        ),
        (
            "linux_path".to_string(),
            json!(params.configuration_location(Platform::Linux)),
        ),
        (
            "mac_path".to_string(),
            json!(params.configuration_location(Platform::Mac)),
        ),
        (
            "windows_path".to_string(),
            json!(params.configuration_location(Platform::Windows)),
        ),
        (NAME_FIELD.to_string(), json!(PRIMARY_CONFIG_NAME)),
    ]);
    let record = client.create(PIPELINE_CONFIG_ENTITY, fields)?;
    debug!("Created record: {} {}", record.entity_type, record.id);
    Ok(record)
}

/// Determine the published-file entity type for this project by
/// introspecting the tracker schema.
///
/// The modern type is only used when the whole modern family is enabled;
/// otherwise the legacy type applies. A schema read failure is fatal.
pub fn resolve_published_file_entity_type(client: &dyn TrackerClient) -> Result<String> {
    debug!("Retrieving schema from the tracker to determine the published file entity type");
    let schema = client
        .schema_read()
        .map_err(|e| SlateError::RemoteService(e))?;

    let entity_type = if PUBLISHED_FILE_ENTITY_FAMILY
        .iter()
        .all(|t| schema.contains(t))
    {
        PUBLISHED_FILE_ENTITY
    } else {
        LEGACY_PUBLISHED_FILE_ENTITY
    };
    debug!(" > Using {} entity type for published files", entity_type);
    Ok(entity_type.to_string())
}

/// Persist the local mirror of the new record to
/// `config/core/pipeline_configuration.yml`.
pub fn write_config_cache(
    config_root: &Path,
    params: &ProjectSetupParameters,
    pc_record: &Record,
    published_file_entity_type: &str,
) -> Result<()> {
    let cache_path = config_root
        .join(CONFIG_DIR)
        .join("core")
        .join(PIPELINE_CONFIG_FILE);
    debug!("Writing configuration cache file {}", cache_path.display());

    let metadata = PipelineConfigMetadata {
        pc_id: pc_record.id,
        pc_name: PRIMARY_CONFIG_NAME.to_string(),
        project_id: params.project_id(),
        project_name: params.project_disk_name().to_string(),
        published_file_entity_type: published_file_entity_type.to_string(),
    };
    let text = serde_yaml::to_string(&metadata)
        .map_err(|e| SlateError::persistence(&cache_path, e))?;
    atomic_write_file(&cache_path, &text)
}

/// Write a project-created event to the app store connection.
///
/// Best effort: telemetry must never fail a setup, so errors are logged
/// and swallowed.
pub fn write_creation_event(app_store: &dyn TrackerClient, params: &ProjectSetupParameters) {
    debug!("Writing app store stats...");
    let fields = Fields::from([
        (
            "description".to_string(),
            json!(format!(
                "Project {} was set up with a pipeline configuration",
                params.project_id()
            )),
        ),
        ("event_type".to_string(), json!("AppStore_Project_Created")),
        ("created_at".to_string(), json!(Utc::now().to_rfc3339())),
    ]);
    if let Err(e) = app_store.create("EventLogEntry", fields) {
        warn!("Could not write the app store creation event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{OptionalPlatformPaths, PlatformPaths};
    use crate::provision::params::SetupManifest;
    use crate::remote::FileTracker;
    use crate::test_support::create_tracker;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn params(tmp: &TempDir, force: bool) -> ProjectSetupParameters {
        let template = tmp.path().join("template");
        std::fs::create_dir_all(&template).unwrap();
        let manifest = SetupManifest {
            project_id: 1,
            force,
            project_disk_name: Some("myshow".to_string()),
            config_template: template,
            configuration_locations: PlatformPaths {
                linux: "/mnt/configs/myshow".into(),
                mac: "/Volumes/configs/myshow".into(),
                windows: "p:\\configs\\myshow".into(),
            },
            associated_core: OptionalPlatformPaths::default(),
            storages: BTreeMap::from([(
                "primary".to_string(),
                PlatformPaths {
                    linux: "/mnt/projects".into(),
                    mac: "/Volumes/projects".into(),
                    windows: "p:\\projects".into(),
                },
            )]),
        };
        ProjectSetupParameters::from_manifest(manifest, "My Show").unwrap()
    }

    fn tracker_with_project(tmp: &TempDir) -> FileTracker {
        let tracker = create_tracker(
            tmp.path(),
            &["Project", "PipelineConfiguration", "EventLogEntry"],
        );
        tracker
            .create(PROJECT_ENTITY, Fields::from([("name".to_string(), json!("My Show"))]))
            .unwrap();
        tracker
    }

    #[test]
    fn force_reset_deletes_all_prior_records() {
        let tmp = TempDir::new().unwrap();
        let tracker = tracker_with_project(&tmp);
        let params = params(&tmp, true);
        register_project(&tracker, &params).unwrap();
        register_project(&tracker, &params).unwrap();

        force_reset(&tracker, &params).unwrap();
        register_project(&tracker, &params).unwrap();

        let records = tracker.find(PIPELINE_CONFIG_ENTITY, &[], &[]).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn register_project_writes_paths_and_primary_name() {
        let tmp = TempDir::new().unwrap();
        let tracker = tracker_with_project(&tmp);
        let record = register_project(&tracker, &params(&tmp, false)).unwrap();

        assert_eq!(record.str_field(NAME_FIELD), Some(PRIMARY_CONFIG_NAME));
        assert_eq!(record.str_field("linux_path"), Some("/mnt/configs/myshow"));

        let project = tracker
            .find(PROJECT_ENTITY, &[Filter::is("id", json!(1))], &[])
            .unwrap();
        assert_eq!(project[0].str_field(PROJECT_DISK_NAME_FIELD), Some("myshow"));
    }

    #[test]
    fn modern_schema_resolves_modern_published_file_type() {
        let tmp = TempDir::new().unwrap();
        let tracker = create_tracker(
            tmp.path(),
            &["PublishedFile", "PublishedFileType", "PublishedFileDependency"],
        );
        assert_eq!(
            resolve_published_file_entity_type(&tracker).unwrap(),
            "PublishedFile"
        );
    }

    #[test]
    fn partial_schema_falls_back_to_legacy_type() {
        let tmp = TempDir::new().unwrap();
        let tracker = create_tracker(tmp.path(), &["PublishedFile", "PublishedFileType"]);
        assert_eq!(
            resolve_published_file_entity_type(&tracker).unwrap(),
            LEGACY_PUBLISHED_FILE_ENTITY
        );
    }

    #[test]
    fn config_cache_round_trips() {
        let tmp = TempDir::new().unwrap();
        let tracker = tracker_with_project(&tmp);
        let params = params(&tmp, false);
        let record = register_project(&tracker, &params).unwrap();
        let config_root = tmp.path().join("cfg");

        write_config_cache(&config_root, &params, &record, "PublishedFile").unwrap();

        let text = std::fs::read_to_string(
            config_root.join("config").join("core").join("pipeline_configuration.yml"),
        )
        .unwrap();
        let metadata: PipelineConfigMetadata = serde_yaml::from_str(&text).unwrap();
        assert_eq!(metadata.pc_id, record.id);
        assert_eq!(metadata.project_name, "myshow");
        assert_eq!(metadata.published_file_entity_type, "PublishedFile");
    }

    #[test]
    fn creation_event_failure_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        // No EventLogEntry type in this store: create will fail.
        let broken = create_tracker(tmp.path(), &["Project"]);
        write_creation_event(&broken, &params(&tmp, false));
    }
}
