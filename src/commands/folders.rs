//! The `folders` builtin.
//!
//! Creates (or previews) the on-disk folders for a tracker entity
//! across every storage of the entity's project.

use crate::constants::NAME_FIELD;
use crate::context::resolve_entity_id;
use crate::error::{Result, SlateError};
use crate::pipeline::PipelineConfiguration;
use crate::remote::{self, Filter, TrackerClient};
use serde_json::json;
use std::path::Path;
use tracing::info;

pub fn run(install_root: &Path, args: &[String], preview: bool) -> Result<()> {
    if args.len() != 2 {
        return Err(SlateError::Usage(
            "invalid arguments. Run slate --help for more information".to_string(),
        ));
    }
    let entity_type = &args[0];
    let item = &args[1];

    info!("Will process folders for {} {}", entity_type, item);

    let client = remote::connect(install_root)?;
    let entity_id = resolve_entity_id(&client, entity_type, item)?;
    let pc = PipelineConfiguration::from_entity(&client, entity_type, entity_id)?;

    // Folder names come from the entity's name; id-only references are
    // looked up so folders never end up named after numerals.
    let folder_name = if item.parse::<i64>().is_ok() {
        let records = client.find(entity_type, &[Filter::is("id", json!(entity_id))], &[NAME_FIELD])?;
        records
            .first()
            .and_then(|r| r.str_field(NAME_FIELD))
            .map(str::to_string)
            .unwrap_or_else(|| item.to_string())
    } else {
        item.to_string()
    };

    if preview {
        info!("Previewing folder creation, stand by...");
    } else {
        info!("Creating folders, stand by...");
    }

    let processed = pc.process_filesystem_structure(entity_type, &folder_name, preview)?;

    info!("Folder creation complete!");
    println!();
    println!("The following items were processed:");
    for path in &processed {
        println!(" - {}", path.display());
    }
    println!();
    println!("In total, {} folders were processed.", processed.len());
    if preview {
        println!("Note: No folders were created, preview mode only.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Fields;
    use crate::test_support::write_pipeline_metadata;
    use tempfile::TempDir;

    fn fixture(tmp: &TempDir) -> std::path::PathBuf {
        // Studio install root with a tracker store.
        let install_root = tmp.path().join("studio");
        let store_dir = install_root.join("config").join("core");
        std::fs::create_dir_all(&store_dir).unwrap();
        let tracker = crate::remote::FileTracker::create_store(
            store_dir.join("tracker.yml"),
            ["Project", "Shot", "PipelineConfiguration"].map(String::from),
        )
        .unwrap();

        // A configuration with one storage root.
        let config_root = tmp.path().join("cfg");
        write_pipeline_metadata(&config_root, 1);
        let storage = tmp.path().join("projects").join("myshow");
        std::fs::create_dir_all(&storage).unwrap();
        let roots = format!(
            "primary:\n  linux_path: {0}\n  mac_path: {0}\n  windows_path: {0}\n",
            storage.display()
        );
        std::fs::write(config_root.join("config").join("core").join("roots.yml"), roots).unwrap();

        // Project + shot + pipeline configuration records.
        tracker.create("Project", Fields::new()).unwrap();
        tracker
            .create(
                "Shot",
                Fields::from([
                    ("code".to_string(), json!("ABC123")),
                    ("project".to_string(), crate::remote::link("Project", 1)),
                ]),
            )
            .unwrap();
        let cfg = config_root.to_str().unwrap();
        tracker
            .create(
                "PipelineConfiguration",
                Fields::from([
                    ("code".to_string(), json!("Primary")),
                    ("project".to_string(), crate::remote::link("Project", 1)),
                    ("linux_path".to_string(), json!(cfg)),
                    ("mac_path".to_string(), json!(cfg)),
                    ("windows_path".to_string(), json!(cfg)),
                ]),
            )
            .unwrap();

        install_root
    }

    #[test]
    fn creates_folders_for_a_named_entity() {
        let tmp = TempDir::new().unwrap();
        let install_root = fixture(&tmp);

        run(
            &install_root,
            &["Shot".to_string(), "ABC123".to_string()],
            false,
        )
        .unwrap();

        assert!(
            tmp.path()
                .join("projects")
                .join("myshow")
                .join("shot")
                .join("ABC123")
                .is_dir()
        );
    }

    #[test]
    fn preview_mode_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let install_root = fixture(&tmp);

        run(
            &install_root,
            &["Shot".to_string(), "ABC123".to_string()],
            true,
        )
        .unwrap();

        assert!(!tmp.path().join("projects").join("myshow").join("shot").exists());
    }

    #[test]
    fn id_reference_resolves_to_the_entity_name() {
        let tmp = TempDir::new().unwrap();
        let install_root = fixture(&tmp);

        run(&install_root, &["Shot".to_string(), "2".to_string()], false).unwrap();

        assert!(
            tmp.path()
                .join("projects")
                .join("myshow")
                .join("shot")
                .join("ABC123")
                .is_dir()
        );
    }

    #[test]
    fn wrong_argument_count_is_a_usage_error() {
        let tmp = TempDir::new().unwrap();
        let err = run(tmp.path(), &["Shot".to_string()], false).unwrap_err();
        assert!(matches!(err, SlateError::Usage(_)));
    }

    #[test]
    fn unknown_entity_name_is_a_resolution_error() {
        let tmp = TempDir::new().unwrap();
        let install_root = fixture(&tmp);
        let err = run(
            &install_root,
            &["Shot".to_string(), "NOPE".to_string()],
            false,
        )
        .unwrap_err();
        assert!(matches!(err, SlateError::Resolution(_)));
    }
}
