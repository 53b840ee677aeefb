//! The `setup_project` builtin.
//!
//! Reads the setup manifest from the working directory, validates it
//! against the tracker, and hands over to the provisioner.

use crate::constants::{NAME_FIELD, PROJECT_ENTITY, SETUP_MANIFEST_FILE};
use crate::error::{Result, SlateError};
use crate::provision::{ProjectSetupParameters, SetupManifest, run_project_setup};
use crate::remote::{self, Filter, TrackerClient};
use serde_json::json;
use std::path::Path;
use tracing::info;

pub fn run(install_root: &Path, args: &[String], cwd: &Path) -> Result<()> {
    if !args.is_empty() {
        return Err(SlateError::Usage(
            "invalid arguments. Run slate --help for more information".to_string(),
        ));
    }

    let client = remote::connect(install_root)?;

    let manifest_path = cwd.join(SETUP_MANIFEST_FILE);
    info!("Reading setup manifest {}...", manifest_path.display());
    let manifest = SetupManifest::load(&manifest_path)?;

    // The project must exist before it can be set up; its tracker name
    // seeds the disk name when the manifest leaves one out.
    let projects = client.find(
        PROJECT_ENTITY,
        &[Filter::is("id", json!(manifest.project_id))],
        &["name", NAME_FIELD],
    )?;
    let project = projects.first().ok_or_else(|| {
        SlateError::Resolution(format!(
            "project {} does not exist in the tracker",
            manifest.project_id
        ))
    })?;
    let project_name = project
        .str_field("name")
        .or_else(|| project.str_field(NAME_FIELD))
        .unwrap_or("project");

    let params = ProjectSetupParameters::from_manifest(manifest, project_name)?;

    let app_store = remote::connect_app_store(install_root);
    run_project_setup(
        install_root,
        &params,
        &client,
        app_store.as_ref().map(|c| c as &dyn TrackerClient),
    )
}
