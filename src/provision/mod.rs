//! Project provisioning.
//!
//! `run_project_setup` executes the full setup sequence: remote
//! force-reset, disk scaffold, template and binary installation,
//! redirection and location records, storage markers and backlinks,
//! tracker registration, the local cache mirror, telemetry, bundle
//! materialization and the template post-install hook.
//!
//! Steps run in a fixed order and there is no rollback: a failure leaves
//! the completed side effects in place for a retry or a force setup to
//! reconcile. An advisory lock keeps one machine's runs sequential; two
//! machines racing against the same project at the remote service remain
//! uncoordinated (see DESIGN.md).

pub mod install;
pub mod params;
pub mod post_install;
pub mod remote_setup;
pub mod scaffold;
pub mod storage;

pub use params::{ProjectSetupParameters, SetupManifest};

use crate::constants::CONFIG_DIR;
use crate::error::Result;
use crate::fs::UmaskGuard;
use crate::locks::acquire_provision_lock;
use crate::pipeline::PipelineConfiguration;
use crate::platform::Platform;
use crate::remote::TrackerClient;
use std::path::Path;
use tracing::info;

/// Execute the project setup.
///
/// No validation happens at this point; the parameters object has
/// already validated everything it can.
pub fn run_project_setup(
    install_root: &Path,
    params: &ProjectSetupParameters,
    client: &dyn TrackerClient,
    app_store: Option<&dyn TrackerClient>,
) -> Result<()> {
    let config_root_str = params.configuration_location(Platform::current()).to_string();
    let config_root = Path::new(&config_root_str);

    let _lock = acquire_provision_lock(config_root, "setup_project")?;

    // Wide-open modes must survive the process umask for the whole run.
    let _umask = UmaskGuard::set(0);

    setup_internal(install_root, config_root, params, client, app_store)
}

fn setup_internal(
    install_root: &Path,
    config_root: &Path,
    params: &ProjectSetupParameters,
    client: &dyn TrackerClient,
    app_store: Option<&dyn TrackerClient>,
) -> Result<()> {
    info!("Starting project setup.");

    // Remote reset first, so a forced retry is idempotent against a
    // clean remote state before any disk changes happen.
    if params.force_setup() {
        remote_setup::force_reset(client, params)?;
    }

    info!("Installing configuration into '{}'...", config_root.display());
    scaffold::create_structure(config_root)?;

    params.create_configuration(&config_root.join(CONFIG_DIR))?;

    scaffold::install_binaries(install_root, config_root)?;
    scaffold::write_core_redirections(config_root, params)?;
    scaffold::write_install_location(config_root, params)?;

    storage::write_roots(config_root, params)?;
    storage::setup_storages(params)?;

    let pc_record = remote_setup::register_project(client, params)?;
    let published_file_type = remote_setup::resolve_published_file_entity_type(client)?;
    remote_setup::write_config_cache(config_root, params, &pc_record, &published_file_type)?;

    if let Some(app_store) = app_store {
        remote_setup::write_creation_event(app_store, params);
    }

    // The configuration is functional from here on; load it back and
    // materialize its declared bundles.
    let pc = PipelineConfiguration::from_path(config_root)?;
    install::install_environments(&pc, client)?;

    post_install::run_after_project_create(config_root, params.project_id(), install_root);

    info!("Your project has been fully set up.");
    post_install::show_readme(config_root);
    info!("We recommend running 'slate core update' regularly to stay current.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{NAME_FIELD, PIPELINE_CONFIG_ENTITY};
    use crate::pipeline::StorageMapping;
    use crate::platform::{OptionalPlatformPaths, PlatformPaths};
    use crate::remote::{Fields, FileTracker, TrackerClient};
    use crate::test_support::create_tracker;
    use serde_json::json;
    use serial_test::serial;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        install_root: PathBuf,
        config_root: PathBuf,
        storage_root: PathBuf,
        tracker: FileTracker,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();

        let install_root = tmp.path().join("studio");
        std::fs::create_dir_all(install_root.join("setup").join("root_binaries")).unwrap();
        std::fs::write(
            install_root.join("setup").join("root_binaries").join("slate"),
            "#!/bin/sh\n",
        )
        .unwrap();
        let proxy = install_root.join("setup").join("api_proxy");
        std::fs::create_dir_all(&proxy).unwrap();
        std::fs::write(proxy.join("init.py"), "# proxy stub\n").unwrap();

        let template = tmp.path().join("template");
        std::fs::create_dir_all(template.join("core")).unwrap();
        std::fs::write(template.join("core").join("schema.yml"), "version: 1\n").unwrap();

        let tracker = create_tracker(
            tmp.path(),
            &[
                "Project",
                "PipelineConfiguration",
                "PublishedFile",
                "PublishedFileType",
                "PublishedFileDependency",
            ],
        );
        tracker
            .create("Project", Fields::from([("name".to_string(), json!("My Show"))]))
            .unwrap();

        let storage_root = tmp.path().join("projects");
        std::fs::create_dir_all(&storage_root).unwrap();

        Fixture {
            install_root,
            config_root: tmp.path().join("configs").join("myshow"),
            storage_root,
            tracker,
            _tmp: tmp,
        }
    }

    impl Fixture {
        fn params(&self, force: bool) -> ProjectSetupParameters {
            let config = self.config_root.to_str().unwrap().to_string();
            let storage = self.storage_root.to_str().unwrap().to_string();
            let manifest = SetupManifest {
                project_id: 1,
                force,
                project_disk_name: Some("myshow".to_string()),
                config_template: self.install_root.parent().unwrap().join("template"),
                configuration_locations: PlatformPaths {
                    linux: config.clone(),
                    mac: config.clone(),
                    windows: config,
                },
                associated_core: OptionalPlatformPaths::default(),
                storages: BTreeMap::from([(
                    "primary".to_string(),
                    PlatformPaths {
                        linux: storage.clone(),
                        mac: storage.clone(),
                        windows: storage,
                    },
                )]),
            };
            ProjectSetupParameters::from_manifest(manifest, "My Show").unwrap()
        }

        fn run(&self, force: bool) -> Result<()> {
            run_project_setup(&self.install_root, &self.params(force), &self.tracker, None)
        }
    }

    #[test]
    #[serial]
    fn full_setup_builds_tree_and_records() {
        let fx = fixture();
        fx.run(false).unwrap();

        // Disk tree.
        assert!(fx.config_root.join("cache").is_dir());
        assert!(fx.config_root.join("config").join("core").join("schema.yml").is_file());
        assert!(fx.config_root.join("slate").is_file());
        assert!(
            fx.config_root
                .join("install")
                .join("core")
                .join("api")
                .join("init.py")
                .is_file()
        );
        assert!(
            fx.config_root
                .join("install")
                .join("core")
                .join("core_Linux.cfg")
                .is_file()
        );

        // Records.
        let metadata_text = std::fs::read_to_string(
            fx.config_root
                .join("config")
                .join("core")
                .join("pipeline_configuration.yml"),
        )
        .unwrap();
        assert!(metadata_text.contains("published_file_entity_type: PublishedFile"));

        // Storage side.
        let project_path = fx.storage_root.join("myshow");
        assert!(project_path.join("tank").join("cache").join("path_cache.db").is_file());

        // Remote side.
        let records = fx.tracker.find(PIPELINE_CONFIG_ENTITY, &[], &[]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].str_field(NAME_FIELD), Some("Primary"));

        // The configuration resolves from its own root afterwards.
        let pc = PipelineConfiguration::from_path(&fx.config_root).unwrap();
        assert_eq!(pc.project_id(), 1);
    }

    #[test]
    #[serial]
    fn rerun_without_force_is_idempotent_on_disk() {
        let fx = fixture();
        fx.run(false).unwrap();

        let cache_file = fx
            .storage_root
            .join("myshow")
            .join("tank")
            .join("cache")
            .join("path_cache.db");
        std::fs::write(&cache_file, "cache contents").unwrap();

        fx.run(false).unwrap();

        // Existing markers survive the re-run.
        assert_eq!(std::fs::read_to_string(&cache_file).unwrap(), "cache contents");

        // The backlink mapping still holds exactly one entry.
        let mapping = StorageMapping::new(fx.storage_root.join("myshow"));
        assert_eq!(mapping.configurations().unwrap().len(), 1);
    }

    #[test]
    #[serial]
    fn force_leaves_exactly_one_remote_record() {
        let fx = fixture();
        fx.run(false).unwrap();
        fx.run(true).unwrap();
        fx.run(true).unwrap();

        let records = fx.tracker.find(PIPELINE_CONFIG_ENTITY, &[], &[]).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    #[serial]
    fn rerun_without_force_accumulates_remote_records() {
        // Documented behavior: without force, every run creates a
        // record; cleanup is what force is for.
        let fx = fixture();
        fx.run(false).unwrap();
        fx.run(false).unwrap();

        let records = fx.tracker.find(PIPELINE_CONFIG_ENTITY, &[], &[]).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn umask_is_restored_after_setup() {
        let fx = fixture();
        let before = unsafe { libc::umask(0o022) };
        fx.run(false).unwrap();
        let after = unsafe { libc::umask(before) };
        assert_eq!(after, 0o022);
    }

    #[test]
    #[serial]
    fn lock_is_released_after_failure() {
        let fx = fixture();
        let params = fx.params(false);
        // Remove the vendored binaries to fail mid-run.
        std::fs::remove_dir_all(fx.install_root.join("setup")).unwrap();

        let result = run_project_setup(&fx.install_root, &params, &fx.tracker, None);
        assert!(result.is_err());

        // The lock must not outlive the failed run.
        let lock_path = fx.config_root.with_file_name("myshow.lock");
        assert!(!lock_path.exists());
    }
}
