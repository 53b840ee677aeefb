//! The `core` builtin: information about the core install, updates, and
//! localization of a shared core into a configuration.

use crate::constants::{CORE_BACKUP_DIR, CORE_INSTALL_DIR, INSTALL_DIR};
use crate::error::{Result, SlateError};
use crate::fs::copy_tree;
use crate::pipeline::PipelineConfiguration;
use crate::platform::Platform;
use chrono::Utc;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

pub fn run(
    install_root: &Path,
    pc_root: Option<&Path>,
    args: &[String],
    cwd: &Path,
) -> Result<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        [] => show_core_info(install_root, pc_root.unwrap_or(cwd)),
        ["update"] => update(install_root, pc_root),
        ["localize"] => localize(install_root, pc_root.unwrap_or(cwd)),
        _ => Err(SlateError::Usage(
            "invalid arguments. Run slate --help for more information".to_string(),
        )),
    }
}

/// Version string recorded in a core install's `info.yml`.
fn core_version(core_dir: &Path) -> String {
    #[derive(Deserialize)]
    struct InfoFile {
        version: Option<String>,
    }
    std::fs::read_to_string(core_dir.join("info.yml"))
        .ok()
        .and_then(|text| serde_yaml::from_str::<InfoFile>(&text).ok())
        .and_then(|info| info.version)
        .unwrap_or_else(|| "unknown".to_string())
}

fn show_core_info(install_root: &Path, location: &Path) -> Result<()> {
    let core_dir = install_root.join(INSTALL_DIR).join(CORE_INSTALL_DIR);
    println!("Core install root: {}", install_root.display());
    println!("Core version:      {}", core_version(&core_dir));

    // When run from inside a configuration, show what it is bound to.
    if let Ok(pc) = PipelineConfiguration::from_path(location) {
        if pc.is_localized() {
            println!("The configuration in '{}' carries its own core.", pc.root().display());
        } else {
            println!("Core associations for '{}':", pc.root().display());
            for platform in Platform::ALL {
                let core = pc
                    .associated_core_path(platform)
                    .unwrap_or_else(|| "undefined".to_string());
                println!("  {:<8} {}", platform, core);
            }
        }
    }
    Ok(())
}

fn update(install_root: &Path, pc_root: Option<&Path>) -> Result<()> {
    if let Some(pc_root) = pc_root
        && pc_root != install_root
    {
        warn!(
            "You are potentially about to update the core for multiple projects. \
             Before proceeding, we recommend running 'slate core' for a summary."
        );
    }
    info!(
        "Core updates are delivered with the core distribution. Install the new release \
         over '{}' and re-run your configurations unchanged.",
        install_root.display()
    );
    Ok(())
}

/// Copy the shared core into the configuration, rotating the previous
/// core into a dated snapshot under `install/core.backup/`.
fn localize(install_root: &Path, location: &Path) -> Result<()> {
    let pc = PipelineConfiguration::from_path(location).map_err(|_| {
        SlateError::Resolution(
            "you must run the core localize command against a specific pipeline \
             configuration, not against a shared core location. Navigate to the \
             configuration you want to operate on and run the command from there"
                .to_string(),
        )
    })?;

    if pc.is_localized() {
        info!(
            "The configuration in '{}' already carries its own core.",
            pc.root().display()
        );
        return Ok(());
    }

    let source_core = install_root.join(INSTALL_DIR).join(CORE_INSTALL_DIR);
    if !source_core.is_dir() {
        return Err(SlateError::Resolution(format!(
            "'{}' does not carry a core install to localize from",
            install_root.display()
        )));
    }

    let core_dir = pc.core_install_dir();
    let backup_dir = pc
        .root()
        .join(INSTALL_DIR)
        .join(CORE_BACKUP_DIR)
        .join(Utc::now().format("%Y%m%d_%H%M%S").to_string());

    info!(
        "Backing up the current core to {} before localizing...",
        backup_dir.display()
    );
    if core_dir.is_dir() {
        copy_tree(&core_dir, &backup_dir)?;
    }

    info!(
        "Localizing core from {} into {}...",
        source_core.display(),
        core_dir.display()
    );
    copy_tree(&source_core, &core_dir)?;

    // Keep the redirection stub for this platform accurate: a localized
    // configuration is its own core.
    let stub = core_dir.join(Platform::current().redirect_file_name());
    crate::fs::atomic_write_file(&stub, &pc.root().to_string_lossy())?;

    info!("Core localization complete.");
    Ok(())
}
