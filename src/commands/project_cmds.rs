//! Builtin commands that operate on an existing project configuration.
//!
//! All of these resolve a pipeline handle first, from the working
//! directory or an explicit `--pc=` root, and fail with a descriptive
//! error when that location is a shared core or not a project at all.

use crate::constants::{
    CACHE_DIR, CONFIG_DIR, CORE_INSTALL_DIR, INSTALL_DIR, PIPELINE_CONFIG_ENTITY,
};
use crate::error::{Result, SlateError};
use crate::fs::atomic_write_file;
use crate::pipeline::{PipelineConfigMetadata, PipelineConfiguration, pipeline_config_file};
use crate::platform::Platform;
use crate::provision::scaffold::write_install_location_paths;
use crate::remote::{self, Fields, TrackerClient, link};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn run_project_command(
    install_root: &Path,
    location: PathBuf,
    command: &str,
    args: &[String],
) -> Result<()> {
    let pc = PipelineConfiguration::from_path(&location).map_err(|e| match e {
        SlateError::Resolution(reason) => SlateError::Resolution(format!(
            "you must run the command '{}' against a specific pipeline configuration. {}",
            command, reason
        )),
        other => other,
    })?;

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match (command, args.as_slice()) {
        ("validate", []) => validate(&pc),
        ("clone", [target]) => clone(install_root, &pc, Path::new(target)),
        ("join", []) => join(install_root, &pc),
        ("leave", []) => leave(install_root, &pc),
        ("switch", [platform, path]) => switch(&pc, platform, path),
        ("revert", [platform]) => revert(&pc, platform),
        ("tracker_run_action", [action, entity_type, ids]) => {
            super::tracker_cmds::run_action(&pc, action, entity_type, ids)
        }
        ("tracker_cache_actions", [entity_type, cache_file]) => {
            super::tracker_cmds::cache_actions(&pc, entity_type, cache_file)
        }
        _ => Err(SlateError::Usage(format!(
            "invalid arguments for '{}'. Run slate --help for more information",
            command
        ))),
    }
}

/// Structural validation of the configuration tree and its records.
fn validate(pc: &PipelineConfiguration) -> Result<()> {
    let mut issues: Vec<String> = Vec::new();

    for dir in [
        pc.root().join(CACHE_DIR),
        pc.root().join(CONFIG_DIR),
        pc.root().join(INSTALL_DIR).join(CORE_INSTALL_DIR),
    ] {
        if !dir.is_dir() {
            issues.push(format!("missing directory: {}", dir.display()));
        }
    }

    if let Err(e) = pc.install_location() {
        issues.push(format!("unreadable install location record: {}", e));
    }

    match pc.roots() {
        Ok(roots) => {
            let platform = Platform::current();
            for (name, paths) in roots {
                let path = paths.get(platform);
                if path.is_empty() {
                    issues.push(format!("storage '{}' has no path for this platform", name));
                } else if !Path::new(path).exists() {
                    issues.push(format!("storage '{}' path does not exist: {}", name, path));
                }
            }
        }
        Err(e) => issues.push(format!("unreadable storage roots record: {}", e)),
    }

    match pc.environment_names() {
        Ok(names) => {
            for name in names {
                if let Err(e) = pc.environment(&name) {
                    issues.push(format!("environment '{}' does not parse: {}", name, e));
                }
            }
        }
        Err(e) => issues.push(format!("cannot list environments: {}", e)),
    }

    println!("Validating configuration in '{}'...", pc.root().display());
    if issues.is_empty() {
        println!("No issues found. The configuration looks healthy.");
    } else {
        for issue in &issues {
            println!(" - {}", issue);
        }
        println!("{} issue(s) found.", issues.len());
    }
    Ok(())
}

/// Copy the configuration to a new root for sandboxed changes, register
/// the clone in the tracker and rebind its location records.
fn clone(install_root: &Path, pc: &PipelineConfiguration, target: &Path) -> Result<()> {
    if target.exists() {
        return Err(SlateError::Usage(format!(
            "the clone target '{}' already exists",
            target.display()
        )));
    }

    info!("Cloning configuration into {}...", target.display());
    crate::fs::copy_tree(pc.root(), target)?;

    let target_str = target.to_string_lossy();
    write_install_location_paths(target, &target_str, &target_str, &target_str)?;

    let client = remote::connect(install_root)?;
    let clone_name = format!("{}'s sandbox", current_user());
    let record = client.create(
        PIPELINE_CONFIG_ENTITY,
        Fields::from([
            ("project".to_string(), link("Project", pc.project_id())),
            ("code".to_string(), json!(clone_name)),
            ("linux_path".to_string(), json!(target_str)),
            ("mac_path".to_string(), json!(target_str)),
            ("windows_path".to_string(), json!(target_str)),
        ]),
    )?;

    let metadata = PipelineConfigMetadata {
        pc_id: record.id,
        pc_name: clone_name,
        project_id: pc.project_id(),
        project_name: pc.metadata().project_name.clone(),
        published_file_entity_type: pc.metadata().published_file_entity_type.clone(),
    };
    let cache_path = pipeline_config_file(target);
    let text =
        serde_yaml::to_string(&metadata).map_err(|e| SlateError::persistence(&cache_path, e))?;
    atomic_write_file(&cache_path, &text)?;

    info!("Clone complete.");
    Ok(())
}

/// Add the invoking user to the configuration's user list.
fn join(install_root: &Path, pc: &PipelineConfiguration) -> Result<()> {
    update_users(install_root, pc, |users, login| {
        if !users.contains(&login) {
            users.push(login);
        }
    })?;
    info!("You are now a member of this configuration.");
    Ok(())
}

/// Remove the invoking user from the configuration's user list.
fn leave(install_root: &Path, pc: &PipelineConfiguration) -> Result<()> {
    update_users(install_root, pc, |users, login| {
        users.retain(|u| u != &login);
    })?;
    info!("You have left this configuration.");
    Ok(())
}

fn update_users(
    install_root: &Path,
    pc: &PipelineConfiguration,
    apply: impl FnOnce(&mut Vec<String>, String),
) -> Result<()> {
    let client = remote::connect(install_root)?;
    let records = client.find(
        PIPELINE_CONFIG_ENTITY,
        &[crate::remote::Filter::is("id", json!(pc.metadata().pc_id))],
        &["users"],
    )?;
    let mut users: Vec<String> = records
        .first()
        .and_then(|r| r.fields.get("users"))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    apply(&mut users, current_user());

    client.update(
        PIPELINE_CONFIG_ENTITY,
        pc.metadata().pc_id,
        Fields::from([("users".to_string(), json!(users))]),
    )?;
    Ok(())
}

/// Point the configuration's core redirection for one platform at a new
/// location, keeping a backup for `revert`.
fn switch(pc: &PipelineConfiguration, platform: &str, path: &str) -> Result<()> {
    let platform: Platform = platform.parse()?;
    let stub = pc.root().join(INSTALL_DIR).join(CORE_INSTALL_DIR).join(platform.redirect_file_name());

    if stub.is_file() {
        let backup = stub.with_extension("cfg.bak");
        let current = std::fs::read_to_string(&stub)
            .map_err(|e| SlateError::persistence(&stub, e))?;
        atomic_write_file(&backup, &current)?;
    }

    atomic_write_file(&stub, path)?;
    info!("Core for {} now points at {}.", platform, path);
    Ok(())
}

/// Restore the previous core redirection for one platform.
fn revert(pc: &PipelineConfiguration, platform: &str) -> Result<()> {
    let platform: Platform = platform.parse()?;
    let stub = pc.root().join(INSTALL_DIR).join(CORE_INSTALL_DIR).join(platform.redirect_file_name());
    let backup = stub.with_extension("cfg.bak");

    if !backup.is_file() {
        return Err(SlateError::Usage(format!(
            "there is no previous core association to revert to for {}",
            platform
        )));
    }

    let previous =
        std::fs::read_to_string(&backup).map_err(|e| SlateError::persistence(&backup, e))?;
    atomic_write_file(&stub, &previous)?;
    std::fs::remove_file(&backup).map_err(|e| SlateError::persistence(&backup, e))?;
    info!("Core association for {} reverted.", platform);
    Ok(())
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
