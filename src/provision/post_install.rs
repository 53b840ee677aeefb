//! Template post-install hook.
//!
//! Configuration templates may ship a `config/after_project_create`
//! script that seeds template-specific tracker state. The hook runs as a
//! subprocess with the project id on its command line. A dedicated exit
//! code reports the legacy-schema case (the template tried to create
//! entity types the site has since disabled), which downgrades to a
//! warning; any other failure is logged as an error. Neither aborts the
//! setup.

use crate::constants::{AFTER_PROJECT_CREATE_HOOK, CONFIG_DIR, HOOK_LEGACY_SCHEMA_EXIT_CODE};
use crate::remote::EntityId;
use std::path::Path;
use std::process::Command;
use tracing::{error, info, warn};

/// Run the template's post-install hook, if it exists.
pub fn run_after_project_create(config_root: &Path, project_id: EntityId, install_root: &Path) {
    let hook = config_root.join(CONFIG_DIR).join(AFTER_PROJECT_CREATE_HOOK);
    if !hook.is_file() {
        return;
    }

    info!("Found a post-install script {}", hook.display());
    info!("Executing post-install commands...");

    let status = Command::new(&hook)
        .arg("--project-id")
        .arg(project_id.to_string())
        .env("SLATE_INSTALL_ROOT", install_root)
        .current_dir(config_root)
        .status();

    match status {
        Ok(status) if status.success() => {
            info!("Post install phase complete!");
        }
        Ok(status) if status.code() == Some(HOOK_LEGACY_SCHEMA_EXIT_CODE) => {
            warn!(
                "The post install script failed to complete. This is most likely because it \
                 is from an old configuration that attempts to create entity types which are \
                 now disabled in the tracker."
            );
        }
        Ok(status) => {
            error!("The post install script failed to complete: exited with {}", status);
        }
        Err(e) => {
            error!("The post install script could not be started: {}", e);
        }
    }
}

/// Print the template's README to the user, when one ships.
pub fn show_readme(config_root: &Path) {
    let readme = config_root.join(CONFIG_DIR).join("README");
    let Ok(text) = std::fs::read_to_string(&readme) else {
        return;
    };
    info!("README file for template:");
    for line in text.lines() {
        info!("{}", line.trim_end());
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_hook(config_root: &Path, body: &str) {
        let config = config_root.join("config");
        std::fs::create_dir_all(&config).unwrap();
        let hook = config.join("after_project_create");
        std::fs::write(&hook, body).unwrap();
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn hook_receives_the_project_id() {
        let tmp = TempDir::new().unwrap();
        write_hook(
            tmp.path(),
            "#!/bin/sh\necho \"$@\" > hook_args\nexit 0\n",
        );

        run_after_project_create(tmp.path(), 42, tmp.path());

        let args =
            std::fs::read_to_string(tmp.path().join("config").join("hook_args")).unwrap();
        assert!(args.contains("--project-id 42"));
    }

    #[test]
    fn legacy_schema_exit_code_does_not_panic_or_abort() {
        let tmp = TempDir::new().unwrap();
        write_hook(tmp.path(), "#!/bin/sh\nexit 71\n");
        run_after_project_create(tmp.path(), 1, tmp.path());
    }

    #[test]
    fn generic_hook_failure_is_tolerated() {
        let tmp = TempDir::new().unwrap();
        write_hook(tmp.path(), "#!/bin/sh\nexit 1\n");
        run_after_project_create(tmp.path(), 1, tmp.path());
    }

    #[test]
    fn missing_hook_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        run_after_project_create(tmp.path(), 1, tmp.path());
    }
}
