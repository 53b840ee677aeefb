//! Context + command execution through an engine.
//!
//! The fall-through path of the dispatcher: resolve the classified
//! context into a pipeline handle, enforce any explicit `--pc=` binding,
//! start the engine and run (or list) commands.

use crate::context::{
    ContextInput, ExecutionContext, TokenClassification, check_configuration_match,
    resolve_entity_context, resolve_path_context,
};
use crate::engine::Engine;
use crate::error::Result;
use crate::remote;
use std::path::Path;
use tracing::{debug, error, info};

pub fn run_engine_cmd(
    install_root: &Path,
    pc_root: Option<&Path>,
    engine_name: &str,
    classification: TokenClassification,
) -> Result<()> {
    debug!("Will start engine {}", engine_name);
    debug!("Context input: {}", classification.context);
    debug!("Command: {:?}", classification.command);

    let (pc, ctx) = match &classification.context {
        ContextInput::Path(path) => resolve_path_context(path, classification.using_cwd)?,
        ContextInput::Entity { entity_type, item } => {
            // Entity references need the tracker; paths resolve offline.
            let client = remote::connect(install_root)?;
            resolve_entity_context(&client, entity_type, item)?
        }
    };
    debug!("Resolved {} into configuration {}", ctx, pc.root().display());

    // An explicit configuration binding must agree with the resolution
    // before anything executes.
    check_configuration_match(&pc, pc_root, &ctx)?;

    let engine = Engine::start(engine_name, &pc)?;
    debug!("Started engine {} ({})", engine.name(), engine.environment_name());

    let Some(command) = classification.command else {
        info!("You didn't specify a command to run!");
        engine.print_command_list();
        return Ok(());
    };

    if !engine.has_command(&command) {
        error!("Unknown command: '{}'", command);
        engine.print_command_list();
        return Ok(());
    }

    let (entity_type, entity_ids) = match &ctx {
        ExecutionContext::Entity { entity_type, id } => (Some(entity_type.as_str()), vec![*id]),
        ExecutionContext::Path(_) => (None, Vec::new()),
    };
    engine.run_command(&command, entity_type, &entity_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlateError;
    use crate::remote::Fields;
    use crate::remote::TrackerClient;
    use crate::test_support::{load_configuration, write_environment};
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SHELL_ENV: &str = "\
engines:
  shell:
    location: {name: shell-engine, version: v0.1.0}
    commands:
      greet:
        title: Greet
";

    fn classification(command: Option<&str>, context: ContextInput) -> TokenClassification {
        TokenClassification {
            command: command.map(String::from),
            context,
            using_cwd: false,
        }
    }

    #[test]
    fn path_context_runs_offline() {
        let tmp = TempDir::new().unwrap();
        load_configuration(tmp.path(), 1);
        write_environment(tmp.path(), "review", SHELL_ENV);

        run_engine_cmd(
            &tmp.path().join("no-studio"),
            None,
            "shell",
            classification(Some("greet"), ContextInput::Path(tmp.path().to_path_buf())),
        )
        .unwrap();
    }

    #[test]
    fn listing_path_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        load_configuration(tmp.path(), 1);
        write_environment(tmp.path(), "review", SHELL_ENV);

        // No command at all.
        run_engine_cmd(
            &tmp.path().join("no-studio"),
            None,
            "shell",
            classification(None, ContextInput::Path(tmp.path().to_path_buf())),
        )
        .unwrap();

        // Unregistered command.
        run_engine_cmd(
            &tmp.path().join("no-studio"),
            None,
            "shell",
            classification(Some("vanish"), ContextInput::Path(tmp.path().to_path_buf())),
        )
        .unwrap();
    }

    #[test]
    fn pc_mismatch_fails_before_any_command_runs() {
        let tmp = TempDir::new().unwrap();
        load_configuration(tmp.path(), 1);
        write_environment(tmp.path(), "review", SHELL_ENV);

        let err = run_engine_cmd(
            &tmp.path().join("no-studio"),
            Some(&tmp.path().join("other-config")),
            "shell",
            classification(Some("greet"), ContextInput::Path(tmp.path().to_path_buf())),
        )
        .unwrap_err();
        assert!(matches!(err, SlateError::ConfigurationMismatch { .. }));
    }

    #[test]
    fn cwd_resolution_failure_mentions_the_working_directory() {
        let tmp = TempDir::new().unwrap();
        let err = run_engine_cmd(
            &tmp.path().join("no-studio"),
            None,
            "shell",
            TokenClassification {
                command: Some("greet".to_string()),
                context: ContextInput::Path(tmp.path().to_path_buf()),
                using_cwd: true,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("current working directory"));
    }

    #[test]
    fn entity_context_resolves_through_the_tracker() {
        let tmp = TempDir::new().unwrap();
        let config_root = tmp.path().join("cfg");
        load_configuration(&config_root, 1);
        write_environment(&config_root, "review", SHELL_ENV);

        let install_root = tmp.path().join("studio");
        let store_dir = install_root.join("config").join("core");
        std::fs::create_dir_all(&store_dir).unwrap();
        let tracker = crate::remote::FileTracker::create_store(
            store_dir.join("tracker.yml"),
            ["Project", "Shot", "PipelineConfiguration"].map(String::from),
        )
        .unwrap();
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

        run_engine_cmd(
            &install_root,
            None,
            "shell",
            classification(
                Some("greet"),
                ContextInput::Entity {
                    entity_type: "Shot".to_string(),
                    item: "ABC123".to_string(),
                },
            ),
        )
        .unwrap();
    }

    #[test]
    fn entity_context_without_tracker_store_fails() {
        let err = run_engine_cmd(
            &PathBuf::from("/nonexistent-studio"),
            None,
            "shell",
            classification(
                None,
                ContextInput::Entity {
                    entity_type: "Shot".to_string(),
                    item: "123".to_string(),
                },
            ),
        )
        .unwrap_err();
        assert!(matches!(err, SlateError::RemoteService(_)));
    }
}
