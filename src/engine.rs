//! Engine startup and command execution.
//!
//! An engine is the runtime a command executes inside. For the purposes
//! of the dispatch layer an engine is its registered command set, loaded
//! from the environment that declares the engine. Commands carry an
//! explicit invocation mode rather than being introspected at call time:
//! `simple` commands take no arguments, `legacy` commands receive the
//! entity type and the selected entity ids.

use crate::constants::TRACKER_ENGINE;
use crate::error::{Result, SlateError};
use crate::pipeline::{CommandMode, CommandSpec, PipelineConfiguration};
use crate::remote::EntityId;
use std::collections::BTreeMap;
use std::process::Command;
use tracing::{debug, info};

/// A started engine: its name, the environment it came from, and its
/// registered commands.
#[derive(Debug)]
pub struct Engine {
    name: String,
    environment_name: String,
    commands: BTreeMap<String, CommandSpec>,
}

impl Engine {
    /// Start an engine for the given configuration.
    ///
    /// Environments are scanned in name order; the first one declaring
    /// the engine wins.
    pub fn start(name: &str, pc: &PipelineConfiguration) -> Result<Engine> {
        for env_name in pc.environment_names()? {
            let env = pc.environment(&env_name)?;
            if let Some(settings) = env.engines.get(name) {
                debug!("Started engine {} in environment {}", name, env_name);
                return Ok(Engine {
                    name: name.to_string(),
                    environment_name: env_name,
                    commands: settings.commands.clone(),
                });
            }
        }
        Err(SlateError::Resolution(format!(
            "the engine '{}' is not declared by any environment in '{}'",
            name,
            pc.root().display()
        )))
    }

    /// Start the tracker integration engine for an entity type. The
    /// environment is keyed by the entity type: `tracker_<type>`.
    pub fn start_tracker_engine(
        pc: &PipelineConfiguration,
        entity_type: &str,
    ) -> Result<Engine> {
        let env_name = format!("tracker_{}", entity_type.to_lowercase());
        let env = pc.environment(&env_name)?;
        let settings = env.engines.get(TRACKER_ENGINE).ok_or_else(|| {
            SlateError::Resolution(format!(
                "the environment '{}' does not declare the {} engine",
                env_name, TRACKER_ENGINE
            ))
        })?;
        Ok(Engine {
            name: TRACKER_ENGINE.to_string(),
            environment_name: env_name,
            commands: settings.commands.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    pub fn commands(&self) -> &BTreeMap<String, CommandSpec> {
        &self.commands
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Execute a registered command, branching on its declared mode.
    pub fn run_command(
        &self,
        name: &str,
        entity_type: Option<&str>,
        entity_ids: &[EntityId],
    ) -> Result<()> {
        let spec = self.commands.get(name).ok_or_else(|| {
            SlateError::Resolution(format!(
                "a command named '{}' is not registered with the {} engine",
                name, self.name
            ))
        })?;

        info!("Executing the {} command.", name);

        let Some(run) = spec.run.as_deref() else {
            info!("Command '{}' has no action configured; nothing to do.", name);
            return Ok(());
        };

        let mut argv = shell_words::split(run).map_err(|e| {
            SlateError::Usage(format!("command '{}' has an unparsable action line: {}", name, e))
        })?;
        if argv.is_empty() {
            return Ok(());
        }

        if spec.mode == CommandMode::Legacy {
            // Legacy tracker-launch shape: entity type plus id list.
            argv.push(entity_type.unwrap_or_default().to_string());
            argv.push(
                entity_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }

        let status = Command::new(&argv[0]).args(&argv[1..]).status().map_err(|e| {
            SlateError::Unexpected(anyhow::anyhow!(
                "command '{}' could not be started ({}): {}",
                name,
                argv[0],
                e
            ))
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(SlateError::Unexpected(anyhow::anyhow!(
                "command '{}' exited with {}",
                name,
                status
            )))
        }
    }

    /// Print the available commands for this engine/environment.
    pub fn print_command_list(&self) {
        println!();
        println!(
            "When the {} engine is running in the {} environment, the following commands are available:",
            self.name, self.environment_name
        );
        println!();
        for (name, spec) in &self.commands {
            let title = spec.title.as_deref().unwrap_or("No description available.");
            println!("- {} ({})", name, title);
            println!("  To run this in the current work area, type slate {}", name);
            println!("  To run this for a folder, type slate {} /path/to/location", name);
            println!("  To run this for a tracker item, type slate {} Shot ABC", name);
            println!();
        }
    }
}
