//! Tracker-initiated actions.
//!
//! The tracker web UI drives the toolkit through two commands: running a
//! registered action against a selection of entities, and caching the
//! action menu for an entity type so the UI can render it without
//! starting an engine.

use crate::engine::Engine;
use crate::error::{Result, SlateError};
use crate::fs::atomic_write_file;
use crate::pipeline::PipelineConfiguration;
use crate::platform::Platform;
use crate::remote::EntityId;
use tracing::{debug, error};

/// Run a registered action for a selection of entities.
///
/// A single selected entity gives an entity context; a multi-selection
/// runs without one. Unknown actions are logged (typically an app failed
/// to initialize) without failing the invocation.
pub fn run_action(
    pc: &PipelineConfiguration,
    action: &str,
    entity_type: &str,
    ids_csv: &str,
) -> Result<()> {
    let entity_ids = parse_ids(ids_csv)?;
    debug!("Running tracker action {} for {} {:?}", action, entity_type, entity_ids);

    let engine = Engine::start_tracker_engine(pc, entity_type)?;

    if !engine.has_command(action) {
        error!("A command named '{}' is not registered with the toolkit!", action);
        return Ok(());
    }

    engine.run_command(action, Some(entity_type), &entity_ids)
}

fn parse_ids(ids_csv: &str) -> Result<Vec<EntityId>> {
    ids_csv
        .split(',')
        .map(|part| {
            part.trim().parse::<EntityId>().map_err(|_| {
                SlateError::Usage(format!(
                    "invalid entity id '{}'. Pass action_name, entity_type and a \
                     comma separated id list",
                    part
                ))
            })
        })
        .collect()
}

/// Write the action menu cache for an entity type.
///
/// One command per line, `$`-joined columns: name, title, denied
/// permission groups, multi-selection support. Commands denied on this
/// platform are skipped.
pub fn cache_actions(
    pc: &PipelineConfiguration,
    entity_type: &str,
    cache_file_name: &str,
) -> Result<()> {
    let engine = Engine::start_tracker_engine(pc, entity_type)?;

    let platform_label = match Platform::current() {
        Platform::Linux => "Linux",
        Platform::Mac => "Mac",
        Platform::Windows => "Windows",
    };

    let mut rows = Vec::new();
    for (name, spec) in engine.commands() {
        if spec.deny_platforms.iter().any(|p| p == platform_label) {
            continue;
        }
        let title = spec.title.as_deref().unwrap_or(name);
        let deny = spec.deny_permissions.join(",");
        let multi = spec.supports_multiple_selection.to_string();
        rows.push([name.as_str(), title, deny.as_str(), multi.as_str()].join("$"));
    }

    let cache_path = pc.cache_location().join(cache_file_name);
    atomic_write_file(&cache_path, &rows.join("\n"))
}
