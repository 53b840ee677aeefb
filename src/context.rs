//! Execution context resolution.
//!
//! A command invocation is anchored by a context: either a location on
//! disk or a tracker entity. The raw tokens left over after flag and
//! builtin-command handling are classified with positional heuristics,
//! then resolved against the filesystem and the tracker into a single
//! pipeline configuration handle.

use crate::constants::NAME_FIELD;
use crate::error::{Result, SlateError};
use crate::pipeline::PipelineConfiguration;
use crate::remote::{EntityId, Filter, TrackerClient};
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};

/// Unresolved context taken from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextInput {
    /// A location on disk.
    Path(PathBuf),
    /// A tracker entity, by id or by name.
    Entity { entity_type: String, item: String },
}

impl fmt::Display for ContextInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextInput::Path(path) => write!(f, "{}", path.display()),
            ContextInput::Entity { entity_type, item } => write!(f, "{} {}", entity_type, item),
        }
    }
}

/// A fully resolved context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionContext {
    Path(PathBuf),
    Entity { entity_type: String, id: EntityId },
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Path(path) => write!(f, "{}", path.display()),
            ExecutionContext::Entity { entity_type, id } => write!(f, "{} {}", entity_type, id),
        }
    }
}

/// Result of classifying the free tokens of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClassification {
    pub command: Option<String>,
    pub context: ContextInput,
    /// Whether the context defaulted to the working directory.
    pub using_cwd: bool,
}

/// Classify 0–3 free tokens into a command and a context.
///
/// The heuristics are positional: a token containing a path separator is
/// a path; two non-path tokens are an entity reference; a leading token
/// ahead of either is the command name.
pub fn classify_tokens(tokens: &[String], cwd: &Path) -> Result<TokenClassification> {
    let is_path = |token: &str| token.contains('/') || token.contains('\\');

    match tokens {
        [] => Ok(TokenClassification {
            command: None,
            context: ContextInput::Path(cwd.to_path_buf()),
            using_cwd: true,
        }),
        [single] if is_path(single) => Ok(TokenClassification {
            command: None,
            context: ContextInput::Path(PathBuf::from(single)),
            using_cwd: false,
        }),
        [single] => Ok(TokenClassification {
            command: Some(single.clone()),
            context: ContextInput::Path(cwd.to_path_buf()),
            using_cwd: true,
        }),
        [command, path] if is_path(path) => Ok(TokenClassification {
            command: Some(command.clone()),
            context: ContextInput::Path(PathBuf::from(path)),
            using_cwd: false,
        }),
        [entity_type, item] => Ok(TokenClassification {
            command: None,
            context: ContextInput::Entity {
                entity_type: entity_type.clone(),
                item: item.clone(),
            },
            using_cwd: false,
        }),
        [command, entity_type, item] => Ok(TokenClassification {
            command: Some(command.clone()),
            context: ContextInput::Entity {
                entity_type: entity_type.clone(),
                item: item.clone(),
            },
            using_cwd: false,
        }),
        _ => Err(SlateError::Usage(
            "invalid syntax. Please run slate --help for more info".to_string(),
        )),
    }
}

/// Resolve an entity reference to an id.
///
/// Bare numerals are ids. Anything else is looked up by name and must
/// match exactly one record; ambiguity is never silently resolved.
pub fn resolve_entity_id(
    client: &dyn TrackerClient,
    entity_type: &str,
    item: &str,
) -> Result<EntityId> {
    if let Ok(id) = item.parse::<EntityId>() {
        return Ok(id);
    }

    let matches = client.find(entity_type, &[Filter::is(NAME_FIELD, json!(item))], &[])?;
    match matches.len() {
        0 => Err(SlateError::Resolution(format!(
            "could not find {} '{}' in the tracker",
            entity_type, item
        ))),
        1 => Ok(matches[0].id),
        n => Err(SlateError::Resolution(format!(
            "{} items match {} '{}'. Please specify an id instead of a name \
             (e.g. slate {} 1234)",
            n, entity_type, item, entity_type
        ))),
    }
}

/// Resolve a path context into (configuration handle, context).
///
/// When the path defaulted to the working directory, the error message
/// points at the cwd rather than blaming a user-typed path.
pub fn resolve_path_context(
    path: &Path,
    using_cwd: bool,
) -> Result<(PipelineConfiguration, ExecutionContext)> {
    let pc = PipelineConfiguration::from_path(path).map_err(|e| match e {
        SlateError::Resolution(_) if using_cwd => SlateError::Resolution(format!(
            "you are trying to start slate in your current working directory ({}), \
             but this is not a location recognized by the toolkit",
            path.display()
        )),
        other => other,
    })?;
    Ok((pc, ExecutionContext::Path(path.to_path_buf())))
}

/// Resolve an entity context into (configuration handle, context).
pub fn resolve_entity_context(
    client: &dyn TrackerClient,
    entity_type: &str,
    item: &str,
) -> Result<(PipelineConfiguration, ExecutionContext)> {
    let id = resolve_entity_id(client, entity_type, item)?;
    let pc = PipelineConfiguration::from_entity(client, entity_type, id)?;
    Ok((
        pc,
        ExecutionContext::Entity {
            entity_type: entity_type.to_string(),
            id,
        },
    ))
}

/// Enforce agreement between a resolved handle and an explicit `--pc=`
/// root. Runs before any command executes.
pub fn check_configuration_match(
    pc: &PipelineConfiguration,
    explicit_root: Option<&Path>,
    context: &dyn fmt::Display,
) -> Result<()> {
    let Some(explicit) = explicit_root else {
        return Ok(());
    };
    let resolved = pc.root().to_string_lossy().to_string();
    let supplied = explicit.to_string_lossy().to_string();
    if resolved != supplied {
        return Err(SlateError::ConfigurationMismatch {
            context: context.to_string(),
            resolved,
            supplied,
        });
    }
    Ok(())
}
