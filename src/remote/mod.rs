//! Production-tracker client interface.
//!
//! The toolkit only ever uses five operations against the tracking
//! service: find, create, update, delete and a schema read. They are
//! modeled as a trait with typed request/response structs so the rest of
//! the codebase is isolated from whatever wire protocol the site uses.
//! Failures carry a structured code instead of free-form text, so callers
//! branch on categories rather than message substrings.

mod file_store;

pub use file_store::{FileTracker, connect, connect_app_store};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Identifier of a record in the tracker.
pub type EntityId = i64;

/// Field name/value map used in create and update requests.
pub type Fields = BTreeMap<String, Value>;

/// A record returned by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    /// Read a string field, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Read the id out of a link field such as `project`.
    pub fn link_field(&self, name: &str) -> Option<EntityId> {
        self.fields.get(name).and_then(|v| v.get("id")).and_then(Value::as_i64)
    }
}

/// Build a link-field value referencing another record.
pub fn link(entity_type: &str, id: EntityId) -> Value {
    serde_json::json!({ "type": entity_type, "id": id })
}

/// Comparison operators supported in find filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Is,
}

/// One condition of a find request. All filters are ANDed.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn is(field: &str, value: Value) -> Filter {
        Filter {
            field: field.to_string(),
            op: FilterOp::Is,
            value,
        }
    }

    /// Whether a record satisfies this filter. The `id` pseudo-field
    /// matches against the record identifier itself.
    pub fn matches(&self, record: &Record) -> bool {
        match self.op {
            FilterOp::Is => {
                if self.field == "id" {
                    self.value.as_i64() == Some(record.id)
                } else {
                    record.fields.get(&self.field) == Some(&self.value)
                }
            }
        }
    }
}

/// Result of a schema read: the set of enabled entity types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub entity_types: BTreeSet<String>,
}

impl Schema {
    pub fn contains(&self, entity_type: &str) -> bool {
        self.entity_types.contains(entity_type)
    }
}

impl FromIterator<String> for Schema {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Schema {
            entity_types: iter.into_iter().collect(),
        }
    }
}

/// Structured failure category reported by the tracker interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerErrorCode {
    /// The referenced record or entity type does not exist.
    NotFound,
    /// The request referenced an entity type the site has disabled
    /// following a schema migration.
    LegacyTypeDisabled,
    /// The request was malformed.
    InvalidRequest,
    /// The backing store could not be reached or parsed.
    Transport,
}

impl fmt::Display for TrackerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackerErrorCode::NotFound => "not found",
            TrackerErrorCode::LegacyTypeDisabled => "legacy type disabled",
            TrackerErrorCode::InvalidRequest => "invalid request",
            TrackerErrorCode::Transport => "transport",
        };
        write!(f, "{}", name)
    }
}

/// Error reported by tracker operations.
#[derive(Error, Debug, Clone)]
#[error("{message} ({code})")]
pub struct TrackerError {
    pub code: TrackerErrorCode,
    pub message: String,
}

impl TrackerError {
    pub fn new(code: TrackerErrorCode, message: impl Into<String>) -> Self {
        TrackerError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        TrackerError::new(TrackerErrorCode::NotFound, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        TrackerError::new(TrackerErrorCode::Transport, message)
    }
}

/// Capability interface onto the production tracker.
///
/// Implementations block the calling thread; the toolkit is synchronous
/// end to end.
pub trait TrackerClient {
    fn find(
        &self,
        entity_type: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> Result<Vec<Record>, TrackerError>;

    fn create(&self, entity_type: &str, fields: Fields) -> Result<Record, TrackerError>;

    fn update(
        &self,
        entity_type: &str,
        id: EntityId,
        fields: Fields,
    ) -> Result<Record, TrackerError>;

    fn delete(&self, entity_type: &str, id: EntityId) -> Result<(), TrackerError>;

    fn schema_read(&self) -> Result<Schema, TrackerError>;
}
