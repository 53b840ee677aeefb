//! File-backed tracker client.
//!
//! Studios without a live tracker connection (render farms, air-gapped
//! setups, tests) run against a YAML record store sitting next to the
//! core install. The store implements the same capability interface the
//! HTTP client does, so callers cannot tell the difference.

use super::{
    EntityId, Fields, Filter, Record, Schema, TrackerClient, TrackerError, TrackerErrorCode,
};
use crate::fs::atomic_write_file;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk shape of the record store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    schema: Schema,
    #[serde(default = "first_id")]
    next_id: EntityId,
    #[serde(default)]
    records: Vec<Record>,
}

fn first_id() -> EntityId {
    1
}

/// Tracker client backed by a single YAML file.
#[derive(Debug, Clone)]
pub struct FileTracker {
    path: PathBuf,
}

impl FileTracker {
    /// Open a store file. The file must exist; sites provision it when
    /// the core is installed.
    pub fn open(path: impl Into<PathBuf>) -> Result<FileTracker, TrackerError> {
        let path = path.into();
        if !path.is_file() {
            return Err(TrackerError::transport(format!(
                "tracker store '{}' does not exist",
                path.display()
            )));
        }
        Ok(FileTracker { path })
    }

    /// Create a new store file with the given schema. Used by site
    /// bootstrap and by tests.
    pub fn create_store(
        path: impl Into<PathBuf>,
        entity_types: impl IntoIterator<Item = String>,
    ) -> Result<FileTracker, TrackerError> {
        let path = path.into();
        let data = StoreData {
            schema: entity_types.into_iter().collect(),
            next_id: first_id(),
            records: Vec::new(),
        };
        let tracker = FileTracker { path };
        tracker.save(&data)?;
        Ok(tracker)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreData, TrackerError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            TrackerError::transport(format!("cannot read '{}': {}", self.path.display(), e))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            TrackerError::transport(format!("cannot parse '{}': {}", self.path.display(), e))
        })
    }

    fn save(&self, data: &StoreData) -> Result<(), TrackerError> {
        let text = serde_yaml::to_string(data).map_err(|e| {
            TrackerError::transport(format!("cannot serialize tracker store: {}", e))
        })?;
        atomic_write_file(&self.path, &text).map_err(|e| {
            TrackerError::transport(format!("cannot write '{}': {}", self.path.display(), e))
        })
    }

    fn check_entity_type(data: &StoreData, entity_type: &str) -> Result<(), TrackerError> {
        if data.schema.contains(entity_type) {
            return Ok(());
        }
        // Distinguish types that were retired by a schema migration from
        // plain typos so callers can downgrade legacy failures.
        if entity_type.starts_with("Legacy") {
            Err(TrackerError::new(
                TrackerErrorCode::LegacyTypeDisabled,
                format!("entity type '{}' is disabled on this site", entity_type),
            ))
        } else {
            Err(TrackerError::not_found(format!(
                "unknown entity type '{}'",
                entity_type
            )))
        }
    }
}

impl TrackerClient for FileTracker {
    fn find(
        &self,
        entity_type: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> Result<Vec<Record>, TrackerError> {
        let data = self.load()?;
        Self::check_entity_type(&data, entity_type)?;

        let results = data
            .records
            .into_iter()
            .filter(|r| r.entity_type == entity_type)
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .map(|mut r| {
                if !fields.is_empty() {
                    r.fields.retain(|k, _| fields.contains(&k.as_str()));
                }
                r
            })
            .collect();
        Ok(results)
    }

    fn create(&self, entity_type: &str, fields: Fields) -> Result<Record, TrackerError> {
        let mut data = self.load()?;
        Self::check_entity_type(&data, entity_type)?;

        let record = Record {
            id: data.next_id,
            entity_type: entity_type.to_string(),
            fields,
        };
        data.next_id += 1;
        data.records.push(record.clone());
        self.save(&data)?;
        debug!("Created {} {}", entity_type, record.id);
        Ok(record)
    }

    fn update(
        &self,
        entity_type: &str,
        id: EntityId,
        fields: Fields,
    ) -> Result<Record, TrackerError> {
        let mut data = self.load()?;
        Self::check_entity_type(&data, entity_type)?;

        let record = data
            .records
            .iter_mut()
            .find(|r| r.entity_type == entity_type && r.id == id)
            .ok_or_else(|| {
                TrackerError::not_found(format!("no {} with id {}", entity_type, id))
            })?;
        record.fields.extend(fields);
        let updated = record.clone();
        self.save(&data)?;
        Ok(updated)
    }

    fn delete(&self, entity_type: &str, id: EntityId) -> Result<(), TrackerError> {
        let mut data = self.load()?;
        Self::check_entity_type(&data, entity_type)?;

        let before = data.records.len();
        data.records.retain(|r| !(r.entity_type == entity_type && r.id == id));
        if data.records.len() == before {
            return Err(TrackerError::not_found(format!(
                "no {} with id {}",
                entity_type, id
            )));
        }
        self.save(&data)
    }

    fn schema_read(&self) -> Result<Schema, TrackerError> {
        Ok(self.load()?.schema)
    }
}

/// Store file location relative to a core install root.
fn store_path(install_root: &Path) -> PathBuf {
    install_root.join("config").join("core").join("tracker.yml")
}

/// App-store telemetry connection, relative to a core install root.
/// Optional; most sites do not carry one.
fn app_store_path(install_root: &Path) -> PathBuf {
    install_root.join("config").join("core").join("app_store.yml")
}

/// Open the site tracker connection for the given core install root.
pub fn connect(install_root: &Path) -> Result<FileTracker, TrackerError> {
    FileTracker::open(store_path(install_root))
}

/// Open the app-store telemetry connection, if the site has one.
pub fn connect_app_store(install_root: &Path) -> Option<FileTracker> {
    FileTracker::open(app_store_path(install_root)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store(tmp: &TempDir) -> FileTracker {
        FileTracker::create_store(
            tmp.path().join("tracker.yml"),
            ["Project", "Shot", "PipelineConfiguration"].map(String::from),
        )
        .unwrap()
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let tmp = TempDir::new().unwrap();
        let tracker = test_store(&tmp);

        let a = tracker.create("Shot", Fields::new()).unwrap();
        let b = tracker.create("Shot", Fields::new()).unwrap();
        assert_eq!(b.id, a.id + 1);
    }

    #[test]
    fn find_filters_and_projects_fields() {
        let tmp = TempDir::new().unwrap();
        let tracker = test_store(&tmp);
        let mut fields = Fields::new();
        fields.insert("code".to_string(), json!("ABC123"));
        fields.insert("status".to_string(), json!("ip"));
        tracker.create("Shot", fields).unwrap();

        let found = tracker
            .find("Shot", &[Filter::is("code", json!("ABC123"))], &["code"])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].str_field("code"), Some("ABC123"));
        assert!(found[0].fields.get("status").is_none());
    }

    #[test]
    fn update_merges_fields() {
        let tmp = TempDir::new().unwrap();
        let tracker = test_store(&tmp);
        let rec = tracker.create("Project", Fields::new()).unwrap();

        tracker
            .update("Project", rec.id, Fields::from([("disk_name".to_string(), json!("show"))]))
            .unwrap();

        let found = tracker.find("Project", &[], &[]).unwrap();
        assert_eq!(found[0].str_field("disk_name"), Some("show"));
    }

    #[test]
    fn delete_removes_record() {
        let tmp = TempDir::new().unwrap();
        let tracker = test_store(&tmp);
        let rec = tracker.create("Shot", Fields::new()).unwrap();

        tracker.delete("Shot", rec.id).unwrap();
        assert!(tracker.find("Shot", &[], &[]).unwrap().is_empty());
        assert_eq!(
            tracker.delete("Shot", rec.id).unwrap_err().code,
            TrackerErrorCode::NotFound
        );
    }

    #[test]
    fn disabled_legacy_type_reports_structured_code() {
        let tmp = TempDir::new().unwrap();
        let tracker = test_store(&tmp);

        let err = tracker.create("LegacyPublishedFileType", Fields::new()).unwrap_err();
        assert_eq!(err.code, TrackerErrorCode::LegacyTypeDisabled);
    }

    #[test]
    fn missing_store_is_a_transport_error() {
        let err = FileTracker::open("/nonexistent/tracker.yml").unwrap_err();
        assert_eq!(err.code, TrackerErrorCode::Transport);
    }
}
