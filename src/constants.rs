//! Shared constants for the slate toolkit.
//!
//! These define the fixed on-disk layout of a pipeline configuration and
//! the entity/field names used when talking to the production tracker.

/// Name given to the pipeline configuration record created by project setup.
pub const PRIMARY_CONFIG_NAME: &str = "Primary";

/// Storage that receives the path cache file during setup.
pub const PRIMARY_STORAGE_NAME: &str = "primary";

/// Bookkeeping directory created inside every storage's project location.
pub const STORAGE_MARKER_DIR: &str = "tank";

/// Path cache file created in the primary storage's marker subtree.
pub const PATH_CACHE_FILE: &str = "path_cache.db";

/// Backlink mapping file, relative to the storage marker config directory.
pub const STORAGE_MAPPING_FILE: &str = "configurations.yml";

/// Entity type of pipeline configuration records in the tracker.
pub const PIPELINE_CONFIG_ENTITY: &str = "PipelineConfiguration";

/// Entity type of project records in the tracker.
pub const PROJECT_ENTITY: &str = "Project";

/// Field on the project record that carries the on-disk project name.
pub const PROJECT_DISK_NAME_FIELD: &str = "disk_name";

/// Field used when looking entities up by name.
pub const NAME_FIELD: &str = "code";

/// Modern published-file entity type, used when the tracker schema carries
/// the full modern type family.
pub const PUBLISHED_FILE_ENTITY: &str = "PublishedFile";

/// All three entity types that must be present in the tracker schema for
/// the modern published-file type to be used.
pub const PUBLISHED_FILE_ENTITY_FAMILY: [&str; 3] =
    ["PublishedFile", "PublishedFileType", "PublishedFileDependency"];

/// Fallback published-file entity type for sites that have not migrated.
pub const LEGACY_PUBLISHED_FILE_ENTITY: &str = "LegacyPublishedFile";

/// Engine started when no `--engine=` flag is given.
pub const DEFAULT_ENGINE: &str = "shell";

/// Engine used to service tracker-initiated actions.
pub const TRACKER_ENGINE: &str = "tracker";

/// Directory and file names inside a pipeline configuration root.
pub const CONFIG_DIR: &str = "config";
pub const CACHE_DIR: &str = "cache";
pub const INSTALL_DIR: &str = "install";
pub const CORE_INSTALL_DIR: &str = "core";
pub const CORE_BACKUP_DIR: &str = "core.backup";
pub const BUNDLE_KIND_DIRS: [&str; 3] = ["engines", "apps", "frameworks"];

/// Structured records under `config/core/`.
pub const INSTALL_LOCATION_FILE: &str = "install_location.yml";
pub const ROOTS_FILE: &str = "roots.yml";
pub const PIPELINE_CONFIG_FILE: &str = "pipeline_configuration.yml";

/// Directory names skipped when copying configuration trees around.
pub const COPY_SKIP_NAMES: [&str; 4] = [".svn", ".git", ".gitignore", "__MACOSX"];

/// Placeholder file dropped into directories that must survive in
/// file-oriented version control systems.
pub const PLACEHOLDER_FILE: &str = "placeholder";

/// Setup manifest read from the working directory by `setup_project`.
pub const SETUP_MANIFEST_FILE: &str = "project_setup.yml";

/// Post-install hook script, relative to the configuration's `config/` dir.
pub const AFTER_PROJECT_CREATE_HOOK: &str = "after_project_create";

/// Exit status a post-install hook uses to report that it tripped over
/// entity types that the tracker site has since disabled. Treated as a
/// warning rather than an error.
pub const HOOK_LEGACY_SCHEMA_EXIT_CODE: i32 = 71;
