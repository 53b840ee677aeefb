//! Error types for the slate CLI.
//!
//! Uses thiserror for derive macros. Known failure categories carry a
//! concise, user-actionable message; anything else travels through the
//! `Unexpected` variant and is reported with its full error chain.

use crate::remote::TrackerError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for slate operations.
#[derive(Error, Debug)]
pub enum SlateError {
    /// Malformed command line.
    #[error("{0}")]
    Usage(String),

    /// A context (path or entity reference) could not be resolved to a
    /// single pipeline configuration.
    #[error("{0}")]
    Resolution(String),

    /// The resolved configuration disagrees with an explicit `--pc=` root.
    #[error(
        "{context} is associated with the pipeline configuration in '{resolved}', \
         but the command was run via the configuration in '{supplied}'. \
         Run the same command from '{resolved}' instead"
    )]
    ConfigurationMismatch {
        context: String,
        resolved: String,
        supplied: String,
    },

    /// A structured file or directory could not be written.
    #[error("could not write to {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    /// A filesystem copy failed.
    #[error("can't copy {} to {}: {reason}", src.display(), dst.display())]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        reason: String,
    },

    /// The production tracker rejected or failed a request.
    #[error("tracker request failed: {0}")]
    RemoteService(#[from] TrackerError),

    /// The provisioning lock is held by another process.
    #[error("{0}")]
    Lock(String),

    /// One or more bundles failed to materialize. The message names the
    /// descriptors that failed and how many succeeded, so a partial run
    /// is never reported opaquely.
    #[error("{0}")]
    BundleInstall(String),

    /// Anything that does not fit a known category. Reported with the
    /// full error chain rather than a one-line summary.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl SlateError {
    /// Whether this is an expected, known failure category that should be
    /// reported as a one-liner.
    pub fn is_expected(&self) -> bool {
        !matches!(self, SlateError::Unexpected(_))
    }

    /// Shorthand for persistence failures wrapping an io error.
    pub fn persistence(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SlateError::Persistence {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Shorthand for copy failures wrapping an io error.
    pub fn copy(
        src: impl Into<PathBuf>,
        dst: impl Into<PathBuf>,
        err: impl std::fmt::Display,
    ) -> Self {
        SlateError::Copy {
            src: src.into(),
            dst: dst.into(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for slate operations.
pub type Result<T> = std::result::Result<T, SlateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_error_is_expected() {
        let err = SlateError::Usage("bad arguments".to_string());
        assert!(err.is_expected());
        assert_eq!(err.to_string(), "bad arguments");
    }

    #[test]
    fn unexpected_error_is_not_expected() {
        let err = SlateError::Unexpected(anyhow::anyhow!("boom"));
        assert!(!err.is_expected());
    }

    #[test]
    fn persistence_error_names_the_path() {
        let err = SlateError::persistence("/cfg/config/core/roots.yml", "disk full");
        let msg = err.to_string();
        assert!(msg.contains("roots.yml"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn mismatch_error_names_both_roots() {
        let err = SlateError::ConfigurationMismatch {
            context: "Shot 123".to_string(),
            resolved: "/proj/a".to_string(),
            supplied: "/proj/b".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/proj/a"));
        assert!(msg.contains("/proj/b"));
    }
}
