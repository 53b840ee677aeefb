//! Platform abstraction for cross-platform provisioning.
//!
//! A pipeline configuration carries paths for all three supported platforms
//! so that a project set up on Linux is immediately usable from macOS and
//! Windows workstations. Paths for platforms other than the executing one
//! are treated as opaque strings; only the current platform's paths are
//! ever turned into real filesystem paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SlateError;

/// One of the three platforms a configuration can span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    /// All platforms, in the fixed order used for redirection files.
    pub const ALL: [Platform; 3] = [Platform::Mac, Platform::Linux, Platform::Windows];

    /// The platform the current process runs on.
    pub fn current() -> Platform {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Name of the core redirection stub for this platform.
    pub fn redirect_file_name(self) -> &'static str {
        match self {
            Platform::Linux => "core_Linux.cfg",
            Platform::Mac => "core_Darwin.cfg",
            Platform::Windows => "core_Windows.cfg",
        }
    }

    /// Key used in `roots.yml` and in pipeline configuration records.
    pub fn path_field(self) -> &'static str {
        match self {
            Platform::Linux => "linux_path",
            Platform::Mac => "mac_path",
            Platform::Windows => "windows_path",
        }
    }

    /// Path separator for this platform.
    ///
    /// Used when composing paths for a platform other than the executing
    /// one, where `PathBuf::join` would apply the wrong separator.
    pub fn separator(self) -> char {
        match self {
            Platform::Windows => '\\',
            _ => '/',
        }
    }

    /// Join a single component onto a platform-foreign base path.
    pub fn join(self, base: &str, component: &str) -> String {
        let sep = self.separator();
        let mut out = base.trim_end_matches(sep).to_string();
        out.push(sep);
        out.push_str(component);
        out
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Windows => "windows",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Platform {
    type Err = SlateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "mac" | "darwin" => Ok(Platform::Mac),
            "windows" | "win" => Ok(Platform::Windows),
            other => Err(SlateError::Usage(format!(
                "unknown platform '{}'. Expected one of: linux, mac, windows",
                other
            ))),
        }
    }
}

/// A path expressed for all three platforms.
///
/// Used for configuration locations, where every platform must have a
/// value, even when provisioning from a different platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformPaths {
    pub linux: String,
    pub mac: String,
    pub windows: String,
}

impl PlatformPaths {
    pub fn get(&self, platform: Platform) -> &str {
        match platform {
            Platform::Linux => &self.linux,
            Platform::Mac => &self.mac,
            Platform::Windows => &self.windows,
        }
    }
}

/// A per-platform path where individual platforms may be undefined,
/// such as the associated-core pointers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalPlatformPaths {
    #[serde(default)]
    pub linux: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub windows: Option<String>,
}

impl OptionalPlatformPaths {
    pub fn get(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Linux => self.linux.as_deref(),
            Platform::Mac => self.mac.as_deref(),
            Platform::Windows => self.windows.as_deref(),
        }
    }
}
